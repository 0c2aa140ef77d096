//! Warnings sink — the collaborator interface every layer reports through.
//!
//! Recoverable semantic violations never abort extraction; they are appended
//! here and the offending statement becomes a no-op. The sink also carries
//! the file-level "unrecognized input present" flag set when the external
//! parser delivered an error node.

use smol_str::SmolStr;

use crate::base::Loc;

/// A single warning tied to a source statement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseWarning {
    /// Source location of the offending statement.
    pub loc: Loc,
    /// Raw text of the statement as matched by the parser.
    pub text: SmolStr,
    /// Optional production context supplied by the parser (e.g. the
    /// enclosing config section), when it helps a human find the line.
    pub context: Option<SmolStr>,
    /// Human-readable description of what was ignored and why.
    pub message: String,
}

/// Accumulator for warnings produced during one file's extraction.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Warnings {
    warnings: Vec<ParseWarning>,
    unrecognized_input: bool,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a warning for the statement at `loc` with raw `text`.
    pub fn add(&mut self, loc: Loc, text: impl Into<SmolStr>, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(line = loc.line, %message, "extraction warning");
        self.warnings.push(ParseWarning {
            loc,
            text: text.into(),
            context: None,
            message,
        });
    }

    /// Append a warning carrying the parser's production context.
    pub fn add_with_context(
        &mut self,
        loc: Loc,
        text: impl Into<SmolStr>,
        context: impl Into<SmolStr>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        tracing::debug!(line = loc.line, %message, "extraction warning");
        self.warnings.push(ParseWarning {
            loc,
            text: text.into(),
            context: Some(context.into()),
            message,
        });
    }

    /// Record that the parser delivered an error node. Appends the dedicated
    /// warning and latches the file-level flag.
    pub fn unrecognized(&mut self, loc: Loc, text: impl Into<SmolStr>) {
        self.unrecognized_input = true;
        self.add(
            loc,
            text,
            "Unrecognized configuration line; subsequent lines may not be interpreted correctly",
        );
    }

    /// True if any error node was seen during the walk.
    pub fn unrecognized_input(&self) -> bool {
        self.unrecognized_input
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseWarning> {
        self.warnings.iter()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// All warnings whose message equals `message`, for tests and reports.
    pub fn matching<'a>(&'a self, message: &'a str) -> impl Iterator<Item = &'a ParseWarning> {
        self.warnings.iter().filter(move |w| w.message == message)
    }
}
