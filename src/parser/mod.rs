//! Source positions, spans and the document parser collaborator interface.
//!
//! Lexing and parsing of GraphQL source text is not part of this engine:
//! callers supply any parser producing the [`crate::ast`] types through the
//! [`ParseDocument`] trait.

mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use self::utils::{SourcePosition, Span, Spanning};

use std::fmt;

use crate::ast::OwnedDocument;

/// Error reported by the document parser collaborator.
///
/// The engine never constructs these itself; it only carries them to the
/// request boundary, where they surface as
/// [`GraphQLError::ParseError`](crate::GraphQLError::ParseError).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    /// Constructs a new [`ParseError`] with the provided `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable parse failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

/// A document parser collaborator: turns GraphQL source text into an
/// executable document AST.
pub trait ParseDocument: Send + Sync {
    /// Parses `source` into a document, or reports where parsing failed.
    fn parse_document(&self, source: &str) -> Result<OwnedDocument, Spanning<ParseError>>;
}

impl<F> ParseDocument for F
where
    F: Fn(&str) -> Result<OwnedDocument, Spanning<ParseError>> + Send + Sync,
{
    fn parse_document(&self, source: &str) -> Result<OwnedDocument, Spanning<ParseError>> {
        self(source)
    }
}
