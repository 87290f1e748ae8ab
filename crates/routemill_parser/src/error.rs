use swc_core::common::{Span, Spanned};
use swc_ecma_parser::error::SyntaxError;
use thiserror::Error;

/// Route module could not be parsed
#[derive(Debug, Error)]
#[error("{} at {}..{}", .kind.msg(), .span.lo.0, .span.hi.0)]
pub struct ParseError {
    pub kind: SyntaxError,
    pub span: Span,
}

impl ParseError {
    /// Byte offset of the error in the original source
    pub fn offset(&self) -> usize {
        self.span.lo.0.saturating_sub(1) as usize
    }
}

impl From<swc_ecma_parser::error::Error> for ParseError {
    fn from(value: swc_ecma_parser::error::Error) -> ParseError {
        let span = value.span();

        ParseError {
            kind: value.into_kind(),
            span,
        }
    }
}

impl Spanned for ParseError {
    fn span(&self) -> Span {
        self.span
    }
}

/// Printing the module failed
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write generated code: {0}")]
    Io(#[from] std::io::Error),
    #[error("generated code is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
