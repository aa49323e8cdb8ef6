//! Error types for compiling and rendering templates.

use std::io;

use tessera_syntax::SyntaxError;
use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An unrecognized character in a directive.
    Lexical,
    /// A token the grammar does not allow.
    Syntax,
    /// Anything raised while rendering.
    Runtime,
    /// Invalid options.
    Config,
}

/// Errors raised by compilation or rendering.
///
/// All of them are fatal: a failed render produces no partial output.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    /// Neither key/index lookup nor field lookup resolved.
    #[error("cannot resolve `{key}` on {target}")]
    UndefinedAttribute { key: String, target: String },

    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    #[error("template not found: {path}")]
    TemplateNotFound {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A value was used in a way its type does not support.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("includes nested deeper than {0} levels")]
    IncludeDepth(usize),

    /// An `include` was rendered by a template without a loader.
    #[error("cannot include `{0}`: template has no loader")]
    NoLoader(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid options: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax(err) if err.is_lexical() => ErrorKind::Lexical,
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Config(_) => ErrorKind::Config,
            _ => ErrorKind::Runtime,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }

    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Error::TemplateNotFound {
            path: path.into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such template"),
        }
    }
}

/// Result type for tessera operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_syntax::{parse, ParseOptions};

    #[test]
    fn syntax_errors_are_classified() {
        let lexical: Error = parse("{{ ~ }}", ParseOptions::default())
            .unwrap_err()
            .into();
        assert_eq!(lexical.kind(), ErrorKind::Lexical);

        let syntax: Error = parse("{{ x", ParseOptions::default()).unwrap_err().into();
        assert_eq!(syntax.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn runtime_errors_are_classified() {
        assert_eq!(
            Error::UndefinedVariable("y".into()).kind(),
            ErrorKind::Runtime
        );
        assert_eq!(Error::not_found("x.txt").kind(), ErrorKind::Runtime);
    }

    #[test]
    fn not_found_keeps_io_source() {
        let err = Error::not_found("missing.txt");
        assert_eq!(err.to_string(), "template not found: missing.txt");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn messages_name_the_culprit() {
        assert_eq!(
            Error::UnknownFilter("shout".into()).to_string(),
            "unknown filter `shout`"
        );
        assert_eq!(
            Error::UndefinedAttribute {
                key: "name".into(),
                target: "int 3".into()
            }
            .to_string(),
            "cannot resolve `name` on int 3"
        );
    }
}
