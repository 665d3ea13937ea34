use thiserror::Error;

/// Errors raised while compiling, evaluating or mutating with a path.
///
/// Absent data is never an error: missing properties and out-of-range
/// indices evaluate to null, empty or false.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed path text.
    #[error("{message} at position {position}")]
    Syntax { message: String, position: usize },

    /// Recognized but unimplemented grammar.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Operator applied to an operand of the wrong type.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// set/remove/add against a shape that cannot be mutated that way.
    #[error("mutation error: {0}")]
    Mutation(String),

    /// JSON text could not be parsed or produced.
    #[error("json error: {0}")]
    Json(String),
}

impl Error {
    pub fn syntax<M: Into<String>>(message: M, position: usize) -> Self {
        Error::Syntax { message: message.into(), position }
    }

    pub fn unsupported<M: Into<String>>(message: M) -> Self {
        Error::Unsupported(message.into())
    }

    pub fn evaluation<M: Into<String>>(message: M) -> Self {
        Error::Evaluation(message.into())
    }

    pub fn mutation<M: Into<String>>(message: M) -> Self {
        Error::Mutation(message.into())
    }

    /// Position of a syntax error, if this is one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}
