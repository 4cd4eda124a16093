use crate::protocol::Command;

/// Errors decoding call or result envelopes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The call envelope is not of the form `name(args)`.
    #[error("malformed call: {0}")]
    MalformedCall(String),
    /// The call names an operation the sandbox does not export.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// Wrong number of arguments for the command.
    #[error("{command} takes {expected} arguments, got {found}")]
    Arity {
        /// Command being decoded.
        command: Command,
        /// Arguments the command takes.
        expected: usize,
        /// Arguments present.
        found: usize,
    },
    /// An argument has the wrong token type or an out-of-range value.
    #[error("{command} argument {position} must be {expected}")]
    ArgumentType {
        /// Command being decoded.
        command: Command,
        /// Zero-based argument position.
        position: usize,
        /// Expected token type.
        expected: &'static str,
    },
    /// A quoted string never closes.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// A backslash escape is not recognized.
    #[error("invalid escape sequence `{0}`")]
    InvalidEscape(String),
    /// A result envelope that should be numeric is not.
    #[error("non-numeric reply `{0}`")]
    NotNumeric(String),
    /// A compound reply has the wrong number of fields.
    #[error("expected {expected} reply fields, got {found}")]
    FieldCount {
        /// Fields the reply must have.
        expected: usize,
        /// Fields present.
        found: usize,
    },
    /// The sandbox rejected the call outright.
    #[error("sandbox fault: {0}")]
    Fault(String),
}
