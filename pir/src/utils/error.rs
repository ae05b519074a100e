use strum::EnumIs;
use thiserror::Error;

/// Recoverable errors raised by the IR layer.
///
/// Programming errors (out-of-range slot access, invalid `dyn_cast`, double
/// destroy) are not represented here: they panic.
#[derive(Debug, Error, EnumIs)]
pub enum IrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// No op kind with this name was registered in the context.
    #[error("Operation `{0}` is not registered in this context. Register its dialect first.")]
    UnregisteredOperation(String),

    /// An op kind with this name is already registered in the context.
    #[error("Operation `{0}` is already registered in this context.")]
    DuplicateOperation(String),

    /// The operation handle does not belong to the program it was removed from.
    #[error("Operation `{0}` does not belong to this program.")]
    OperationNotInProgram(String),

    /// A registered verifier rejected an operation.
    #[error("Verification of operation `{op}` failed: {reason}")]
    VerificationFailed { op: String, reason: String },
}

pub type IrResult<T> = Result<T, IrError>;
