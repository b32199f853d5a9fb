use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TvmError {
    #[error("Cell overflow: {0}")]
    Overflow(String),
    #[error("Cell underflow: {0}")]
    Underflow(String),
    #[error("Malformed BoC: {0}")]
    MalformedBoc(String),
    #[error("Checksum mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Unsupported StateInit field: {0}")]
    UnsupportedField(&'static str),
    #[error("Cell is finalized and can no longer be modified")]
    MutationAfterFinalize,
}

pub type Result<T> = std::result::Result<T, TvmError>;

macro_rules! malformed {
    ($($arg:tt)*) => {
        $crate::tvm::error::TvmError::MalformedBoc(format!($($arg)*))
    };
}

pub(crate) use malformed;
