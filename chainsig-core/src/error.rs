use thiserror::Error;

/// Errors raised by derivation, encoding and signature checks.
///
/// Every variant is a deterministic function of the input; retrying the
/// same call yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("invalid curve point: {0}")]
    InvalidPoint(String),

    #[error("derived epsilon scalar is zero")]
    InvalidScalar,

    #[error("child key derivation produced the point at infinity")]
    DegenerateDerivation,

    #[error("malformed derivation path: {0}")]
    MalformedPath(String),

    #[error("unsupported address type: {0}")]
    UnsupportedAddressType(String),

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
