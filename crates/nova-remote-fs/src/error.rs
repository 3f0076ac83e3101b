use thiserror::Error;

/// Errors a `RemoteFile` can produce. A superset lives in `nova-ltc::Error`; the variants here
/// are exactly the error kinds this crate is capable of raising on its own.
#[derive(Debug, Error)]
pub enum Error {
    #[error("offset/length out of range: {0}")]
    InvalidArgument(String),

    #[error("buffer capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("local mirror I/O failure")]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    TransportError(#[from] nova_rdma::TransportError),

    #[error(transparent)]
    OutOfMemory(#[from] nova_pool::OutOfMemory),
}

pub type Result<T> = std::result::Result<T, Error>;
