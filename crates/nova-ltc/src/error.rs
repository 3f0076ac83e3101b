use thiserror::Error;

/// The crate-wide error type. Assertion-class invariant violations (refcount underflow,
/// overlap-invariant failure, manifest-lock misuse) are `panic!`/`assert!`, not a variant here;
/// they are fatal to the process, not a recoverable `Result`.
#[derive(Debug, Error)]
pub enum Error {
    /// The key is not present in any memtable or SSTable reachable from the current version.
    #[error("key not found")]
    NotFound,

    /// Manifest or SSTable bytes failed an invariant: bad magic, checksum mismatch, or an
    /// ordering violation.
    #[error("corruption: {0}")]
    Corruption(String),

    /// Malformed fragment-configuration line, malformed migration header, or API misuse (offset
    /// beyond file, append overflow).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Local file I/O failure for the on-disk mirror of the manifest or WAL.
    #[error("local I/O error")]
    IOError(#[from] std::io::Error),

    /// An RDMA request to a StoC returned failure.
    #[error(transparent)]
    TransportError(#[from] nova_rdma::TransportError),

    /// Slab allocation or buffer append beyond `allocated_size`.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The slab pool is exhausted.
    #[error(transparent)]
    OutOfMemory(#[from] nova_pool::OutOfMemory),
}

impl From<nova_remote_fs::Error> for Error {
    fn from(err: nova_remote_fs::Error) -> Self {
        match err {
            nova_remote_fs::Error::InvalidArgument(msg) => Self::InvalidArgument(msg),
            nova_remote_fs::Error::CapacityExceeded(msg) => Self::CapacityExceeded(msg),
            nova_remote_fs::Error::IOError(err) => Self::IOError(err),
            nova_remote_fs::Error::TransportError(err) => Self::TransportError(err),
            nova_remote_fs::Error::OutOfMemory(err) => Self::OutOfMemory(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
