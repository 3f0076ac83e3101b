use thiserror::Error;

/// The RDMA wire opcodes the core consumes from C2. Exact byte layouts belong to the StoC; the
/// engine only ever sees which opcode a request used and whether it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    ReadBlock,
    ReadSstable,
    FlushSstable,
    WriteManifest,
    ReadManifest,
    RdmaWrite,
    DeleteFile,
}

/// One in-flight request, borrowing its payload buffer for the duration of `execute`.
///
/// The payload slice must remain valid until the client reports the resulting [`RequestId`] as
/// done; every [`StoCTransport`](crate::StoCTransport) impl in this crate executes synchronously
/// inside `execute`, so that invariant is upheld trivially by the borrow checker rather than by
/// caller discipline.
pub enum Operation<'a> {
    ReadBlock {
        dbname:      &'a str,
        file_number: u64,
        offset:      u64,
        dst:         &'a mut [u8],
    },
    ReadSstable {
        dbname:      &'a str,
        file_number: u64,
        dst:         &'a mut [u8],
    },
    FlushSstable {
        dbname:      &'a str,
        file_number: u64,
        src:         &'a [u8],
    },
    WriteManifest {
        dbname: &'a str,
        src:    &'a [u8],
    },
    ReadManifest {
        dbname: &'a str,
        dst:    &'a mut [u8],
    },
    RdmaWrite {
        remote_ltc_id: u32,
        src:           &'a [u8],
    },
    /// Unlinks a file a `VersionEdit` just obsoleted. Best-effort from the caller's point of
    /// view: a failure here leaves an orphaned SSTable on the StoC, not a correctness gap, since
    /// no live `Version` references it anymore.
    DeleteFile {
        dbname:      &'a str,
        file_number: u64,
    },
}

impl Operation<'_> {
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::ReadBlock { .. }     => Opcode::ReadBlock,
            Self::ReadSstable { .. }   => Opcode::ReadSstable,
            Self::FlushSstable { .. } => Opcode::FlushSstable,
            Self::WriteManifest { .. } => Opcode::WriteManifest,
            Self::ReadManifest { .. }  => Opcode::ReadManifest,
            Self::RdmaWrite { .. }     => Opcode::RdmaWrite,
            Self::DeleteFile { .. }    => Opcode::DeleteFile,
        }
    }
}

#[derive(Debug, Error, Clone)]
#[error("RDMA transport error on {opcode:?}: {message}")]
pub struct TransportError {
    pub opcode:  Opcode,
    pub message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(opcode: Opcode, message: impl Into<String>) -> Self {
        Self { opcode, message: message.into() }
    }
}
