use std::collections::HashMap;

use parking_lot::Mutex;

use crate::operation::{Opcode, Operation, TransportError};
use crate::transport::StoCTransport;

/// An in-process stand-in for a StoC, for tests and for running the engine without RDMA
/// hardware. Backs `(dbname, file_number)` SSTables, per-`dbname` manifests, and per-LTC
/// migration inboxes with plain `Vec<u8>`s guarded by a mutex.
#[derive(Debug, Default)]
pub struct LoopbackStoC {
    sstables:          Mutex<HashMap<(String, u64), Vec<u8>>>,
    manifests:         Mutex<HashMap<String, Vec<u8>>>,
    migration_inboxes: Mutex<HashMap<u32, Vec<Vec<u8>>>>,
}

impl LoopbackStoC {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `(dbname, file_number)` with bytes, so tests can exercise reads without a prior
    /// flush through the same client.
    pub fn seed_sstable(&self, dbname: &str, file_number: u64, bytes: Vec<u8>) {
        self.sstables.lock().insert((dbname.to_owned(), file_number), bytes);
    }

    #[must_use]
    pub fn sstable_len(&self, dbname: &str, file_number: u64) -> Option<usize> {
        self.sstables.lock().get(&(dbname.to_owned(), file_number)).map(Vec::len)
    }

    #[must_use]
    pub fn manifest(&self, dbname: &str) -> Option<Vec<u8>> {
        self.manifests.lock().get(dbname).cloned()
    }

    /// Pops one buffer sent to `remote_ltc_id` via `initiate_rdma_write`, in send order.
    pub fn recv_migration(&self, remote_ltc_id: u32) -> Option<Vec<u8>> {
        self.migration_inboxes.lock().get_mut(&remote_ltc_id).filter(|inbox| !inbox.is_empty())?.pop()
    }
}

impl StoCTransport for LoopbackStoC {
    fn execute(&self, operation: Operation<'_>) -> Result<(), TransportError> {
        match operation {
            Operation::ReadBlock { dbname, file_number, offset, dst } => {
                let sstables = self.sstables.lock();
                let file = sstables.get(&(dbname.to_owned(), file_number)).ok_or_else(|| {
                    TransportError::new(Opcode::ReadBlock, format!("no such file {dbname}/{file_number}"))
                })?;
                read_slice_into(file, offset, dst, Opcode::ReadBlock)
            }
            Operation::ReadSstable { dbname, file_number, dst } => {
                let sstables = self.sstables.lock();
                let file = sstables.get(&(dbname.to_owned(), file_number)).ok_or_else(|| {
                    TransportError::new(Opcode::ReadSstable, format!("no such file {dbname}/{file_number}"))
                })?;
                read_slice_into(file, 0, dst, Opcode::ReadSstable)
            }
            Operation::FlushSstable { dbname, file_number, src } => {
                self.sstables.lock().insert((dbname.to_owned(), file_number), src.to_vec());
                Ok(())
            }
            Operation::WriteManifest { dbname, src } => {
                self.manifests.lock().insert(dbname.to_owned(), src.to_vec());
                Ok(())
            }
            Operation::ReadManifest { dbname, dst } => {
                let manifests = self.manifests.lock();
                let file = manifests.get(dbname).ok_or_else(|| {
                    TransportError::new(Opcode::ReadManifest, format!("no manifest for {dbname}"))
                })?;
                read_slice_into(file, 0, dst, Opcode::ReadManifest)
            }
            Operation::RdmaWrite { remote_ltc_id, src } => {
                self.migration_inboxes.lock().entry(remote_ltc_id).or_default().push(src.to_vec());
                Ok(())
            }
            Operation::DeleteFile { dbname, file_number } => {
                self.sstables.lock().remove(&(dbname.to_owned(), file_number));
                Ok(())
            }
        }
    }

    fn manifest_len(&self, dbname: &str) -> Option<u64> {
        self.manifests.lock().get(dbname).map(|bytes| bytes.len() as u64)
    }
}

fn read_slice_into(
    file:   &[u8],
    offset: u64,
    dst:    &mut [u8],
    opcode: Opcode,
) -> Result<(), TransportError> {
    let offset = usize::try_from(offset)
        .map_err(|_| TransportError::new(opcode, "offset does not fit in usize"))?;
    let end = offset.checked_add(dst.len())
        .ok_or_else(|| TransportError::new(opcode, "offset + len overflowed"))?;
    let source = file.get(offset..end)
        .ok_or_else(|| TransportError::new(opcode, format!("read of [{offset}, {end}) out of bounds (len {})", file.len())))?;

    dst.copy_from_slice(source);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_then_read_block_round_trips() {
        let stoc = LoopbackStoC::new();
        stoc.execute(Operation::FlushSstable { dbname: "db0", file_number: 1, src: b"hello world" })
            .unwrap();

        let mut dst = [0_u8; 5];
        stoc.execute(Operation::ReadBlock { dbname: "db0", file_number: 1, offset: 6, dst: &mut dst })
            .unwrap();
        assert_eq!(&dst, b"world");
    }

    #[test]
    fn read_of_unknown_file_fails() {
        let stoc = LoopbackStoC::new();
        let mut dst = [0_u8; 5];
        let err = stoc
            .execute(Operation::ReadSstable { dbname: "db0", file_number: 1, dst: &mut dst })
            .unwrap_err();
        assert_eq!(err.opcode, Opcode::ReadSstable);
    }

    #[test]
    fn manifest_round_trips_through_write_and_read() {
        let stoc = LoopbackStoC::new();
        assert_eq!(stoc.manifest_len("db0"), None);

        stoc.execute(Operation::WriteManifest { dbname: "db0", src: b"edit bytes" }).unwrap();
        assert_eq!(stoc.manifest_len("db0"), Some(10));

        let mut dst = [0_u8; 10];
        stoc.execute(Operation::ReadManifest { dbname: "db0", dst: &mut dst }).unwrap();
        assert_eq!(&dst, b"edit bytes");
    }

    #[test]
    fn rdma_write_lands_in_destination_inbox() {
        let stoc = LoopbackStoC::new();
        stoc.execute(Operation::RdmaWrite { remote_ltc_id: 7, src: b"migration payload" }).unwrap();
        assert_eq!(stoc.recv_migration(7).unwrap(), b"migration payload");
        assert!(stoc.recv_migration(7).is_none());
    }

    #[test]
    fn delete_file_removes_the_sstable() {
        let stoc = LoopbackStoC::new();
        stoc.execute(Operation::FlushSstable { dbname: "db0", file_number: 1, src: b"obsolete" }).unwrap();
        assert_eq!(stoc.sstable_len("db0", 1), Some(8));

        stoc.execute(Operation::DeleteFile { dbname: "db0", file_number: 1 }).unwrap();
        assert_eq!(stoc.sstable_len("db0", 1), None);
    }

    #[test]
    fn delete_file_of_unknown_file_still_succeeds() {
        let stoc = LoopbackStoC::new();
        stoc.execute(Operation::DeleteFile { dbname: "db0", file_number: 9 }).unwrap();
    }
}
