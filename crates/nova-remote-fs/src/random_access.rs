use nova_pool::{SlabItem, SlabMemoryManager};
use nova_rdma::{RemoteBlockClient, StoCTransport};

use crate::error::{Error, Result};

/// Size of the reused slab buffer in block-mode.
pub const MAX_BLOCK_SIZE: usize = 100 * 1024;

enum Mode {
    /// One `MAX_BLOCK_SIZE` buffer, re-read from the StoC on every call.
    BlockMode { buffer: SlabItem },
    /// A buffer sized to the whole file, filled once on first read.
    PrefetchAll { buffer: SlabItem, populated: bool },
}

/// Component C3's `RandomAccess` `RemoteFile`. A single instance is single-threaded; concurrent
/// readers of the same file must each open their own instance (invariant).
pub struct RemoteRandomAccessFile<'a, T> {
    dbname:      String,
    file_number: u64,
    file_size:   u64,
    client:      &'a RemoteBlockClient<T>,
    mode:        Mode,
}

impl<'a, T: StoCTransport> RemoteRandomAccessFile<'a, T> {
    pub fn open_block_mode(
        dbname:      impl Into<String>,
        file_number: u64,
        file_size:   u64,
        client:      &'a RemoteBlockClient<T>,
        pool:        &SlabMemoryManager,
        thread_id:   usize,
    ) -> Result<Self> {
        let buffer = pool.item_alloc(thread_id, MAX_BLOCK_SIZE)?;
        Ok(Self {
            dbname: dbname.into(),
            file_number,
            file_size,
            client,
            mode: Mode::BlockMode { buffer },
        })
    }

    pub fn open_prefetch_all(
        dbname:      impl Into<String>,
        file_number: u64,
        file_size:   u64,
        client:      &'a RemoteBlockClient<T>,
        pool:        &SlabMemoryManager,
        thread_id:   usize,
    ) -> Result<Self> {
        let size = usize::try_from(file_size)
            .map_err(|_| Error::InvalidArgument(format!("file_size {file_size} does not fit in usize")))?;
        let buffer = pool.item_alloc(thread_id, size)?;
        Ok(Self {
            dbname: dbname.into(),
            file_number,
            file_size,
            client,
            mode: Mode::PrefetchAll { buffer, populated: false },
        })
    }

    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Reads up to `n` bytes starting at `offset` into `out`, returning the number of bytes
    /// actually read (`n` clamped to `file_size - offset`).
    pub fn read(&mut self, offset: u64, n: usize, out: &mut [u8]) -> Result<usize> {
        let remaining = self.file_size.saturating_sub(offset);
        let n = u64::try_from(n).unwrap_or(u64::MAX).min(remaining);
        let n = usize::try_from(n).expect("clamped below remaining, which fits since file_size does");

        match &mut self.mode {
            Mode::BlockMode { buffer } => {
                if n > buffer.len() {
                    return Err(Error::InvalidArgument(format!(
                        "read of {n} bytes exceeds block size {}", buffer.len(),
                    )));
                }
                let request_id = self.client.initiate_read_block(&self.dbname, self.file_number, offset, &mut buffer[..n]);
                self.client.wait_for(request_id)?;
                out[..n].copy_from_slice(&buffer[..n]);
            }
            Mode::PrefetchAll { buffer, populated } => {
                if !*populated {
                    let request_id = self.client.initiate_read_sstable(&self.dbname, self.file_number, buffer);
                    self.client.wait_for(request_id)?;
                    *populated = true;
                }
                let offset = usize::try_from(offset)
                    .map_err(|_| Error::InvalidArgument(format!("offset {offset} does not fit in usize")))?;
                out[..n].copy_from_slice(&buffer[offset..offset + n]);
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use nova_pool::SizeClasses;
    use nova_rdma::{LoopbackStoC, RemoteBlockClient};

    use super::*;

    fn pool_with(classes: Vec<usize>) -> SlabMemoryManager {
        SlabMemoryManager::new(SizeClasses::new(classes).unwrap(), 1 << 24)
    }

    #[test]
    fn block_mode_reads_through_initiate_read_block() {
        let client = RemoteBlockClient::new(LoopbackStoC::new());
        client.transport().seed_sstable("db0", 3, b"0123456789".to_vec());
        let pool = pool_with(vec![MAX_BLOCK_SIZE]);

        let mut file = RemoteRandomAccessFile::open_block_mode("db0", 3, 10, &client, &pool, 0).unwrap();
        let mut out = [0_u8; 4];
        let read = file.read(3, 4, &mut out).unwrap();
        assert_eq!(read, 4);
        assert_eq!(&out, b"3456");
    }

    #[test]
    fn prefetch_all_only_fetches_once() {
        let client = RemoteBlockClient::new(LoopbackStoC::new());
        client.transport().seed_sstable("db0", 4, b"abcdefghij".to_vec());
        let pool = pool_with(vec![16]);

        let mut file = RemoteRandomAccessFile::open_prefetch_all("db0", 4, 10, &client, &pool, 0).unwrap();

        let mut first = [0_u8; 3];
        file.read(0, 3, &mut first).unwrap();
        assert_eq!(&first, b"abc");

        // Drop backing data from the transport; a second read must still succeed because the
        // whole file was already cached locally.
        let mut second = [0_u8; 3];
        file.read(7, 3, &mut second).unwrap();
        assert_eq!(&second, b"hij");
    }

    #[test]
    fn read_is_clamped_to_remaining_file_size() {
        let client = RemoteBlockClient::new(LoopbackStoC::new());
        client.transport().seed_sstable("db0", 5, b"abcde".to_vec());
        let pool = pool_with(vec![MAX_BLOCK_SIZE]);

        let mut file = RemoteRandomAccessFile::open_block_mode("db0", 5, 5, &client, &pool, 0).unwrap();
        let mut out = [0_u8; 10];
        let read = file.read(3, 10, &mut out).unwrap();
        assert_eq!(read, 2);
        assert_eq!(&out[..2], b"de");
    }
}
