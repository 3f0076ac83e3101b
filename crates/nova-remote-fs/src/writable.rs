use std::path::Path;

use nova_pool::{SlabItem, SlabMemoryManager};
use nova_rdma::{RemoteBlockClient, StoCTransport};

use crate::error::{Error, Result};
use crate::local_mirror::LocalMirrorWriter;

/// Which StoC-side destination a `RemoteWritableFile` targets; decides which RDMA opcode `sync`
/// uses (`NovaCCMemFile` is the `Manifest` case).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Sstable,
    Manifest,
}

/// Component C3's writable `RemoteFile`: an in-memory slab buffer that fills up to its allocated
/// size, mirrored to a local on-disk file, and flushed to the StoC once on `sync`.
pub struct RemoteWritableFile<'a, T> {
    dbname:       String,
    file_number:  u64,
    kind:         FileKind,
    client:       &'a RemoteBlockClient<T>,
    buffer:       SlabItem,
    used:         usize,
    local_mirror: Option<LocalMirrorWriter>,
    synced:       bool,
}

impl<'a, T: StoCTransport> RemoteWritableFile<'a, T> {
    /// Allocates a slab buffer of `allocated_size` bytes (rounded up to its size class) and, if
    /// `local_mirror_path` is given, opens a local file mirrored alongside it.
    pub fn new(
        dbname:            impl Into<String>,
        file_number:       u64,
        kind:              FileKind,
        client:            &'a RemoteBlockClient<T>,
        pool:              &SlabMemoryManager,
        thread_id:         usize,
        allocated_size:    usize,
        local_mirror_path: Option<&Path>,
    ) -> Result<Self> {
        let buffer = pool.item_alloc(thread_id, allocated_size)?;
        let local_mirror = local_mirror_path
            .map(LocalMirrorWriter::create)
            .transpose()?;

        Ok(Self {
            dbname: dbname.into(),
            file_number,
            kind,
            client,
            buffer,
            used: 0,
            local_mirror,
            synced: false,
        })
    }

    #[must_use]
    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    #[must_use]
    pub fn used(&self) -> usize {
        self.used
    }

    #[must_use]
    pub fn allocated(&self) -> usize {
        self.buffer.len()
    }

    /// Appends to the logical end of the buffer. Fails with `CapacityExceeded` if this would
    /// exceed the buffer's allocated size.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let new_used = self.used.checked_add(bytes.len()).ok_or_else(|| {
            Error::CapacityExceeded(format!("append length {} overflows usize", bytes.len()))
        })?;
        self.check_capacity(new_used)?;

        self.buffer[self.used..new_used].copy_from_slice(bytes);
        self.used = new_used;

        if let Some(mirror) = &mut self.local_mirror {
            mirror.append(bytes)?;
        }
        Ok(())
    }

    /// Writes at an arbitrary offset, extending `used` if the write reaches past it.
    ///
    /// The local mirror only supports sequential appends, so a `write` that does not land
    /// exactly at the mirror's current end is not mirrored; manifests and WALs only ever
    /// extend their writable files by appending, so this never happens in practice.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset.checked_add(bytes.len()).ok_or_else(|| {
            Error::InvalidArgument(format!("offset {offset} + len {} overflows usize", bytes.len()))
        })?;
        self.check_capacity(end)?;

        self.buffer[offset..end].copy_from_slice(bytes);
        if end > self.used {
            self.used = end;
        }
        Ok(())
    }

    /// Reads back from the still-in-memory buffer, before `sync` has shipped it to the StoC.
    pub fn read(&self, offset: usize, n: usize, out: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(n)
            .ok_or_else(|| Error::InvalidArgument(format!("offset {offset} + n {n} overflows usize")))?;
        if end > self.used {
            return Err(Error::InvalidArgument(format!(
                "read of [{offset}, {end}) exceeds {} written bytes", self.used,
            )));
        }
        out[..n].copy_from_slice(&self.buffer[offset..end]);
        Ok(())
    }

    /// Ships the buffer to its home StoC and blocks until the RDMA request completes. The slab
    /// buffer's lifetime extends through `self`'s own destruction, so `RemoteRandomAccessFile`s
    /// opened against the same file number during this DB session keep working. The local
    /// mirror, if any, is closed.
    pub fn sync(&mut self) -> Result<()> {
        let request_id = match self.kind {
            FileKind::Sstable => {
                self.client.initiate_flush_sstable(&self.dbname, self.file_number, &self.buffer[..self.used])
            }
            FileKind::Manifest => {
                self.client.initiate_write_manifest(&self.dbname, &self.buffer[..self.used])
            }
        };
        self.client.wait_for(request_id)?;

        if let Some(mirror) = self.local_mirror.take() {
            mirror.close()?;
        }

        self.synced = true;
        tracing::info!(
            dbname = %self.dbname,
            file_number = self.file_number,
            kind = ?self.kind,
            bytes = self.used,
            "remote file synced",
        );
        Ok(())
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    fn check_capacity(&self, required: usize) -> Result<()> {
        if required > self.buffer.len() {
            return Err(Error::CapacityExceeded(format!(
                "{required} bytes requested but only {} allocated", self.buffer.len(),
            )));
        }
        Ok(())
    }
}
