//! On-disk mirror of the manifest/WAL.
//!
//! `anchored-vfs`'s own `std_fs` backend never wires its per-platform file impls up to a
//! `StandardFS` (the module is missing its root file), so this crate implements
//! `anchored_vfs::traits::{WritableFile, RandomAccess}` for `std::fs::File` directly instead of
//! depending on that backend; the per-type impls below follow the same shape `std_fs` uses.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Result as IoResult, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use anchored_vfs::traits::{RandomAccess, WritableFile};

struct StdFile(File);

impl RandomAccess for StdFile {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> IoResult<usize> {
        FileExt::read_at(&self.0, buf, offset)
    }
}

struct StdWriter(BufWriter<File>);

impl Write for StdWriter {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.0.flush()
    }
}

impl WritableFile for StdWriter {
    fn sync_data(&mut self) -> IoResult<()> {
        self.0.get_ref().sync_data()
    }
}

/// Sequentially-appended local copy of a manifest or WAL file, kept alongside the RDMA-backed
/// in-memory buffer so a crash between `append`s and the next `sync` still leaves bytes on disk.
pub struct LocalMirrorWriter {
    path:   PathBuf,
    writer: StdWriter,
}

impl LocalMirrorWriter {
    pub fn create(path: &Path) -> IoResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        Ok(Self { path: path.to_owned(), writer: StdWriter(BufWriter::new(file)) })
    }

    pub fn append(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.writer.write_all(bytes)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered writes and fsyncs file data, consuming the mirror.
    pub fn close(mut self) -> IoResult<()> {
        self.writer.flush()?;
        self.writer.sync_data()
    }
}

/// A local file opened for random access, used to read a mirror back during recovery.
pub struct LocalMirrorReader(StdFile);

impl LocalMirrorReader {
    pub fn open(path: &Path) -> IoResult<Self> {
        Ok(Self(StdFile(File::open(path)?)))
    }

    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> IoResult<usize> {
        self.0.read_at(offset, buf)
    }

    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> IoResult<()> {
        self.0.read_exact_at(offset, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_back_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MANIFEST-000001");

        let mut writer = LocalMirrorWriter::create(&path).unwrap();
        writer.append(b"hello ").unwrap();
        writer.append(b"world").unwrap();
        writer.close().unwrap();

        let reader = LocalMirrorReader::open(&path).unwrap();
        let mut buf = [0_u8; 5];
        reader.read_exact_at(6, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn create_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/MANIFEST-000001");
        LocalMirrorWriter::create(&path).unwrap();
        assert!(path.exists());
    }
}
