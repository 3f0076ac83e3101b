use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use nova_format::{write_length_prefixed, InternalKey, InternalKeyComparator, SequenceNumber};
use nova_pool::SlabMemoryManager;
use nova_rdma::{RemoteBlockClient, StoCTransport};
use nova_remote_fs::{FileKind, RemoteWritableFile};
use parking_lot::{Mutex, RwLock};
use seekable_iterator::Comparator as _;

use crate::compaction::{self, Compaction};
use crate::error::{Error, Result};
use crate::file_meta::{FileMetaData, Level, NUM_LEVELS};
use crate::version::Version;
use crate::version_edit::VersionEdit;

struct ManifestState {
    /// The full manifest content logged so far, length-prefixed `VersionEdit` records
    /// concatenated in application order. `sync` ships this whole accumulator on every
    /// `log_and_apply`, rather than an incremental remote append, because
    /// `RemoteWritableFile::sync` ships its entire buffer in one shot and the StoC's manifest
    /// slot is overwrite-semantics. Re-sending the full history keeps the remote manifest
    /// exactly equal to "replay these edits in order" without needing a long-lived writer
    /// that borrows its own `RemoteBlockClient` across calls.
    bytes: Vec<u8>,
}

/// Per-database version set (component C5): the current [`Version`], the manifest log, and the
/// file-number/sequence-number counters every `LogAndApply` call advances.
pub struct VersionSet<T> {
    dbname:            String,
    client:             RemoteBlockClient<T>,
    pool:               Arc<SlabMemoryManager>,
    thread_id:          usize,
    local_mirror_path:  Option<PathBuf>,

    current:            RwLock<Arc<Version>>,
    next_version_id:    AtomicU32,
    next_file_number:   AtomicU64,
    last_sequence:      Mutex<SequenceNumber>,
    compact_pointers:   Mutex<[Option<InternalKey>; NUM_LEVELS]>,
    manifest:           Mutex<ManifestState>,
}

impl<T: StoCTransport> VersionSet<T> {
    #[must_use]
    pub fn new(
        dbname:           impl Into<String>,
        client:           RemoteBlockClient<T>,
        pool:             Arc<SlabMemoryManager>,
        thread_id:        usize,
        local_mirror_path: Option<PathBuf>,
    ) -> Self {
        Self {
            dbname: dbname.into(),
            client,
            pool,
            thread_id,
            local_mirror_path,
            current:          RwLock::new(Arc::new(Version::new(0, Default::default()))),
            next_version_id:  AtomicU32::new(1),
            next_file_number: AtomicU64::new(1),
            last_sequence:    Mutex::new(SequenceNumber::ZERO),
            compact_pointers: Mutex::new(Default::default()),
            manifest:         Mutex::new(ManifestState { bytes: Vec::new() }),
        }
    }

    /// Rebuilds a `VersionSet` by replaying whatever manifest already exists on the StoC for
    /// `dbname`, in the order it was logged. Returns a fresh, empty version set if no manifest
    /// has ever been written (a brand-new database).
    ///
    /// # Errors
    /// `Corruption` if the manifest exists but its length-prefixed record stream is truncated or
    /// contains an edit that fails to decode. Callers should treat this as fatal to opening the
    /// fragment rather than serve a partially-replayed version.
    pub fn recover(
        dbname:            impl Into<String>,
        client:            RemoteBlockClient<T>,
        pool:              Arc<SlabMemoryManager>,
        thread_id:         usize,
        local_mirror_path: Option<PathBuf>,
    ) -> Result<Self> {
        let dbname = dbname.into();
        let Some(len) = client.manifest_len(&dbname) else {
            return Ok(Self::new(dbname, client, pool, thread_id, local_mirror_path));
        };
        let len = usize::try_from(len)
            .map_err(|_| Error::Corruption(format!("manifest length {len} does not fit in usize")))?;
        if len == 0 {
            return Ok(Self::new(dbname, client, pool, thread_id, local_mirror_path));
        }

        let mut buffer = pool.item_alloc(thread_id, len)?;
        let request_id = client.initiate_read_manifest(&dbname, &mut buffer[..len]);
        client.wait_for(request_id)?;
        let bytes = buffer[..len].to_vec();

        let mut current = Version::new(0, Default::default());
        let mut next_version_id: u32 = 1;
        let mut next_file_number: u64 = 1;
        let mut last_sequence = SequenceNumber::ZERO;
        let mut compact_pointers: [Option<InternalKey>; NUM_LEVELS] = Default::default();

        let mut remaining = bytes.as_slice();
        while !remaining.is_empty() {
            let (record, consumed) = nova_format::read_length_prefixed(remaining)
                .map_err(|err| Error::Corruption(format!("manifest record framing: {err}")))?;
            let edit = VersionEdit::decode(record)
                .map_err(|err| Error::Corruption(format!("manifest record decode: {err}")))?;

            current = apply_edit(&current, &edit, next_version_id);
            next_version_id += 1;
            if let Some(number) = edit.next_file_number {
                next_file_number = next_file_number.max(number);
            }
            if let Some(sequence) = edit.last_sequence {
                last_sequence = sequence;
            }
            for (level, key) in &edit.compact_pointers {
                compact_pointers[level.as_usize()] = Some(key.clone());
            }
            remaining = &remaining[consumed..];
        }

        Ok(Self {
            dbname,
            client,
            pool,
            thread_id,
            local_mirror_path,
            current:          RwLock::new(Arc::new(current)),
            next_version_id:  AtomicU32::new(next_version_id),
            next_file_number: AtomicU64::new(next_file_number),
            last_sequence:    Mutex::new(last_sequence),
            compact_pointers: Mutex::new(compact_pointers),
            manifest:         Mutex::new(ManifestState { bytes }),
        })
    }

    /// The currently installed version. Readers and iterators hold this `Arc` for as long as
    /// they need a consistent snapshot; `log_and_apply` never mutates it in place, so a held
    /// version never changes out from under its reader ("readers never block
    /// writers").
    #[must_use]
    pub fn current(&self) -> Arc<Version> {
        Arc::clone(&self.current.read())
    }

    #[must_use]
    pub fn last_sequence(&self) -> SequenceNumber {
        *self.last_sequence.lock()
    }

    /// Allocates the next file number (invariant 3: strictly increasing, never reused).
    pub fn new_file_number(&self) -> u64 {
        self.next_file_number.fetch_add(1, Ordering::SeqCst)
    }

    /// Reads the file-number counter without advancing it, for callers that need to snapshot it
    /// alongside other state (a migration handoff) rather than allocate from it.
    #[must_use]
    pub fn next_file_number(&self) -> u64 {
        self.next_file_number.load(Ordering::SeqCst)
    }

    /// Bumps the file-number counter so that `file_number` (and everything below it) is never
    /// handed out by [`Self::new_file_number`] again.
    pub fn mark_file_number_used(&self, file_number: u64) {
        self.next_file_number.fetch_max(file_number + 1, Ordering::SeqCst);
    }

    /// Applies `edit`: serializes and ships it to the manifest, then installs the resulting
    /// [`Version`] as current. Concurrent callers are serialized by the manifest lock; an
    /// error leaves both the manifest accumulator and the current version exactly as they were
    /// (the swap only happens after a successful remote sync).
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `edit.last_sequence` would move `last_sequence` backward
    /// (invariant 4), or any error `RemoteWritableFile` surfaces while shipping the
    /// manifest.
    pub fn log_and_apply(&self, edit: VersionEdit) -> Result<Arc<Version>> {
        let mut manifest = self.manifest.lock();

        if let Some(last_sequence) = edit.last_sequence {
            let current = *self.last_sequence.lock();
            if last_sequence < current {
                return Err(Error::InvalidArgument(format!(
                    "log_and_apply: last_sequence {} would move backward from {}",
                    last_sequence.inner(), current.inner(),
                )));
            }
        }

        let current_version = self.current();
        let version_id = self.next_version_id.fetch_add(1, Ordering::SeqCst);
        let new_version = apply_edit(&current_version, &edit, version_id);

        let mut record = Vec::new();
        write_length_prefixed(&mut record, &edit.encode());
        manifest.bytes.extend_from_slice(&record);

        let mut writer = RemoteWritableFile::new(
            &self.dbname,
            0,
            FileKind::Manifest,
            &self.client,
            &self.pool,
            self.thread_id,
            manifest.bytes.len(),
            self.local_mirror_path.as_deref(),
        )?;
        writer.append(&manifest.bytes)?;
        writer.sync()?;

        if let Some(next_file_number) = edit.next_file_number {
            self.next_file_number.fetch_max(next_file_number, Ordering::SeqCst);
        }
        if let Some(last_sequence) = edit.last_sequence {
            *self.last_sequence.lock() = last_sequence;
        }
        {
            let mut pointers = self.compact_pointers.lock();
            for (level, key) in &edit.compact_pointers {
                pointers[level.as_usize()] = Some(key.clone());
            }
        }
        for (_level, file_number) in &edit.deleted_files {
            tracing::info!(dbname = %self.dbname, file_number, "file obsoleted by version edit");
            let request_id = self.client.initiate_delete_file(&self.dbname, *file_number);
            if let Err(err) = self.client.wait_for(request_id) {
                tracing::warn!(dbname = %self.dbname, file_number, %err, "failed to delete obsolete file on StoC");
            }
        }

        let new_version = Arc::new(new_version);
        *self.current.write() = Arc::clone(&new_version);
        Ok(new_version)
    }

    /// Picks the next compaction against the current version, per its scoring and
    /// seek-exhaustion tie-break rules.
    #[must_use]
    pub fn pick_compaction(&self) -> Option<Compaction> {
        let version = self.current();
        let pointers = self.compact_pointers.lock();
        let seek_target = Level::all().find_map(|level| {
            version.files(level).iter().find(|f| f.needs_seek_compaction()).map(|f| (level, Arc::clone(f)))
        });
        compaction::pick_compaction(&version, &*pointers, seek_target)
    }

    #[must_use]
    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    /// The underlying RDMA client, shared with callers that need to read SSTables directly
    /// (the DB's Get path) rather than through `VersionSet`'s own manifest-only use of it.
    #[must_use]
    pub fn client(&self) -> &RemoteBlockClient<T> {
        &self.client
    }
}

/// Builds the next [`Version`] by applying `edit` to `current`'s per-level file sets: removes
/// `deleted_files`, inserts `new_files` (each restarting its own `allowed_seeks` budget), and
/// keeps every level sorted by `smallest` (invariant 1).
fn apply_edit(current: &Version, edit: &VersionEdit, version_id: u32) -> Version {
    let mut files: [Vec<Arc<FileMetaData>>; NUM_LEVELS] =
        std::array::from_fn(|l| current.files(Level::new(l).expect("l < NUM_LEVELS")).to_vec());

    for (level, file_number) in &edit.deleted_files {
        files[level.as_usize()].retain(|f| f.file_number() != *file_number);
    }
    for (level, file) in &edit.new_files {
        files[level.as_usize()].push(Arc::new(FileMetaData::new(
            file.file_number(),
            file.file_size(),
            file.smallest().clone(),
            file.largest().clone(),
        )));
    }
    for level_files in &mut files {
        level_files.sort_by(|a, b| InternalKeyComparator.cmp(&a.smallest().encode(), &b.smallest().encode()));
    }

    Version::new(version_id, files)
}
