use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nova_format::{EntryType, InternalKey, SequenceNumber};
use nova_memtable::{AtomicMemTable, Memtable, MemtableId, MemtableIdPool};
use nova_pool::SlabMemoryManager;
use nova_rdma::{RemoteBlockClient, StoCTransport};
use nova_remote_fs::{FileKind, RemoteRandomAccessFile, RemoteWritableFile};
use parking_lot::{Mutex, RwLock};

use crate::compaction::{self, Compaction};
use crate::error::{Error, Result};
use crate::file_meta::{FileMetaData, Level};
use crate::migration::MigrationHeader;
use crate::sstable::{self, Lookup};
use crate::version_edit::VersionEdit;
use crate::version_set::VersionSet;

struct WriteState {
    id:       MemtableId,
    memtable: Memtable,
}

/// Ties the memtable pool (C4) to the version set (C5) into a working Put/Get/flush/compact
/// path: writes land in the current memtable; once it crosses `write_buffer_size` it's sealed
/// and flushed into an L0 file, installed via a version edit, and whatever compaction the
/// version set picks as a result runs immediately after.
///
/// There is no background flush or compaction thread here: the carried-over dependency stack has
/// no job-queue or async runtime crate to build one on top of, so [`Db::put`] drives both inline
/// before returning rather than handing them to a scheduler. The observable behavior is the same
/// either way; only the timing differs.
pub struct Db<T> {
    version_set:       VersionSet<T>,
    pool:              Arc<SlabMemoryManager>,
    thread_id:         usize,
    local_mirror_path: Option<PathBuf>,
    write_buffer_size: usize,

    id_pool:      MemtableIdPool,
    slots:        RwLock<HashMap<MemtableId, Arc<AtomicMemTable>>>,
    write:        Mutex<WriteState>,
    next_sequence: AtomicU64,
}

impl<T: StoCTransport> Db<T> {
    /// Opens a database, recovering from whatever manifest already exists on the StoC for
    /// `dbname` (or starting fresh if none does), and publishes a single live memtable ready for
    /// writes.
    ///
    /// # Errors
    /// `Corruption` if a manifest exists but its record stream is truncated or fails to decode.
    /// The fragment refuses to open in that case; other fragments are unaffected.
    pub fn open(
        dbname:            impl Into<String>,
        client:            RemoteBlockClient<T>,
        pool:              Arc<SlabMemoryManager>,
        thread_id:         usize,
        local_mirror_path: Option<PathBuf>,
        write_buffer_size: usize,
    ) -> Result<Self> {
        let version_set =
            VersionSet::recover(dbname, client, Arc::clone(&pool), thread_id, local_mirror_path.clone())?;
        let id_pool = MemtableIdPool::bounded();
        let id = id_pool.acquire().map_err(|err| Error::InvalidArgument(err.to_string()))?;

        let memtable = Memtable::new(id);
        let write_handle = memtable.refcounted_clone();
        let slot = Arc::new(AtomicMemTable::new());
        slot.publish(memtable);

        let mut slots = HashMap::new();
        slots.insert(id, slot);

        let next_sequence = version_set.last_sequence().inner() + 1;

        Ok(Self {
            version_set,
            pool,
            thread_id,
            local_mirror_path,
            write_buffer_size,
            id_pool,
            slots: RwLock::new(slots),
            write: Mutex::new(WriteState { id, memtable: write_handle }),
            next_sequence: AtomicU64::new(next_sequence),
        })
    }

    #[must_use]
    pub fn dbname(&self) -> &str {
        self.version_set.dbname()
    }

    #[must_use]
    pub fn version_set(&self) -> &VersionSet<T> {
        &self.version_set
    }

    /// Current write-pointer memtable id, for tests and `AtomicMemTable::acquire_ref` callers.
    #[must_use]
    pub fn active_memtable_id(&self) -> MemtableId {
        self.write.lock().id
    }

    /// Writes `user_key -> value` at a freshly allocated sequence number, sealing and flushing
    /// the active memtable first if it has already crossed `write_buffer_size`.
    ///
    /// # Errors
    /// `InvalidArgument` if the sequence-number space is exhausted or the memtable id pool is
    /// exhausted; any error the flush path surfaces while shipping the new SSTable or manifest
    /// edit.
    pub fn put(&self, user_key: &[u8], value: &[u8]) -> Result<()> {
        let sequence = self.allocate_sequence()?;
        let key = InternalKey::new(user_key, sequence, EntryType::Value);

        {
            let mut write = self.write.lock();
            write.memtable.put(&key, value);
        }

        self.seal_if_full()
    }

    /// Writes a tombstone for `user_key` (an internal key with `entry_type = Deletion`).
    pub fn delete(&self, user_key: &[u8]) -> Result<()> {
        let sequence = self.allocate_sequence()?;
        let key = InternalKey::new(user_key, sequence, EntryType::Deletion);

        {
            let mut write = self.write.lock();
            write.memtable.put(&key, &[]);
        }

        self.seal_if_full()
    }

    /// Reads the newest value visible for `user_key` as of the last assigned sequence number:
    /// the active memtable first, then the current version's files, L0 newest-first.
    ///
    /// # Errors
    /// `NotFound` if the key has no live (non-tombstone) entry anywhere reachable; `Corruption`
    /// if an SSTable's bytes fail to decode.
    pub fn get(&self, user_key: &[u8]) -> Result<Vec<u8>> {
        let sequence = SequenceNumber::new_unchecked(self.next_sequence.load(Ordering::SeqCst).saturating_sub(1));

        {
            let write = self.write.lock();
            if let Some((found, value)) = write.memtable.get(user_key, sequence) {
                return match found.entry_type {
                    EntryType::Value => Ok(value),
                    EntryType::Deletion => Err(Error::NotFound),
                };
            }
        }

        let version = self.version_set.current();
        for file in version.files_covering(user_key, sequence) {
            match self.lookup_in_file(&file, user_key, sequence)? {
                Lookup::Found(value) => return Ok(value),
                Lookup::Tombstone => return Err(Error::NotFound),
                Lookup::Absent => {}
            }
        }

        Err(Error::NotFound)
    }

    fn lookup_in_file(&self, file: &FileMetaData, user_key: &[u8], sequence: SequenceNumber) -> Result<Lookup> {
        let bytes = self.read_sstable_bytes(file)?;
        sstable::lookup_entry(&bytes, user_key, sequence)
    }

    fn read_sstable_bytes(&self, file: &FileMetaData) -> Result<Vec<u8>> {
        let mut reader = RemoteRandomAccessFile::open_prefetch_all(
            self.version_set.dbname(),
            file.file_number(),
            file.file_size(),
            self.version_set.client(),
            &self.pool,
            self.thread_id,
        )?;

        let size = usize::try_from(file.file_size())
            .map_err(|_| Error::InvalidArgument(format!("file_size {} does not fit in usize", file.file_size())))?;
        let mut bytes = vec![0_u8; size];
        reader.read(0, size, &mut bytes)?;
        Ok(bytes)
    }

    fn read_sstable_entries(&self, file: &FileMetaData) -> Result<Vec<(InternalKey, Vec<u8>)>> {
        sstable::decode_entries(&self.read_sstable_bytes(file)?)
    }

    fn allocate_sequence(&self) -> Result<SequenceNumber> {
        let raw = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        SequenceNumber::new_usable(raw)
            .ok_or_else(|| Error::InvalidArgument("sequence number space exhausted".to_owned()))
    }

    fn seal_if_full(&self) -> Result<()> {
        let needs_seal = self.write.lock().memtable.approx_memory_usage() >= self.write_buffer_size;
        if !needs_seal {
            return Ok(());
        }

        let Some((old_id, old_slot, old_handle)) = self.seal()? else { return Ok(()) };
        self.flush(old_id, &old_slot, &old_handle)?;
        self.compact_if_needed()
    }

    /// Installs a fresh memtable as the write pointer, returning the sealed one's id, slot, and
    /// a handle to its contents for the flusher to read.
    fn seal(&self) -> Result<Option<(MemtableId, Arc<AtomicMemTable>, Memtable)>> {
        let mut write = self.write.lock();
        if write.memtable.is_empty() {
            return Ok(None);
        }

        let old_id = write.id;
        let old_handle = write.memtable.refcounted_clone();

        let new_id = self.id_pool.acquire().map_err(|err| Error::InvalidArgument(err.to_string()))?;
        let new_memtable = Memtable::new(new_id);
        let new_handle = new_memtable.refcounted_clone();
        let new_slot = Arc::new(AtomicMemTable::new());
        new_slot.publish(new_memtable);

        let old_slot = {
            let mut slots = self.slots.write();
            slots.insert(new_id, new_slot);
            Arc::clone(slots.get(&old_id).expect("old_id's slot was published by open() or a prior seal()"))
        };
        old_slot.unref(); // release the write reference; readers' own refs (if any) keep it alive

        write.id = new_id;
        write.memtable = new_handle;

        Ok(Some((old_id, old_slot, old_handle)))
    }

    /// Builds an SSTable from `memtable`'s full contents, ships it, and installs the resulting
    /// file via a version edit.
    fn flush(&self, _old_id: MemtableId, old_slot: &AtomicMemTable, memtable: &Memtable) -> Result<()> {
        let entries = memtable.entries();
        let Some((first, _)) = entries.first() else {
            return Ok(());
        };
        let smallest = first.clone();
        let largest = entries.last().expect("non-empty, checked via first()").0.clone();

        let body = sstable::encode_entries(&entries);
        let file_number = self.version_set.new_file_number();

        let mut writer = RemoteWritableFile::new(
            self.version_set.dbname(),
            file_number,
            FileKind::Sstable,
            self.version_set.client(),
            &self.pool,
            self.thread_id,
            body.len(),
            self.local_mirror_path.as_deref(),
        )?;
        writer.append(&body)?;
        writer.sync()?;

        let level = self.version_set.current().level_for_compacted_memtable(&smallest, &largest);

        let mut edit = VersionEdit::new();
        edit.add_file(level, FileMetaData::new(file_number, body.len() as u64, smallest, largest));
        edit.last_sequence =
            Some(SequenceNumber::new_unchecked(self.next_sequence.load(Ordering::SeqCst).saturating_sub(1)));
        self.version_set.log_and_apply(edit)?;

        old_slot.set_flushed(file_number);
        Ok(())
    }

    /// Runs the version set's next picked compaction, if it has one. A no-op if nothing needs
    /// compacting, or if the picked level has no next level to promote into (the highest level
    /// has nowhere left to go).
    fn compact_if_needed(&self) -> Result<()> {
        let Some(compaction) = self.version_set.pick_compaction() else { return Ok(()) };
        self.run_compaction(compaction)
    }

    /// Executes `compaction`: a trivial move just rewrites the version edit with the same file
    /// metadata at `level + 1`; otherwise merges every input file's entries by internal-key
    /// order, drops entries shadowed by a newer write and tombstones no longer observable by any
    /// write still being applied, and ships the result as one or more new `level + 1` SSTables.
    fn run_compaction(&self, mut compaction: Compaction) -> Result<()> {
        let Some(next_level) = compaction.level.next() else { return Ok(()) };

        let mut edit = VersionEdit::new();
        for file in &compaction.level_inputs {
            edit.delete_file(compaction.level, file.file_number());
        }
        for file in &compaction.next_level_inputs {
            edit.delete_file(next_level, file.file_number());
        }

        if compaction.is_trivial_move() {
            let file = &compaction.level_inputs[0];
            edit.add_file(
                next_level,
                FileMetaData::new(file.file_number(), file.file_size(), file.smallest().clone(), file.largest().clone()),
            );
            self.version_set.log_and_apply(edit)?;
            return Ok(());
        }

        let oldest_live_sequence = self.version_set.last_sequence();
        let mut inputs = Vec::with_capacity(compaction.level_inputs.len() + compaction.next_level_inputs.len());
        for file in compaction.level_inputs.iter().chain(compaction.next_level_inputs.iter()) {
            inputs.push(self.read_sstable_entries(file)?);
        }
        let merged = compaction::merge_and_collapse(inputs, oldest_live_sequence);

        for entries in compaction.partition_into_outputs(merged) {
            let Some((first, _)) = entries.first() else { continue };
            let smallest = first.clone();
            let largest = entries.last().expect("non-empty, checked via first()").0.clone();

            let body = sstable::encode_entries(&entries);
            let file_number = self.version_set.new_file_number();

            let mut writer = RemoteWritableFile::new(
                self.version_set.dbname(),
                file_number,
                FileKind::Sstable,
                self.version_set.client(),
                &self.pool,
                self.thread_id,
                body.len(),
                self.local_mirror_path.as_deref(),
            )?;
            writer.append(&body)?;
            writer.sync()?;

            edit.add_file(next_level, FileMetaData::new(file_number, body.len() as u64, smallest, largest));
        }

        self.version_set.log_and_apply(edit)?;
        Ok(())
    }

    /// Builds a point-in-time migration header (component C6) from this fragment's live state:
    /// every file in the current version plus the file-number and sequence-number counters for
    /// `version_blob`, and the active memtable's full contents for `memtable_blob`. The
    /// subrange/lookup-index/table-id-mapping blobs are left empty: this engine keeps no such
    /// indexes to carry across.
    #[must_use]
    pub fn build_migration_header(&self, db_index: u32) -> MigrationHeader {
        let version = self.version_set.current();
        let mut edit = VersionEdit::new();
        for level in Level::all() {
            for file in version.files(level) {
                edit.add_file(
                    level,
                    FileMetaData::new(file.file_number(), file.file_size(), file.smallest().clone(), file.largest().clone()),
                );
            }
        }
        edit.next_file_number = Some(self.version_set.next_file_number());
        edit.last_sequence = Some(self.version_set.last_sequence());

        let memtable_entries = self.write.lock().memtable.entries();

        MigrationHeader {
            db_index,
            last_sequence: self.version_set.last_sequence().inner(),
            next_file_number: self.version_set.next_file_number(),
            version_blob: edit.encode(),
            subrange_blob: Vec::new(),
            memtable_blob: sstable::encode_entries(&memtable_entries),
            lookup_index_blob: Vec::new(),
            tableid_mapping_blob: Vec::new(),
        }
    }

    /// Rebuilds a fragment from a received migration header (destination side of C6): replays
    /// `version_blob` as a single version edit against a fresh version set, which installs its
    /// files and advances its file-number/sequence-number counters in one shot, then replays
    /// `memtable_blob`'s entries into a fresh memtable so pre-migration writes stay visible
    /// without a separate write-ahead log to recover. The destination database name is derived
    /// from `header.db_index` the same way every fragment in this engine names itself.
    ///
    /// # Errors
    /// `Corruption` if `version_blob` or `memtable_blob` fails to decode; `InvalidArgument` if
    /// the memtable-id pool is exhausted; any error `VersionSet::log_and_apply` surfaces while
    /// installing the recovered version.
    pub fn rebuild_from_migration(
        header:            &MigrationHeader,
        client:            RemoteBlockClient<T>,
        pool:              Arc<SlabMemoryManager>,
        thread_id:         usize,
        local_mirror_path: Option<PathBuf>,
        write_buffer_size: usize,
    ) -> Result<Self> {
        let dbname = format!("db{}", header.db_index);
        let version_set = VersionSet::new(dbname, client, Arc::clone(&pool), thread_id, local_mirror_path.clone());

        let edit = VersionEdit::decode(&header.version_blob)
            .map_err(|err| Error::Corruption(format!("migration version blob: {err}")))?;
        version_set.log_and_apply(edit)?;

        let id_pool = MemtableIdPool::bounded();
        let id = id_pool.acquire().map_err(|err| Error::InvalidArgument(err.to_string()))?;
        let mut memtable = Memtable::new(id);
        for (key, value) in sstable::decode_entries(&header.memtable_blob)? {
            memtable.put(&key, &value);
        }
        let write_handle = memtable.refcounted_clone();
        let slot = Arc::new(AtomicMemTable::new());
        slot.publish(memtable);

        let mut slots = HashMap::new();
        slots.insert(id, slot);

        let next_sequence = version_set.last_sequence().inner() + 1;

        Ok(Self {
            version_set,
            pool,
            thread_id,
            local_mirror_path,
            write_buffer_size,
            id_pool,
            slots: RwLock::new(slots),
            write: Mutex::new(WriteState { id, memtable: write_handle }),
            next_sequence: AtomicU64::new(next_sequence),
        })
    }
}
