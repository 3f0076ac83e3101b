use std::fmt;

use crate::error::Error;

/// A keyspace partition owned by exactly one LTC at a time. `key_start`/`key_end`
/// bound a half-open byte-string range `[key_start, key_end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub key_start:   Vec<u8>,
    pub key_end:     Vec<u8>,
    pub home_ltc_id: u32,
    pub worker_id:   u32,
    pub db_handle:   usize,
}

/// How a keyspace is cut into fragments. Range partitioning binary-searches a sorted fragment
/// table; hash-mod partitioning routes a key by `hash(key) % buckets`, bypassing ordering
/// entirely. Nova's fragment-configuration file only ever encodes explicit ranges, so
/// `HashMod` exists as a named alternative the table can be constructed with directly rather
/// than one the file format can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionMode {
    Range,
    HashMod { buckets: u32 },
}

/// Binds key ranges to the fragment owning them. Invariant: fragments are pairwise
/// disjoint and cover the configured keyspace; `Range` mode additionally requires the table to
/// be sorted by `key_start`, which [`FragmentTable::from_range_fragments`] enforces.
pub struct FragmentTable {
    mode:      PartitionMode,
    fragments: Vec<Fragment>,
}

impl FragmentTable {
    /// Builds a range-partitioned table, sorting by `key_start` and rejecting overlapping
    /// ranges.
    ///
    /// # Errors
    /// `InvalidArgument` if any two fragments' ranges overlap.
    pub fn from_range_fragments(mut fragments: Vec<Fragment>) -> Result<Self, Error> {
        fragments.sort_by(|a, b| a.key_start.cmp(&b.key_start));
        for pair in fragments.windows(2) {
            let [a, b] = pair else { unreachable!("windows(2) always yields length-2 slices") };
            if a.key_end > b.key_start {
                return Err(Error::InvalidArgument(format!(
                    "fragment ranges overlap: [{:?}, {:?}) and [{:?}, {:?})",
                    a.key_start, a.key_end, b.key_start, b.key_end,
                )));
            }
        }
        Ok(Self { mode: PartitionMode::Range, fragments })
    }

    #[must_use]
    pub fn from_hash_mod_fragments(fragments: Vec<Fragment>, buckets: u32) -> Self {
        Self { mode: PartitionMode::HashMod { buckets }, fragments }
    }

    #[must_use]
    pub fn mode(&self) -> PartitionMode {
        self.mode
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The fragment owning `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: &[u8]) -> Option<&Fragment> {
        match self.mode {
            PartitionMode::Range => {
                let idx = self.fragments.partition_point(|f| f.key_start.as_slice() <= key);
                idx.checked_sub(1)
                    .and_then(|i| self.fragments.get(i))
                    .filter(|f| key < f.key_end.as_slice())
            }
            PartitionMode::HashMod { buckets } => {
                let bucket = simple_hash(key) % u64::from(buckets);
                self.fragments.get(usize::try_from(bucket).expect("bucket < buckets fits in usize"))
            }
        }
    }
}

/// FNV-1a. A deterministic bucket router, not a security boundary; no cryptographic or
/// DoS-resistant hashing is needed here.
fn simple_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Parses the fragment-configuration file: one fragment per line,
/// `key_start key_end server_id worker_id`, decimal and whitespace-separated. Keys are decimal
/// integers encoded big-endian so their byte-string order matches their numeric order, the
/// simplest encoding consistent with range partitioning over a file format that only speaks
/// decimal. Fails fast on the first malformed line, reporting its 1-based line number.
pub fn parse_fragment_config(contents: &str) -> Result<Vec<Fragment>, FragmentConfigError> {
    let mut fragments = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (key_start, key_end, server_id, worker_id) = match fields.as_slice() {
            [a, b, c, d] => (*a, *b, *c, *d),
            _ => return Err(FragmentConfigError { line: line_no + 1, reason: "expected 4 whitespace-separated fields".to_owned() }),
        };
        let parse_u64 = |s: &str, field: &str| {
            s.parse::<u64>().map_err(|_| FragmentConfigError { line: line_no + 1, reason: format!("{field} is not a decimal integer") })
        };
        let key_start = parse_u64(key_start, "key_start")?;
        let key_end = parse_u64(key_end, "key_end")?;
        let home_ltc_id = u32::try_from(parse_u64(server_id, "server_id")?)
            .map_err(|_| FragmentConfigError { line: line_no + 1, reason: "server_id does not fit in u32".to_owned() })?;
        let worker_id = u32::try_from(parse_u64(worker_id, "worker_id")?)
            .map_err(|_| FragmentConfigError { line: line_no + 1, reason: "worker_id does not fit in u32".to_owned() })?;

        if key_end <= key_start {
            return Err(FragmentConfigError { line: line_no + 1, reason: "key_end must be greater than key_start".to_owned() });
        }

        fragments.push(Fragment {
            key_start: key_start.to_be_bytes().to_vec(),
            key_end:   key_end.to_be_bytes().to_vec(),
            home_ltc_id,
            worker_id,
            db_handle: fragments.len(),
        });
    }
    Ok(fragments)
}

#[derive(Debug)]
pub struct FragmentConfigError {
    pub line:   usize,
    pub reason: String,
}

impl fmt::Display for FragmentConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fragment config line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for FragmentConfigError {}

impl From<FragmentConfigError> for Error {
    fn from(err: FragmentConfigError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
