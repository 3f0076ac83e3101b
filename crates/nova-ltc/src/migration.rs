use nova_pool::SlabMemoryManager;
use nova_rdma::{RemoteBlockClient, StoCTransport};

use crate::error::{Error, Result};

/// Leading byte tag on every migration message.
pub const LTC_MIGRATION_TAG: u8 = 1;

const HEADER_FIXED_LEN: usize = 6 * 4 + 2 * 8;

/// One fragment's worth of checkpointed DB state, ready to ship to a destination LTC. The five
/// blobs are opaque here: their internal layout (SSTable version encoding, subrange/lookup-index/
/// table-id-mapping formats) is out of this engine's scope; this type only carries their bytes
/// and lengths faithfully end to end.
#[derive(Debug, Clone)]
pub struct MigrationHeader {
    pub db_index:              u32,
    pub last_sequence:         u64,
    pub next_file_number:      u64,
    pub version_blob:          Vec<u8>,
    pub subrange_blob:         Vec<u8>,
    pub memtable_blob:         Vec<u8>,
    pub lookup_index_blob:     Vec<u8>,
    pub tableid_mapping_blob:  Vec<u8>,
}

impl MigrationHeader {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            1 + HEADER_FIXED_LEN
                + self.version_blob.len()
                + self.subrange_blob.len()
                + self.memtable_blob.len()
                + self.lookup_index_blob.len()
                + self.tableid_mapping_blob.len(),
        );

        out.push(LTC_MIGRATION_TAG);
        out.extend_from_slice(&self.db_index.to_be_bytes());
        out.extend_from_slice(&u32_len(self.version_blob.len()).to_be_bytes());
        out.extend_from_slice(&u32_len(self.subrange_blob.len()).to_be_bytes());
        out.extend_from_slice(&u32_len(self.memtable_blob.len()).to_be_bytes());
        out.extend_from_slice(&u32_len(self.lookup_index_blob.len()).to_be_bytes());
        out.extend_from_slice(&u32_len(self.tableid_mapping_blob.len()).to_be_bytes());
        out.extend_from_slice(&self.last_sequence.to_be_bytes());
        out.extend_from_slice(&self.next_file_number.to_be_bytes());
        out.extend_from_slice(&self.version_blob);
        out.extend_from_slice(&self.subrange_blob);
        out.extend_from_slice(&self.memtable_blob);
        out.extend_from_slice(&self.lookup_index_blob);
        out.extend_from_slice(&self.tableid_mapping_blob);
        out
    }

    /// # Errors
    /// `Corruption` if the tag byte is wrong, the header is truncated, or a declared blob size
    /// doesn't fit the remaining bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, rest) = bytes.split_first().ok_or_else(|| Error::Corruption("migration message is empty".to_owned()))?;
        if tag != LTC_MIGRATION_TAG {
            return Err(Error::Corruption(format!("migration message has tag {tag}, expected {LTC_MIGRATION_TAG}")));
        }
        if rest.len() < HEADER_FIXED_LEN {
            return Err(Error::Corruption("migration message header is truncated".to_owned()));
        }

        let db_index = read_u32(rest, 0);
        let version_size = read_u32(rest, 4) as usize;
        let subrange_size = read_u32(rest, 8) as usize;
        let memtable_size = read_u32(rest, 12) as usize;
        let lookup_index_size = read_u32(rest, 16) as usize;
        let tableid_mapping_size = read_u32(rest, 20) as usize;
        let last_sequence = read_u64(rest, 24);
        let next_file_number = read_u64(rest, 32);

        let mut blobs = rest.get(HEADER_FIXED_LEN..).ok_or_else(|| Error::Corruption("migration message header is truncated".to_owned()))?;
        let mut take = |len: usize| -> Result<Vec<u8>> {
            if blobs.len() < len {
                return Err(Error::Corruption("migration message blob runs past declared size".to_owned()));
            }
            let (blob, remaining) = blobs.split_at(len);
            blobs = remaining;
            Ok(blob.to_vec())
        };

        let version_blob = take(version_size)?;
        let subrange_blob = take(subrange_size)?;
        let memtable_blob = take(memtable_size)?;
        let lookup_index_blob = take(lookup_index_size)?;
        let tableid_mapping_blob = take(tableid_mapping_size)?;

        Ok(Self {
            db_index,
            last_sequence,
            next_file_number,
            version_blob,
            subrange_blob,
            memtable_blob,
            lookup_index_blob,
            tableid_mapping_blob,
        })
    }
}

fn u32_len(len: usize) -> u32 {
    u32::try_from(len).expect("migration blobs stay well under 4 GiB")
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let slice: [u8; 4] = bytes[offset..offset + 4].try_into().expect("fixed 4-byte field");
    u32::from_be_bytes(slice)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let slice: [u8; 8] = bytes[offset..offset + 8].try_into().expect("fixed 8-byte field");
    u64::from_be_bytes(slice)
}

/// Source-side flow : allocates a slab buffer, serializes `header`, and ships it to
/// `remote_ltc_id` via `initiate_rdma_write`, blocking until the RDMA request completes. The
/// buffer is freed (dropped) once this returns.
///
/// # Errors
/// `OutOfMemory` if no slab class fits the encoded message; `TransportError` if the RDMA
/// request fails.
pub fn send_migration<T: StoCTransport>(
    client:        &RemoteBlockClient<T>,
    pool:          &SlabMemoryManager,
    thread_id:     usize,
    remote_ltc_id: u32,
    header:        &MigrationHeader,
) -> Result<()> {
    let encoded = header.encode();
    let mut buffer = pool.item_alloc(thread_id, encoded.len())?;
    buffer[..encoded.len()].copy_from_slice(&encoded);

    let request_id = client.initiate_rdma_write(remote_ltc_id, &buffer[..encoded.len()]);
    client.wait_for(request_id)?;
    Ok(())
}
