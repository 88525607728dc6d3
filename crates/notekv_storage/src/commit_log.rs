//! Commit log framing and replay.
//!
//! Every committed update transaction is appended as one record:
//!
//! ```text
//! | magic "NKVL" (4) | version u16 | length u32 | payload (length) | crc32 u32 |
//! ```
//!
//! The payload is the transaction's write set: a `u32` pair count followed by
//! `(key_len u32, key, value_len u32, value)` entries. All integers are
//! little-endian and the checksum covers header and payload.
//!
//! A record cut short at the end of the file is a commit that never finished
//! and is dropped on replay. A complete record that fails its checksum is
//! corruption and stops the open.

use crate::engine::Tree;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use tracing::warn;

/// Magic bytes opening every record.
pub const LOG_MAGIC: [u8; 4] = *b"NKVL";

/// Current record format version.
pub const LOG_VERSION: u16 = 1;

/// Size of the record header: magic, version and payload length.
pub const HEADER_LEN: usize = 4 + 2 + 4;

/// Size of the checksum trailer.
pub const CRC_LEN: usize = 4;

/// Encodes one write set as a complete record.
pub(crate) fn encode_record(changes: &Tree) -> StorageResult<Vec<u8>> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&len_u32(changes.len())?.to_le_bytes());
    for (key, value) in changes {
        payload.extend_from_slice(&len_u32(key.len())?.to_le_bytes());
        payload.extend_from_slice(key);
        payload.extend_from_slice(&len_u32(value.len())?.to_le_bytes());
        payload.extend_from_slice(value);
    }

    let mut record = Vec::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
    record.extend_from_slice(&LOG_MAGIC);
    record.extend_from_slice(&LOG_VERSION.to_le_bytes());
    record.extend_from_slice(&len_u32(payload.len())?.to_le_bytes());
    record.extend_from_slice(&payload);
    let crc = compute_crc32(&record);
    record.extend_from_slice(&crc.to_le_bytes());
    Ok(record)
}

fn len_u32(len: usize) -> StorageResult<u32> {
    u32::try_from(len).map_err(|_| {
        StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{len} bytes exceeds the commit log record limit"),
        ))
    })
}

/// State rebuilt from a commit log.
#[derive(Debug, Default)]
pub(crate) struct Replay {
    pub(crate) tree: Tree,
    pub(crate) records: usize,
    /// Length of the prefix made of complete records.
    pub(crate) valid_len: u64,
}

/// Applies every complete record in `bytes`, in order.
pub(crate) fn replay(bytes: &[u8]) -> StorageResult<Replay> {
    let mut out = Replay::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let offset = pos as u64;
        let rest = &bytes[pos..];
        let Some((header, _)) = rest.split_first_chunk::<HEADER_LEN>() else {
            break;
        };
        if header[..4] != LOG_MAGIC {
            return Err(StorageError::corrupted(offset, "bad record magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LOG_VERSION {
            return Err(StorageError::corrupted(
                offset,
                format!("unsupported record version {version}"),
            ));
        }
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
        let total = HEADER_LEN + len + CRC_LEN;
        if rest.len() < total {
            break;
        }

        let body = &rest[..HEADER_LEN + len];
        let mut stored = [0u8; CRC_LEN];
        stored.copy_from_slice(&rest[HEADER_LEN + len..total]);
        let expected = u32::from_le_bytes(stored);
        let actual = compute_crc32(body);
        if expected != actual {
            return Err(StorageError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        apply_payload(&mut out.tree, &body[HEADER_LEN..], offset)?;
        out.records += 1;
        pos += total;
    }

    out.valid_len = pos as u64;
    Ok(out)
}

fn apply_payload(tree: &mut Tree, payload: &[u8], offset: u64) -> StorageResult<()> {
    let mut cursor = 0usize;

    let read_u32 = |cursor: &mut usize| -> StorageResult<usize> {
        let bytes: [u8; 4] = payload
            .get(*cursor..*cursor + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| StorageError::corrupted(offset, "unexpected end of payload"))?;
        *cursor += 4;
        Ok(u32::from_le_bytes(bytes) as usize)
    };
    let read_bytes = |cursor: &mut usize, len: usize| -> StorageResult<Vec<u8>> {
        let bytes = payload
            .get(*cursor..*cursor + len)
            .ok_or_else(|| StorageError::corrupted(offset, "unexpected end of payload"))?;
        *cursor += len;
        Ok(bytes.to_vec())
    };

    let count = read_u32(&mut cursor)?;
    for _ in 0..count {
        let klen = read_u32(&mut cursor)?;
        let key = read_bytes(&mut cursor, klen)?;
        let vlen = read_u32(&mut cursor)?;
        let value = read_bytes(&mut cursor, vlen)?;
        tree.insert(key, value);
    }
    if cursor != payload.len() {
        return Err(StorageError::corrupted(
            offset,
            format!(
                "trailing bytes in record: expected {} bytes, got {}",
                cursor,
                payload.len()
            ),
        ));
    }
    Ok(())
}

/// Computes the CRC32 (IEEE) checksum of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

/// Append side of the commit log.
#[derive(Debug)]
pub(crate) struct CommitLog {
    inner: Mutex<LogFile>,
    sync_on_commit: bool,
}

#[derive(Debug)]
struct LogFile {
    file: File,
    size: u64,
}

impl CommitLog {
    pub(crate) fn new(file: File, size: u64, sync_on_commit: bool) -> Self {
        Self {
            inner: Mutex::new(LogFile { file, size }),
            sync_on_commit,
        }
    }

    /// Appends one write set.
    ///
    /// On a failed write the file is cut back to its previous length so the
    /// next record still starts on a record boundary. A failed sync after a
    /// successful write is logged and not returned.
    pub(crate) fn append(&self, changes: &Tree) -> StorageResult<()> {
        let record = encode_record(changes)?;
        let mut log = self.inner.lock();
        let start = log.size;

        if let Err(err) = write_at(&mut log.file, start, &record) {
            if let Err(cut) = log.file.set_len(start) {
                warn!(error = %cut, offset = start, "failed to cut back partial commit record");
            }
            return Err(err.into());
        }
        log.size = start + record.len() as u64;

        if self.sync_on_commit {
            if let Err(err) = log.file.sync_data() {
                warn!(error = %err, "commit log sync failed after commit");
            }
        }
        Ok(())
    }

    /// Current length of the log in bytes.
    pub(crate) fn size(&self) -> u64 {
        self.inner.lock().size
    }
}

fn write_at(file: &mut File, offset: u64, data: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tree(pairs: &[(&[u8], &[u8])]) -> Tree {
        pairs
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect()
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn record_layout() {
        let record = encode_record(&tree(&[(b"k", b"vv")])).unwrap();
        assert_eq!(&record[..4], b"NKVL");
        assert_eq!(&record[4..6], &1u16.to_le_bytes());
        let payload_len = 4 + 4 + 1 + 4 + 2;
        assert_eq!(&record[6..10], &(payload_len as u32).to_le_bytes());
        assert_eq!(record.len(), HEADER_LEN + payload_len + CRC_LEN);
    }

    #[test]
    fn replay_applies_records_in_order() {
        let mut bytes = encode_record(&tree(&[(b"a", b"1"), (b"b", b"2")])).unwrap();
        bytes.extend(encode_record(&tree(&[(b"a", b"3")])).unwrap());

        let replay = replay(&bytes).unwrap();
        assert_eq!(replay.records, 2);
        assert_eq!(replay.valid_len, bytes.len() as u64);
        assert_eq!(replay.tree, tree(&[(b"a", b"3"), (b"b", b"2")]));
    }

    #[test]
    fn torn_tail_is_dropped() {
        let first = encode_record(&tree(&[(b"a", b"1")])).unwrap();
        let second = encode_record(&tree(&[(b"b", b"2")])).unwrap();
        for cut in 1..second.len() {
            let mut bytes = first.clone();
            bytes.extend_from_slice(&second[..cut]);
            let replay = replay(&bytes).unwrap();
            assert_eq!(replay.records, 1);
            assert_eq!(replay.valid_len, first.len() as u64);
        }
    }

    #[test]
    fn flipped_bit_is_checksum_mismatch() {
        let mut bytes = encode_record(&tree(&[(b"key", b"value")])).unwrap();
        let last_payload = bytes.len() - CRC_LEN - 1;
        bytes[last_payload] ^= 0x01;
        assert!(matches!(
            replay(&bytes),
            Err(StorageError::ChecksumMismatch { offset: 0, .. })
        ));
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut bytes = encode_record(&tree(&[(b"k", b"v")])).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            replay(&bytes),
            Err(StorageError::Corrupted { offset: 0, .. })
        ));
    }

    #[test]
    fn empty_log_replays_to_nothing() {
        let replay = replay(&[]).unwrap();
        assert_eq!(replay.records, 0);
        assert!(replay.tree.is_empty());
    }

    proptest! {
        #[test]
        fn replay_reproduces_last_write_per_key(
            batches in prop::collection::vec(
                prop::collection::btree_map(
                    prop::collection::vec(any::<u8>(), 0..6),
                    prop::collection::vec(any::<u8>(), 0..6),
                    0..5,
                ),
                0..6,
            )
        ) {
            let mut bytes = Vec::new();
            let mut model = Tree::new();
            for batch in &batches {
                bytes.extend(encode_record(batch).unwrap());
                model.extend(batch.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            let replay = replay(&bytes).unwrap();
            prop_assert_eq!(replay.records, batches.len());
            prop_assert_eq!(replay.tree, model);
        }
    }
}
