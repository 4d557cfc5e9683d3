//! Extra-field dispatch for central directory records.
//!
//! An extra field is a chain of `(tag: u16, len: u16, payload: [u8; len])`
//! records. The chain ends when fewer than four bytes remain or a declared
//! length exceeds what follows; the latter silently drops the remaining tags
//! rather than failing the entry.

use crate::archive::{FileEntry, WinZipAes, FLAG_UTF8};
use crate::errors::{Error, ErrorKind};
use crate::time;
use crate::utils::{le_u16, le_u32, le_u64, nul_truncated};
use jiff::Timestamp;

const ZIP64_ID: u16 = 0x0001;
const NTFS_ID: u16 = 0x000a;
const UNIX_ID: u16 = 0x000d;
const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;
const INFO_ZIP_UNIX_ID: u16 = 0x5855;
const UNICODE_PATH_ID: u16 = 0x7075;
const WINZIP_AES_ID: u16 = 0x9901;

/// Which of an entry's 32-bit fields held their overflow sentinel and still
/// await a 64-bit value from the zip64 extra field.
///
/// Each field is upgraded at most once: after the zip64 tag resolves it, a
/// duplicate tag later in the chain is not consulted for that field again.
pub(crate) struct SentinelNeeds {
    uncompressed_size: bool,
    compressed_size: bool,
    offset: bool,
}

impl SentinelNeeds {
    pub(crate) fn of(entry: &FileEntry) -> Self {
        SentinelNeeds {
            uncompressed_size: entry.uncompressed_size == u64::from(u32::MAX),
            compressed_size: entry.compressed_size == u64::from(u32::MAX),
            offset: entry.local_header_offset == u64::from(u32::MAX),
        }
    }

    pub(crate) fn unresolved(&self) -> bool {
        self.uncompressed_size || self.compressed_size || self.offset
    }
}

/// Walks the extra-field chain of one entry, applying recognized tags.
///
/// Returns the modification time found in an NTFS or extended-timestamp tag,
/// if any; the caller combines it with the DOS baseline.
pub(crate) fn apply(
    entry: &mut FileEntry,
    extra: &[u8],
    needs: &mut SentinelNeeds,
) -> Result<Option<Timestamp>, Error> {
    let mut modified = None;
    let mut fields = extra;

    while fields.len() >= 4 {
        let tag = le_u16(&fields[0..2]);
        let len = le_u16(&fields[2..4]) as usize;
        fields = &fields[4..];
        if fields.len() < len {
            break;
        }
        let (field, rest) = fields.split_at(len);
        fields = rest;

        match tag {
            ZIP64_ID => apply_zip64(entry, field, needs)?,
            NTFS_ID => {
                if let Some(ts) = ntfs_modified(field) {
                    modified = Some(ts);
                }
            }
            UNIX_ID | INFO_ZIP_UNIX_ID => {
                // Atime first, then mtime. Applied directly to the entry and
                // later superseded by the DOS baseline when no other
                // timestamp tag is present.
                if field.len() >= 8 {
                    if let Some(ts) = time::from_unix_seconds(le_u32(&field[4..8])) {
                        entry.modified = ts;
                    }
                }
            }
            EXTENDED_TIMESTAMP_ID => {
                if field.len() >= 5 && field[0] & 0x01 != 0 {
                    modified = time::from_unix_seconds(le_u32(&field[1..5]));
                }
                // access and creation times are not retained
            }
            UNICODE_PATH_ID => {
                // Version byte, CRC-32 of the original name, then the UTF-8
                // name. Ignored when the entry already declares UTF-8.
                if field.len() >= 5 && entry.flags & FLAG_UTF8 == 0 {
                    entry.flags |= FLAG_UTF8;
                    entry.name = nul_truncated(&field[5..]).to_vec();
                }
            }
            WINZIP_AES_ID => {
                // Format version, vendor id "AE", strength, then the real
                // compression method hidden by the AES wrapping.
                if field.len() >= 7 {
                    entry.aes = Some(WinZipAes {
                        version: le_u16(&field[0..2]),
                        strength: field[4],
                    });
                    entry.method = le_u16(&field[5..7]);
                }
            }
            _ => {} // vendor extensions are preserved in place, not read
        }
    }

    Ok(modified)
}

/// Zip64 extended information (tag 0x0001): 64-bit values for whichever of
/// uncompressed size, compressed size and local header offset were flagged,
/// consumed in that fixed order.
fn apply_zip64(entry: &mut FileEntry, field: &[u8], needs: &mut SentinelNeeds) -> Result<(), Error> {
    let mut field = field;
    let mut take = || -> Result<u64, Error> {
        if field.len() < 8 {
            return Err(Error::from(ErrorKind::Eof));
        }
        let value = le_u64(&field[..8]);
        field = &field[8..];
        Ok(value)
    };

    if needs.uncompressed_size {
        needs.uncompressed_size = false;
        entry.uncompressed_size = take()?;
    }
    if needs.compressed_size {
        needs.compressed_size = false;
        entry.compressed_size = take()?;
    }
    if needs.offset {
        needs.offset = false;
        entry.local_header_offset = take()?;
    }
    Ok(())
}

/// NTFS extra field (tag 0x000a): 4 reserved bytes, then nested
/// (attribute, size) pairs. Only attribute 1 of size 24 carries timestamps;
/// the first 8 bytes are the modification time in NTFS ticks.
fn ntfs_modified(field: &[u8]) -> Option<Timestamp> {
    let mut modified = None;
    let mut rest = field.get(4..)?;
    while rest.len() >= 4 {
        let attr_tag = le_u16(&rest[0..2]);
        let attr_len = le_u16(&rest[2..4]) as usize;
        rest = &rest[4..];
        if rest.len() < attr_len {
            break;
        }
        let (attr, remaining) = rest.split_at(attr_len);
        rest = remaining;
        if attr_tag != 1 || attr_len != 24 {
            break;
        }
        modified = time::from_ntfs_ticks(le_u64(&attr[0..8]));
    }
    modified
}
