use crate::errors::{Error, ErrorKind};
use crate::read_at::ReadAt;
use crate::utils::{le_u16, le_u32, le_u64};

pub(crate) const END_OF_CENTRAL_DIR_SIGNATURE: u32 = 0x06054b50;
pub(crate) const END_OF_CENTRAL_DIR_SIGNATURE64: u32 = 0x06064b50;
pub(crate) const END_OF_CENTRAL_DIR_LOCATOR_SIGNATURE: u32 = 0x07064b50;

/// Fixed portion of the end of central directory record (4.3.16).
const END_OF_CENTRAL_DIR_LEN: usize = 22;

/// Zip64 end of central directory locator (4.3.15).
const END_OF_CENTRAL_DIR_LOCATOR_LEN: usize = 20;

/// Fixed portion of the zip64 end of central directory record (4.3.14),
/// ignoring the variable-length extensible data sector.
const END_OF_CENTRAL_DIR64_LEN: usize = 56;

/// The trailing windows scanned for the end of central directory signature.
///
/// The record is at most 22 bytes plus a 65535-byte comment from the end of
/// the file, so the second window covers every conforming archive. A small
/// first window keeps the common no-comment case to a single short read.
const SEARCH_WINDOWS: [u64; 2] = [1024, 65 * 1024 + END_OF_CENTRAL_DIR_LEN as u64];

/// Summary of the archive's central directory, as resolved from the end of
/// central directory record and, when sentinel values call for it, the zip64
/// extension record.
#[derive(Debug)]
pub(crate) struct DirectoryEnd {
    pub(crate) disk_number: u32,
    pub(crate) directory_disk: u32,
    pub(crate) records_this_disk: u64,
    pub(crate) directory_records: u64,
    pub(crate) directory_size: u64,
    pub(crate) directory_offset: u64,
    pub(crate) comment: Vec<u8>,
}

/// Finds and fully resolves the end of central directory for a file of
/// `size` bytes.
pub(crate) fn read_directory_end<R: ReadAt>(reader: &R, size: u64) -> Result<DirectoryEnd, Error> {
    let mut window = Vec::new();
    let mut found = None;

    for (i, &span) in SEARCH_WINDOWS.iter().enumerate() {
        let len = span.min(size);
        window.resize(len as usize, 0);
        reader
            .read_exact_at(&mut window, size - len)
            .map_err(Error::io)?;

        if let Some(pos) = find_signature_in_block(&window) {
            found = Some((size - len + pos as u64, pos));
            break;
        }

        if i + 1 == SEARCH_WINDOWS.len() || len == size {
            return Err(Error::from(ErrorKind::MissingEndOfCentralDirectory));
        }
    }

    // found is always set here; the loop either breaks or returns.
    let Some((eocd_offset, pos)) = found else {
        return Err(Error::from(ErrorKind::MissingEndOfCentralDirectory));
    };

    let record = &window[pos..];
    let mut d = DirectoryEnd {
        disk_number: u32::from(le_u16(&record[4..6])),
        directory_disk: u32::from(le_u16(&record[6..8])),
        records_this_disk: u64::from(le_u16(&record[8..10])),
        directory_records: u64::from(le_u16(&record[10..12])),
        directory_size: u64::from(le_u32(&record[12..16])),
        directory_offset: u64::from(le_u32(&record[16..20])),
        comment: Vec::new(),
    };
    let comment_len = le_u16(&record[20..22]) as usize;
    // find_signature_in_block already proved the comment fits in the window.
    d.comment = record[END_OF_CENTRAL_DIR_LEN..END_OF_CENTRAL_DIR_LEN + comment_len].to_vec();

    // The directory size is a 32-bit field, so its overflow sentinel is
    // 0xFFFFFFFF. Some extractors also treat a size of 0xFFFF as a zip64
    // cue; a 65535-byte directory is valid here and consults no locator.
    let needs_zip64 = d.directory_records == u64::from(u16::MAX)
        || d.directory_size == u64::from(u32::MAX)
        || d.directory_offset == u64::from(u32::MAX);

    if needs_zip64 {
        if let Some(offset64) = find_directory64_end(reader, eocd_offset)? {
            read_directory64_end(reader, offset64, &mut d)?;
        }
        // A missing locator is not fatal by itself: whatever stayed at its
        // sentinel surfaces as an error from the checks below or from entry
        // decoding.
    }

    if d.disk_number != d.directory_disk || d.records_this_disk != d.directory_records {
        return Err(Error::from(ErrorKind::SpannedArchive));
    }

    let end = d.directory_offset.saturating_add(d.directory_size);
    if end > size {
        return Err(Error::from(ErrorKind::DirectoryOutOfBounds {
            offset: d.directory_offset,
            size: d.directory_size,
        }));
    }

    log::debug!(
        "end of central directory at {}: {} records, directory at {} ({} bytes), zip64: {}",
        eocd_offset,
        d.directory_records,
        d.directory_offset,
        d.directory_size,
        needs_zip64
    );

    Ok(d)
}

/// Scans a trailing window backwards for the end of central directory
/// signature.
///
/// A candidate only counts when its comment-length field, combined with the
/// candidate's distance from the window end, stays inside the window. That
/// rules out signature bytes embedded in file names or comments.
pub(crate) fn find_signature_in_block(block: &[u8]) -> Option<usize> {
    let signature = END_OF_CENTRAL_DIR_SIGNATURE.to_le_bytes();
    let start = block.len().checked_sub(END_OF_CENTRAL_DIR_LEN)?;
    for i in (0..=start).rev() {
        if block[i..i + 4] == signature {
            let comment_len = le_u16(&block[i + END_OF_CENTRAL_DIR_LEN - 2..]) as usize;
            if i + END_OF_CENTRAL_DIR_LEN + comment_len <= block.len() {
                return Some(i);
            }
        }
    }
    None
}

/// Reads the zip64 locator record that sits immediately before the end of
/// central directory record and returns the zip64 record's offset.
///
/// Returns `Ok(None)` when the locator is absent: out of bounds, wrong
/// signature, or designating a disk other than the only one we read.
fn find_directory64_end<R: ReadAt>(reader: &R, eocd_offset: u64) -> Result<Option<u64>, Error> {
    let Some(locator_offset) = eocd_offset.checked_sub(END_OF_CENTRAL_DIR_LOCATOR_LEN as u64)
    else {
        return Ok(None);
    };

    let mut buf = [0u8; END_OF_CENTRAL_DIR_LOCATOR_LEN];
    reader
        .read_exact_at(&mut buf, locator_offset)
        .map_err(Error::io)?;

    if le_u32(&buf[0..4]) != END_OF_CENTRAL_DIR_LOCATOR_SIGNATURE {
        return Ok(None);
    }
    if le_u32(&buf[4..8]) != 0 {
        // zip64 record on another disk; spanned archives are not read.
        return Ok(None);
    }
    let offset = le_u64(&buf[8..16]);
    if le_u32(&buf[16..20]) != 1 {
        return Ok(None);
    }

    Ok(Some(offset))
}

/// Decodes the zip64 end of central directory record at `offset`, replacing
/// the 16/32-bit fields of `d` with their 64-bit values.
fn read_directory64_end<R: ReadAt>(
    reader: &R,
    offset: u64,
    d: &mut DirectoryEnd,
) -> Result<(), Error> {
    let mut buf = [0u8; END_OF_CENTRAL_DIR64_LEN];
    reader.read_exact_at(&mut buf, offset).map_err(Error::io)?;

    let signature = le_u32(&buf[0..4]);
    if signature != END_OF_CENTRAL_DIR_SIGNATURE64 {
        return Err(Error::from(ErrorKind::InvalidSignature {
            expected: END_OF_CENTRAL_DIR_SIGNATURE64,
            actual: signature,
        }));
    }

    // Skip the record size and the two version fields (12 bytes).
    d.disk_number = le_u32(&buf[16..20]);
    d.directory_disk = le_u32(&buf[20..24]);
    d.records_this_disk = le_u64(&buf[24..32]);
    d.directory_records = le_u64(&buf[32..40]);
    d.directory_size = le_u64(&buf[40..48]);
    d.directory_offset = le_u64(&buf[48..56]);
    Ok(())
}
