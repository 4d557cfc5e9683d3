use crate::errors::{Error, ErrorKind};
use crate::extra::{self, SentinelNeeds};
use crate::locator;
use crate::mode::{resolve_entry_mode, EntryMode};
use crate::read_at::{FileReader, ReadAt, SectionReader};
use crate::time;
use crate::utils::{le_u16, le_u32, nul_truncated};
use jiff::Timestamp;
use std::borrow::Cow;
use std::io::{BufReader, Read};
use std::path::Path;

pub(crate) const CENTRAL_HEADER_SIGNATURE: u32 = 0x02014b50;
pub(crate) const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// Fixed portion of a central directory file header (4.3.12).
const CENTRAL_HEADER_LEN: usize = 46;

/// Fixed portion of a local file header (4.3.7). Doubles as the minimum
/// number of bytes any entry occupies, which bounds how many entries a file
/// of a given size can plausibly declare.
pub(crate) const LOCAL_HEADER_LEN: usize = 30;

/// General purpose flag bit 0: the entry payload is encrypted.
const FLAG_ENCRYPTED: u16 = 0x0001;

/// General purpose flag bit 11: name and comment are UTF-8.
pub(crate) const FLAG_UTF8: u16 = 0x0800;

/// A read-only handle to an opened ZIP archive.
///
/// Opening eagerly decodes every central directory record into [`FileEntry`]
/// values, in directory order. The handle owns the backing reader and
/// releases it when dropped; entries are never mutated after open.
pub struct ZipArchive<R> {
    pub(crate) reader: R,
    size: u64,
    comment: Vec<u8>,
    entries: Vec<FileEntry>,
    compressed_total: u64,
    uncompressed_total: u64,
}

impl<R> std::fmt::Debug for ZipArchive<R> {
    // manual impl: the backing reader (a file handle on the common path) has
    // no Debug of its own
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ZipArchive")
            .field("size", &self.size)
            .field("comment", &self.comment)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl ZipArchive<FileReader> {
    /// Opens the archive at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(Error::io)?;
        let reader = FileReader::from(file);
        let size = reader.len().map_err(Error::io)?;
        Self::from_reader(reader, size)
    }
}

impl<R: ReadAt> ZipArchive<R> {
    /// Opens an archive from an already-open reader of `size` bytes.
    pub fn from_reader(reader: R, size: u64) -> Result<Self, Error> {
        let d = locator::read_directory_end(&reader, size)?;

        // Bound allocation before trusting the record count: every entry
        // needs at least a local header's worth of bytes in the file.
        if d.directory_records > size / LOCAL_HEADER_LEN as u64 {
            return Err(Error::from(ErrorKind::ImpossibleRecordCount {
                records: d.directory_records,
                file_size: size,
            }));
        }

        let mut entries = Vec::with_capacity(d.directory_records as usize);
        let mut compressed_total = 0u64;
        let mut uncompressed_total = 0u64;
        {
            let section = SectionReader::new(&reader, d.directory_offset);
            let mut directory = BufReader::with_capacity(64 * 1024, section);
            let mut scratch = Vec::new();
            for _ in 0..d.directory_records {
                let entry = read_directory_header(&mut directory, &mut scratch)?;
                compressed_total = compressed_total.saturating_add(entry.compressed_size);
                uncompressed_total = uncompressed_total.saturating_add(entry.uncompressed_size);
                entries.push(entry);
            }
        }

        Ok(ZipArchive {
            reader,
            size,
            comment: nul_truncated(&d.comment).to_vec(),
            entries,
            compressed_total,
            uncompressed_total,
        })
    }

    /// The decoded entries, in central directory order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// The archive comment, truncated at the first NUL.
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Total size of the backing file in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Sum of the compressed sizes of all entries.
    pub fn compressed_total(&self) -> u64 {
        self.compressed_total
    }

    /// Sum of the uncompressed sizes of all entries.
    pub fn uncompressed_total(&self) -> u64 {
        self.uncompressed_total
    }

    /// Consumes the handle, returning the backing reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Offset of the first byte of an entry's compressed data, found by
    /// parsing the fixed part of its local file header.
    ///
    /// The central directory stays the source of truth for sizes and
    /// metadata; the local header is consulted only for its signature and
    /// variable-length field sizes.
    pub(crate) fn entry_data_offset(&self, entry: &FileEntry) -> Result<u64, Error> {
        let mut buf = [0u8; LOCAL_HEADER_LEN];
        self.reader
            .read_exact_at(&mut buf, entry.local_header_offset)
            .map_err(Error::io)?;

        let signature = le_u32(&buf[0..4]);
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(Error::from(ErrorKind::InvalidSignature {
                expected: LOCAL_FILE_HEADER_SIGNATURE,
                actual: signature,
            }));
        }

        let name_len = u64::from(le_u16(&buf[26..28]));
        let extra_len = u64::from(le_u16(&buf[28..30]));
        Ok(entry.local_header_offset + LOCAL_HEADER_LEN as u64 + name_len + extra_len)
    }
}

/// One member of an archive, decoded from its central directory record.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub(crate) creator_version: u16,
    pub(crate) required_version: u16,
    pub(crate) flags: u16,
    pub(crate) method: u16,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
    pub(crate) local_header_offset: u64,
    pub(crate) name: Vec<u8>,
    pub(crate) comment: Vec<u8>,
    pub(crate) modified: Timestamp,
    pub(crate) mode: EntryMode,
    pub(crate) aes: Option<WinZipAes>,
}

impl FileEntry {
    /// The entry name as stored, NUL-truncated.
    pub fn file_path(&self) -> ZipFilePath<'_> {
        ZipFilePath(&self.name)
    }

    /// The entry comment, NUL-truncated.
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// The compression method recorded for the entry. For AES-wrapped
    /// entries this is the real method carried in the WinZip AES extra
    /// field, not the wrapping marker.
    pub fn compression_method(&self) -> CompressionMethod {
        CompressionMethod::from(self.method)
    }

    /// CRC-32 of the uncompressed data, as stored in the directory.
    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Byte offset of the entry's local file header.
    pub fn local_header_offset(&self) -> u64 {
        self.local_header_offset
    }

    /// Modification time, resolved from the DOS baseline and any NTFS or
    /// extended-timestamp extra field.
    pub fn last_modified(&self) -> Timestamp {
        self.modified
    }

    /// Resolved platform mode bits.
    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    /// WinZip AES metadata, when the entry is AES-wrapped. The payload
    /// itself is not decrypted by this crate.
    pub fn aes(&self) -> Option<WinZipAes> {
        self.aes
    }

    /// Version-made-by field, creator platform in the high byte.
    pub fn creator_version(&self) -> u16 {
        self.creator_version
    }

    /// Minimum ZIP feature version needed to extract the entry.
    pub fn required_version(&self) -> u16 {
        self.required_version
    }

    /// General purpose flag bits.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// A trailing slash marks a directory by convention.
    pub fn is_dir(&self) -> bool {
        self.name.last() == Some(&b'/')
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}

/// WinZip AES wrapping metadata (extra field 0x9901).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinZipAes {
    /// AES format version (1 or 2).
    pub version: u16,
    /// Key strength: 1 = 128-bit, 2 = 192-bit, 3 = 256-bit.
    pub strength: u8,
}

/// Decodes one central directory record from the sequential directory scan.
fn read_directory_header<R: Read>(
    directory: &mut R,
    scratch: &mut Vec<u8>,
) -> Result<FileEntry, Error> {
    let mut buf = [0u8; CENTRAL_HEADER_LEN];
    read_full(directory, &mut buf)?;

    let signature = le_u32(&buf[0..4]);
    if signature != CENTRAL_HEADER_SIGNATURE {
        return Err(Error::from(ErrorKind::InvalidSignature {
            expected: CENTRAL_HEADER_SIGNATURE,
            actual: signature,
        }));
    }

    let creator_version = le_u16(&buf[4..6]);
    let required_version = le_u16(&buf[6..8]);
    let flags = le_u16(&buf[8..10]);
    let method = le_u16(&buf[10..12]);
    let dos_time = le_u16(&buf[12..14]);
    let dos_date = le_u16(&buf[14..16]);
    let crc32 = le_u32(&buf[16..20]);
    let compressed_size = u64::from(le_u32(&buf[20..24]));
    let uncompressed_size = u64::from(le_u32(&buf[24..28]));
    let name_len = le_u16(&buf[28..30]) as usize;
    let extra_len = le_u16(&buf[30..32]) as usize;
    let comment_len = le_u16(&buf[32..34]) as usize;
    // disk number start and internal attributes are not kept
    let external_attrs = le_u32(&buf[38..42]);
    let local_header_offset = u64::from(le_u32(&buf[42..46]));

    scratch.resize(name_len + extra_len + comment_len, 0);
    read_full(directory, scratch)?;

    let name = nul_truncated(&scratch[..name_len]).to_vec();
    let comment = nul_truncated(&scratch[name_len + extra_len..]).to_vec();
    let mode = resolve_entry_mode(creator_version, external_attrs, &name);

    let mut entry = FileEntry {
        creator_version,
        required_version,
        flags,
        method,
        crc32,
        compressed_size,
        uncompressed_size,
        local_header_offset,
        name,
        comment,
        modified: Timestamp::UNIX_EPOCH,
        mode,
        aes: None,
    };

    let mut needs = SentinelNeeds::of(&entry);
    let modified = extra::apply(&mut entry, &scratch[name_len..name_len + extra_len], &mut needs)?;

    if needs.unresolved() {
        return Err(Error::from(ErrorKind::UnresolvedZip64Field));
    }

    // The DOS baseline always lands after the extra field scan; only a
    // nonzero NTFS or extended-timestamp value survives it. A bare Unix
    // extra field timestamp (0x000d / 0x5855) is applied during the scan and
    // then overwritten here, matching the reference extractor's ordering.
    entry.modified = time::from_dos(dos_date, dos_time);
    if let Some(modified) = modified {
        if modified != Timestamp::UNIX_EPOCH {
            entry.modified = modified;
        }
    }

    Ok(entry)
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), Error> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::from(ErrorKind::Eof)
        } else {
            Error::io(e)
        }
    })
}

/// The compression method codes of 4.4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store,
    Shrunk,
    Reduce1,
    Reduce2,
    Reduce3,
    Reduce4,
    Imploded,
    Tokenizing,
    Deflate,
    Deflate64,
    Terse,
    Bzip2,
    Lzma,
    Lz77,
    ZstdDeprecated,
    Zstd,
    Mp3,
    Xz,
    Jpeg,
    WavPack,
    Ppmd,
    Aes,
    Unknown(u16),
}

impl CompressionMethod {
    /// The numeric method code as stored in the central directory.
    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::Store => 0,
            CompressionMethod::Shrunk => 1,
            CompressionMethod::Reduce1 => 2,
            CompressionMethod::Reduce2 => 3,
            CompressionMethod::Reduce3 => 4,
            CompressionMethod::Reduce4 => 5,
            CompressionMethod::Imploded => 6,
            CompressionMethod::Tokenizing => 7,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Deflate64 => 9,
            CompressionMethod::Terse => 10,
            CompressionMethod::Bzip2 => 12,
            CompressionMethod::Lzma => 14,
            CompressionMethod::Lz77 => 18,
            CompressionMethod::ZstdDeprecated => 20,
            CompressionMethod::Zstd => 93,
            CompressionMethod::Mp3 => 94,
            CompressionMethod::Xz => 95,
            CompressionMethod::Jpeg => 96,
            CompressionMethod::WavPack => 97,
            CompressionMethod::Ppmd => 98,
            CompressionMethod::Aes => 99,
            CompressionMethod::Unknown(code) => code,
        }
    }
}

impl From<u16> for CompressionMethod {
    fn from(code: u16) -> Self {
        match code {
            0 => CompressionMethod::Store,
            1 => CompressionMethod::Shrunk,
            2 => CompressionMethod::Reduce1,
            3 => CompressionMethod::Reduce2,
            4 => CompressionMethod::Reduce3,
            5 => CompressionMethod::Reduce4,
            6 => CompressionMethod::Imploded,
            7 => CompressionMethod::Tokenizing,
            8 => CompressionMethod::Deflate,
            9 => CompressionMethod::Deflate64,
            10 => CompressionMethod::Terse,
            12 => CompressionMethod::Bzip2,
            14 => CompressionMethod::Lzma,
            18 => CompressionMethod::Lz77,
            20 => CompressionMethod::ZstdDeprecated,
            93 => CompressionMethod::Zstd,
            94 => CompressionMethod::Mp3,
            95 => CompressionMethod::Xz,
            96 => CompressionMethod::Jpeg,
            97 => CompressionMethod::WavPack,
            98 => CompressionMethod::Ppmd,
            99 => CompressionMethod::Aes,
            other => CompressionMethod::Unknown(other),
        }
    }
}

/// An entry name inside the archive.
///
/// Raw bytes as stored (minus NUL truncation). Use
/// [`normalize`](ZipFilePath::normalize) before touching a filesystem: stored
/// names may be absolute or traverse upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZipFilePath<'a>(&'a [u8]);

impl<'a> ZipFilePath<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self(data)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    /// Interprets the name as UTF-8 and resolves it to a safe relative path:
    /// backslashes become forward slashes, redundant slashes and `.`
    /// components collapse, and `..` never escapes the root.
    pub fn normalize(&self) -> Result<Cow<'a, str>, Error> {
        let name = std::str::from_utf8(self.0).map_err(Error::utf8)?;

        let clean = !name.starts_with('/')
            && !name.contains('\\')
            && !name.contains("//")
            && !name.contains("./")
            && !name.split('/').any(|part| part == "..");
        if clean {
            return Ok(Cow::Borrowed(name));
        }

        let name = name.replace('\\', "/");
        let mut result = String::new();
        for part in name.split('/') {
            match part {
                "" | "." => continue,
                ".." => result.truncate(result.rfind('/').unwrap_or(0)),
                _ => {
                    if !result.is_empty() {
                        result.push('/');
                    }
                    result.push_str(part);
                }
            }
        }
        Ok(Cow::Owned(result))
    }
}
