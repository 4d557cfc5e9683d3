//! Crafts raw ZIP archives in memory for the integration tests.

use std::io::Write;

pub const STORE: u16 = 0;
pub const DEFLATE: u16 = 8;
pub const ZSTD: u16 = 93;

pub const UNIX_MADE_BY: u16 = (3 << 8) | 63;

#[derive(Debug, Clone)]
pub struct EntrySpec {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub method: u16,
    pub flags: u16,
    pub dos_time: u16,
    pub dos_date: u16,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    pub version_made_by: u16,
    pub external_attrs: u32,
    pub crc_override: Option<u32>,
    /// Zero bytes appended after the compressed stream and counted into the
    /// declared compressed size.
    pub payload_padding: usize,
    /// Record sentinel 32-bit sizes and carry the real ones in a zip64 extra
    /// field.
    pub zip64_sizes: bool,
}

impl EntrySpec {
    pub fn new(name: &str, data: &[u8], method: u16) -> Self {
        EntrySpec {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            method,
            flags: 0,
            dos_time: 0,
            dos_date: 0,
            extra: Vec::new(),
            comment: Vec::new(),
            version_made_by: UNIX_MADE_BY,
            external_attrs: 0o100644 << 16,
            crc_override: None,
            payload_padding: 0,
            zip64_sizes: false,
        }
    }
}

#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<EntrySpec>,
    comment: Vec<u8>,
    /// Write a zip64 end of central directory record and locator, leaving
    /// sentinels in the classic record.
    zip64_directory: bool,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn zip64_directory(mut self) -> Self {
        self.zip64_directory = true;
        self
    }

    pub fn entry(mut self, entry: EntrySpec) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut laid_out = Vec::new();

        for spec in &self.entries {
            let offset = out.len() as u64;
            let mut payload = compress(spec.method, &spec.data);
            payload.resize(payload.len() + spec.payload_padding, 0);
            let crc = spec
                .crc_override
                .unwrap_or_else(|| crc32fast::hash(&spec.data));

            out.extend_from_slice(&0x04034b50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&spec.flags.to_le_bytes());
            out.extend_from_slice(&spec.method.to_le_bytes());
            out.extend_from_slice(&spec.dos_time.to_le_bytes());
            out.extend_from_slice(&spec.dos_date.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(spec.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&spec.name);
            out.extend_from_slice(&payload);

            laid_out.push((offset, payload.len() as u64, crc));
        }

        let directory_offset = out.len() as u64;
        for (spec, &(offset, payload_len, crc)) in self.entries.iter().zip(&laid_out) {
            let mut extra = spec.extra.clone();
            let (compressed32, uncompressed32) = if spec.zip64_sizes {
                extra.extend_from_slice(&0x0001u16.to_le_bytes());
                extra.extend_from_slice(&16u16.to_le_bytes());
                extra.extend_from_slice(&(spec.data.len() as u64).to_le_bytes());
                extra.extend_from_slice(&payload_len.to_le_bytes());
                (u32::MAX, u32::MAX)
            } else {
                (payload_len as u32, spec.data.len() as u32)
            };

            out.extend_from_slice(&0x02014b50u32.to_le_bytes());
            out.extend_from_slice(&spec.version_made_by.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&spec.flags.to_le_bytes());
            out.extend_from_slice(&spec.method.to_le_bytes());
            out.extend_from_slice(&spec.dos_time.to_le_bytes());
            out.extend_from_slice(&spec.dos_date.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&compressed32.to_le_bytes());
            out.extend_from_slice(&uncompressed32.to_le_bytes());
            out.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(&(spec.comment.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // disk start
            out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            out.extend_from_slice(&spec.external_attrs.to_le_bytes());
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&spec.name);
            out.extend_from_slice(&extra);
            out.extend_from_slice(&spec.comment);
        }
        let directory_size = out.len() as u64 - directory_offset;
        let records = self.entries.len() as u64;

        if self.zip64_directory {
            let zip64_offset = out.len() as u64;
            out.extend_from_slice(&0x06064b50u32.to_le_bytes());
            out.extend_from_slice(&44u64.to_le_bytes()); // remaining record size
            out.extend_from_slice(&45u16.to_le_bytes()); // version made by
            out.extend_from_slice(&45u16.to_le_bytes()); // version needed
            out.extend_from_slice(&0u32.to_le_bytes()); // this disk
            out.extend_from_slice(&0u32.to_le_bytes()); // directory disk
            out.extend_from_slice(&records.to_le_bytes());
            out.extend_from_slice(&records.to_le_bytes());
            out.extend_from_slice(&directory_size.to_le_bytes());
            out.extend_from_slice(&directory_offset.to_le_bytes());

            out.extend_from_slice(&0x07064b50u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // zip64 record disk
            out.extend_from_slice(&zip64_offset.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes()); // total disks
        }

        let (records16, size32, offset32) = if self.zip64_directory {
            (u16::MAX, u32::MAX, u32::MAX)
        } else {
            (records as u16, directory_size as u32, directory_offset as u32)
        };
        out.extend_from_slice(&0x06054b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // this disk
        out.extend_from_slice(&0u16.to_le_bytes()); // directory disk
        out.extend_from_slice(&records16.to_le_bytes());
        out.extend_from_slice(&records16.to_le_bytes());
        out.extend_from_slice(&size32.to_le_bytes());
        out.extend_from_slice(&offset32.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }
}

fn compress(method: u16, data: &[u8]) -> Vec<u8> {
    match method {
        DEFLATE => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        ZSTD => zstd::encode_all(data, 0).unwrap(),
        _ => data.to_vec(),
    }
}
