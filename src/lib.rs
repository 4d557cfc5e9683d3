//! The archive-decoding core of a package extractor: a read-only ZIP reader
//! that locates the central directory (zip64 included), eagerly decodes every
//! entry's metadata, and streams entry payloads through a decompressor while
//! verifying the stored CRC-32.
//!
//! The reader never buffers the whole archive. Directory discovery reads two
//! bounded trailing windows, directory decoding runs through a buffered
//! sequential scan, and decompression feeds bounded chunks to a caller
//! supplied sink that may cancel at any point.
//!
//! ```no_run
//! use pakzip::ZipArchive;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let archive = ZipArchive::open("bundle.zip")?;
//!     for entry in archive.entries() {
//!         let path = entry.file_path().normalize()?;
//!         println!("{} ({} bytes)", path, entry.uncompressed_size());
//!     }
//!     let entry = &archive.entries()[0];
//!     let mut out = Vec::new();
//!     archive.decompress_entry(entry, |chunk| {
//!         out.extend_from_slice(chunk);
//!         true
//!     })?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod archive;
mod decompress;
mod errors;
mod extra;
mod locator;
mod mode;
mod read_at;
pub(crate) mod time;
mod utils;

pub use archive::{CompressionMethod, FileEntry, WinZipAes, ZipArchive, ZipFilePath};
pub use errors::{Error, ErrorKind};
pub use mode::EntryMode;
pub use read_at::{FileReader, ReadAt};
