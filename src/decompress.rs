//! The streaming decompression engine.
//!
//! An entry's compressed range is read in blocks no larger than the codec's
//! recommended input chunk size. Every decoded chunk updates a running
//! CRC-32 and is handed to the caller's sink before the next block is read;
//! the engine itself tracks how much input each step consumed so a corrupt
//! or truncated stream fails instead of spinning.

use crate::archive::{CompressionMethod, FileEntry, ZipArchive};
use crate::errors::{Error, ErrorKind};
use crate::read_at::ReadAt;
use flate2::{Decompress, FlushDecompress};
use zstd::stream::raw::{Decoder as ZstdDecoder, InBuffer, Operation, OutBuffer};
use zstd::zstd_safe::DCtx;

const DEFAULT_CHUNK: usize = 64 * 1024;

impl<R: ReadAt> ZipArchive<R> {
    /// Streams an entry's decompressed bytes into `sink` in bounded chunks,
    /// returning the number of bytes produced.
    ///
    /// The sink is invoked synchronously on the calling thread and must not
    /// hold on to the chunk past the call; the buffer is reused. Returning
    /// `false` cancels the stream and surfaces [`ErrorKind::Canceled`]. After
    /// the last compressed byte, the accumulated CRC-32 is checked against
    /// the value stored in the central directory.
    pub fn decompress_entry<F>(&self, entry: &FileEntry, mut sink: F) -> Result<u64, Error>
    where
        F: FnMut(&[u8]) -> bool,
    {
        if entry.is_encrypted() {
            return Err(Error::from(ErrorKind::Encrypted));
        }
        let mut codec = new_decompressor(entry.compression_method())?;

        let data_offset = self.entry_data_offset(entry)?;
        log::trace!(
            "decompressing entry at {}: {:?}, {} -> {} bytes",
            entry.local_header_offset(),
            entry.compression_method(),
            entry.compressed_size(),
            entry.uncompressed_size(),
        );

        let mut input = vec![0u8; codec.input_chunk_size()];
        let mut output = vec![0u8; codec.output_chunk_size()];
        let mut remaining = entry.compressed_size();
        let mut offset = data_offset;
        let mut hasher = crc32fast::Hasher::new();
        let mut written = 0u64;

        while remaining > 0 {
            let block = input.len().min(remaining as usize);
            self.reader
                .read_exact_at(&mut input[..block], offset)
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        Error::from(ErrorKind::Eof)
                    } else {
                        Error::io(e)
                    }
                })?;

            let mut fed = 0;
            while fed < block {
                let (consumed, produced) = codec.step(&input[fed..block], &mut output)?;
                if consumed == 0 && produced == 0 {
                    // The codec is done with the stream but compressed bytes
                    // remain: trailing garbage or a corrupt length claim.
                    return Err(Error::from(ErrorKind::Decompress(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "compressed stream ended before its declared size",
                    ))));
                }
                fed += consumed;
                if produced > 0 {
                    hasher.update(&output[..produced]);
                    written += produced as u64;
                    if !sink(&output[..produced]) {
                        return Err(Error::from(ErrorKind::Canceled));
                    }
                }
            }

            offset += block as u64;
            remaining -= block as u64;
        }

        let crc = hasher.finalize();
        if crc != entry.crc32() {
            return Err(Error::from(ErrorKind::InvalidChecksum {
                expected: entry.crc32(),
                actual: crc,
            }));
        }

        Ok(written)
    }
}

/// One step of a streaming codec: consume some prefix of `input`, produce
/// some prefix of `output`, report both lengths.
trait Decompressor {
    fn input_chunk_size(&self) -> usize;
    fn output_chunk_size(&self) -> usize;
    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize), Error>;
}

fn new_decompressor(method: CompressionMethod) -> Result<Box<dyn Decompressor>, Error> {
    match method {
        CompressionMethod::Store => Ok(Box::new(StoreCopy)),
        CompressionMethod::Deflate => Ok(Box::new(Inflate(Decompress::new(false)))),
        CompressionMethod::Zstd | CompressionMethod::ZstdDeprecated => {
            let decoder = ZstdDecoder::new().map_err(|e| Error::from(ErrorKind::Decompress(e)))?;
            Ok(Box::new(Zstd(decoder)))
        }
        other => Err(Error::from(ErrorKind::UnsupportedMethod(other.code()))),
    }
}

/// Method 0: stored, a bounded copy.
struct StoreCopy;

impl Decompressor for StoreCopy {
    fn input_chunk_size(&self) -> usize {
        DEFAULT_CHUNK
    }

    fn output_chunk_size(&self) -> usize {
        DEFAULT_CHUNK
    }

    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize), Error> {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        Ok((n, n))
    }
}

/// Method 8: raw deflate via flate2's streaming state machine.
struct Inflate(Decompress);

impl Decompressor for Inflate {
    fn input_chunk_size(&self) -> usize {
        32 * 1024
    }

    fn output_chunk_size(&self) -> usize {
        DEFAULT_CHUNK
    }

    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize), Error> {
        let before_in = self.0.total_in();
        let before_out = self.0.total_out();
        self.0
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| {
                Error::from(ErrorKind::Decompress(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    e,
                )))
            })?;
        Ok((
            (self.0.total_in() - before_in) as usize,
            (self.0.total_out() - before_out) as usize,
        ))
    }
}

/// Methods 93 and 20: zstd streaming decompression with the library's
/// recommended chunk sizes.
struct Zstd(ZstdDecoder<'static>);

impl Decompressor for Zstd {
    fn input_chunk_size(&self) -> usize {
        DCtx::in_size()
    }

    fn output_chunk_size(&self) -> usize {
        DCtx::out_size()
    }

    fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize), Error> {
        let mut in_buffer = InBuffer::around(input);
        let mut out_buffer = OutBuffer::around(output);
        self.0
            .run(&mut in_buffer, &mut out_buffer)
            .map_err(|e| Error::from(ErrorKind::Decompress(e)))?;
        Ok((in_buffer.pos(), out_buffer.pos()))
    }
}
