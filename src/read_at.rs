#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Random-access reads of byte ranges at explicit offsets.
///
/// The offset parameter means implementations take `&self`, so one archive
/// handle can serve several decompression calls without a mutable borrow.
/// Nothing here makes a shared seekable handle atomic; when a non-positioned
/// reader is wrapped (see [`FileReader`] off unix), callers that share it
/// across threads own the synchronization.
pub trait ReadAt {
    /// Read bytes into `buf` starting at `offset` from the beginning of the
    /// data, returning how many bytes were read.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize>;

    /// Sibling to [`read_exact`](std::io::Read::read_exact) at an offset:
    /// fails with [`UnexpectedEof`](std::io::ErrorKind::UnexpectedEof) when
    /// the full request cannot be satisfied.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
        let mut read = 0;
        while read < buf.len() {
            let n = self.read_at(&mut buf[read..], offset + read as u64)?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            read += n;
        }
        Ok(())
    }
}

impl<T: ReadAt> ReadAt for &'_ T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        (*self).read_at(buf, offset)
    }
}

impl ReadAt for &[u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        let skip = self.len().min(offset as usize);
        let data = &self[skip..];
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}

impl<R> ReadAt for std::io::Cursor<R>
where
    R: AsRef<[u8]>,
{
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        self.get_ref().as_ref().read_at(buf, offset)
    }
}

/// A file wrapper that implements [`ReadAt`] across platforms.
///
/// On unix this delegates to `pread`. Elsewhere positioned reads are emulated
/// by seeking under a mutex, the same strategy Go applies to its `io.ReaderAt`
/// for files on Windows.
pub struct FileReader(
    #[cfg(unix)] std::fs::File,
    #[cfg(not(unix))] std::sync::Mutex<std::fs::File>,
);

impl FileReader {
    /// The size of the underlying file in bytes.
    pub(crate) fn len(&self) -> std::io::Result<u64> {
        #[cfg(unix)]
        return self.0.metadata().map(|m| m.len());
        #[cfg(not(unix))]
        return self.0.lock().unwrap().metadata().map(|m| m.len());
    }
}

impl From<std::fs::File> for FileReader {
    #[cfg(unix)]
    fn from(file: std::fs::File) -> Self {
        Self(file)
    }

    #[cfg(not(unix))]
    fn from(file: std::fs::File) -> Self {
        Self(std::sync::Mutex::new(file))
    }
}

impl ReadAt for FileReader {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        self.0.read_at(buf, offset)
    }

    #[cfg(not(unix))]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = self.0.lock().unwrap();
        let original = file.stream_position()?;
        file.seek(SeekFrom::Start(offset))?;
        let result = file.read(buf);
        file.seek(SeekFrom::Start(original))?;
        result
    }
}

/// Adapts a [`ReadAt`] into a forward-only [`std::io::Read`] starting at a
/// fixed offset. Wrapped in a [`std::io::BufReader`] this is the sequential
/// scanner the central directory decoder runs on.
pub(crate) struct SectionReader<'a, R> {
    reader: &'a R,
    offset: u64,
}

impl<'a, R> SectionReader<'a, R> {
    pub(crate) fn new(reader: &'a R, offset: u64) -> Self {
        Self { reader, offset }
    }
}

impl<R: ReadAt> std::io::Read for SectionReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.reader.read_at(buf, self.offset)?;
        self.offset += read as u64;
        Ok(read)
    }
}
