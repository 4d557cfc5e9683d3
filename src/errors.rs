/// The error type for every fallible operation in this crate.
///
/// Errors carry a [`ErrorKind`] describing what went wrong. Decode-time
/// failures are never retried internally: corrupt input is reported to the
/// caller as-is.
#[derive(Debug)]
pub struct Error {
    inner: ErrorInner,
}

impl Error {
    pub(crate) fn io(err: std::io::Error) -> Error {
        Error::from(ErrorKind::Io(err))
    }

    pub(crate) fn utf8(err: std::str::Utf8Error) -> Error {
        Error::from(ErrorKind::InvalidUtf8(err))
    }

    /// The kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.inner.kind
    }
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
}

/// Categories of failure surfaced by the reader.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No end of central directory signature was found in the trailing
    /// windows of the file.
    MissingEndOfCentralDirectory,
    /// A fixed-size record carried an unexpected signature.
    InvalidSignature { expected: u32, actual: u32 },
    /// The CRC-32 accumulated over the decompressed data did not match the
    /// checksum stored in the central directory.
    InvalidChecksum { expected: u32, actual: u32 },
    /// The directory claims more entries than the file could possibly hold.
    ImpossibleRecordCount { records: u64, file_size: u64 },
    /// The resolved central directory does not fit inside the file.
    DirectoryOutOfBounds { offset: u64, size: u64 },
    /// The archive spans multiple disks, which this reader does not follow.
    SpannedArchive,
    /// A 32-bit size or offset field held its overflow sentinel but no zip64
    /// extra field supplied the 64-bit value.
    UnresolvedZip64Field,
    /// A fixed-size region ended before its declared length.
    Eof,
    /// Entry data is wrapped by an encryption scheme this reader does not
    /// decrypt.
    Encrypted,
    /// No decompressor is available for the entry's compression method code.
    UnsupportedMethod(u16),
    /// The streaming decompressor rejected its input.
    Decompress(std::io::Error),
    /// The sink declined further data.
    Canceled,
    /// Entry name or comment bytes were not valid UTF-8.
    InvalidUtf8(std::str::Utf8Error),
    /// An underlying read failed.
    Io(std::io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.inner.kind {
            ErrorKind::Io(err) | ErrorKind::Decompress(err) => Some(err),
            ErrorKind::InvalidUtf8(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.inner.kind)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ErrorKind::MissingEndOfCentralDirectory => {
                write!(f, "not a valid zip archive: missing end of central directory")
            }
            ErrorKind::InvalidSignature { expected, actual } => {
                write!(
                    f,
                    "invalid signature: expected 0x{:08x}, got 0x{:08x}",
                    expected, actual
                )
            }
            ErrorKind::InvalidChecksum { expected, actual } => {
                write!(
                    f,
                    "checksum mismatch: expected 0x{:08x}, got 0x{:08x}",
                    expected, actual
                )
            }
            ErrorKind::ImpossibleRecordCount { records, file_size } => {
                write!(
                    f,
                    "directory declares impossible {} entries in {} byte archive",
                    records, file_size
                )
            }
            ErrorKind::DirectoryOutOfBounds { offset, size } => {
                write!(
                    f,
                    "central directory at offset {} (size {}) lies outside the file",
                    offset, size
                )
            }
            ErrorKind::SpannedArchive => {
                write!(f, "multi-disk archives are not supported")
            }
            ErrorKind::UnresolvedZip64Field => {
                write!(f, "sentinel size or offset left unresolved by zip64 extra field")
            }
            ErrorKind::Eof => write!(f, "unexpected end of data"),
            ErrorKind::Encrypted => write!(f, "entry is encrypted"),
            ErrorKind::UnsupportedMethod(method) => {
                write!(f, "unsupported compression method {}", method)
            }
            ErrorKind::Decompress(ref err) => write!(f, "decompression failed: {}", err),
            ErrorKind::Canceled => write!(f, "canceled by sink"),
            ErrorKind::InvalidUtf8(ref err) => write!(f, "invalid UTF-8: {}", err),
            ErrorKind::Io(ref err) => err.fmt(f),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: ErrorInner { kind },
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::io(err)
    }
}
