/// Resolved platform mode bits for an archive entry.
///
/// Unix-style file type and permission information, derived from the entry's
/// creator platform and external attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMode(u32);

impl EntryMode {
    /// The raw mode value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns true if the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.0 & S_IFMT == S_IFDIR
    }

    /// Returns true if the entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.0 & S_IFMT == S_IFLNK
    }

    /// The Unix permission bits (e.g. 0o755).
    pub fn permissions(&self) -> u32 {
        self.0 & 0o777
    }
}

// Unix file type and permission bits
const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;
const S_ISUID: u32 = 0o004000;
const S_ISGID: u32 = 0o002000;
const S_ISVTX: u32 = 0o001000;

// MSDOS attribute bits
const MSDOS_DIR: u32 = 0x10;
const MSDOS_READONLY: u32 = 0x01;

// Creator platforms (4.4.2.2), high byte of version-made-by
const CREATOR_FAT: u8 = 0;
const CREATOR_UNIX: u8 = 3;
const CREATOR_NTFS: u8 = 11;
const CREATOR_VFAT: u8 = 14;
const CREATOR_MACOSX: u8 = 19;

/// Resolves an entry's mode from its creator platform and external
/// attributes. A trailing slash in the name marks a directory regardless of
/// what the attributes claim.
pub(crate) fn resolve_entry_mode(version_made_by: u16, external_attrs: u32, name: &[u8]) -> EntryMode {
    let mut mode = match (version_made_by >> 8) as u8 {
        CREATOR_UNIX | CREATOR_MACOSX => unix_mode(external_attrs >> 16),
        CREATOR_FAT | CREATOR_NTFS | CREATOR_VFAT => msdos_mode(external_attrs),
        _ => 0,
    };

    if name.last() == Some(&b'/') {
        mode = (mode & !S_IFMT) | S_IFDIR;
    }

    EntryMode(mode)
}

fn unix_mode(m: u32) -> u32 {
    let mut mode = m & 0o777;

    mode |= match m & S_IFMT {
        S_IFBLK => S_IFBLK,
        S_IFCHR => S_IFCHR,
        S_IFDIR => S_IFDIR,
        S_IFIFO => S_IFIFO,
        S_IFLNK => S_IFLNK,
        S_IFSOCK => S_IFSOCK,
        _ => S_IFREG,
    };

    if m & S_ISGID != 0 {
        mode |= S_ISGID;
    }
    if m & S_ISUID != 0 {
        mode |= S_ISUID;
    }
    if m & S_ISVTX != 0 {
        mode |= S_ISVTX;
    }

    mode
}

fn msdos_mode(m: u32) -> u32 {
    if m & MSDOS_DIR != 0 {
        S_IFDIR | 0o777
    } else if m & MSDOS_READONLY != 0 {
        S_IFREG | 0o444
    } else {
        S_IFREG | 0o666
    }
}
