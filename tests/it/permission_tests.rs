use crate::builder::{ArchiveBuilder, EntrySpec, STORE, UNIX_MADE_BY};
use pakzip::ZipArchive;
use rstest::rstest;

fn entry_mode(spec: EntrySpec) -> pakzip::EntryMode {
    let data = ArchiveBuilder::new().entry(spec).build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();
    archive.entries()[0].mode()
}

#[rstest]
#[case(0o100644, 0o644)]
#[case(0o100755, 0o755)]
#[case(0o100400, 0o400)]
fn test_unix_permissions(#[case] unix_mode: u32, #[case] expected: u32) {
    let mut spec = EntrySpec::new("tool", b"#!/bin/sh\n", STORE);
    spec.external_attrs = unix_mode << 16;
    let mode = entry_mode(spec);
    assert_eq!(mode.permissions(), expected);
    assert!(!mode.is_dir());
}

#[test]
fn test_unix_symlink() {
    let mut spec = EntrySpec::new("current", b"releases/v2", STORE);
    spec.external_attrs = 0o120777 << 16;
    let mode = entry_mode(spec);
    assert!(mode.is_symlink());
}

#[test]
fn test_msdos_readonly() {
    let mut spec = EntrySpec::new("a.txt", b"abc", STORE);
    spec.version_made_by = 0; // FAT creator
    spec.external_attrs = 0x01;
    let mode = entry_mode(spec);
    assert_eq!(mode.permissions(), 0o444);
}

#[test]
fn test_msdos_directory_attribute() {
    let mut spec = EntrySpec::new("dir/", b"", STORE);
    spec.version_made_by = 0;
    spec.external_attrs = 0x10;
    let mode = entry_mode(spec);
    assert!(mode.is_dir());
    assert_eq!(mode.permissions(), 0o777);
}

#[test]
fn test_trailing_slash_forces_directory() {
    // A unix creator recording plain file bits still yields a directory
    // when the name says so.
    let mut spec = EntrySpec::new("data/", b"", STORE);
    spec.version_made_by = UNIX_MADE_BY;
    spec.external_attrs = 0o100644 << 16;
    let mode = entry_mode(spec);
    assert!(mode.is_dir());
    assert_eq!(mode.permissions(), 0o644);
}

#[test]
fn test_unknown_creator_yields_no_mode() {
    let mut spec = EntrySpec::new("a.txt", b"abc", STORE);
    spec.version_made_by = 6 << 8; // OS/2 HPFS
    spec.external_attrs = 0o100777 << 16;
    let mode = entry_mode(spec);
    assert_eq!(mode.value(), 0);
}
