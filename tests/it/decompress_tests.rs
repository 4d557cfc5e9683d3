use crate::builder::{ArchiveBuilder, EntrySpec, DEFLATE, STORE, ZSTD};
use pakzip::{ErrorKind, ZipArchive};
use rstest::rstest;

fn collect(archive: &ZipArchive<&[u8]>, index: usize) -> Result<Vec<u8>, pakzip::Error> {
    let mut out = Vec::new();
    archive.decompress_entry(&archive.entries()[index], |chunk| {
        out.extend_from_slice(chunk);
        true
    })?;
    Ok(out)
}

#[rstest]
#[case(STORE)]
#[case(DEFLATE)]
#[case(ZSTD)]
fn test_round_trip(#[case] method: u16) {
    let content: Vec<u8> = (0..200_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect();
    let data = ArchiveBuilder::new()
        .entry(EntrySpec::new("blob.bin", &content, method))
        .build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();
    assert_eq!(collect(&archive, 0).unwrap(), content);
}

#[rstest]
#[case(STORE)]
#[case(DEFLATE)]
#[case(ZSTD)]
fn test_empty_entry(#[case] method: u16) {
    let data = ArchiveBuilder::new()
        .entry(EntrySpec::new("empty", b"", method))
        .build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();
    assert_eq!(collect(&archive, 0).unwrap(), b"");
}

#[test]
fn test_sink_sees_bounded_chunks_and_returned_total() {
    let content = vec![0x5au8; 300_000];
    let data = ArchiveBuilder::new()
        .entry(EntrySpec::new("big", &content, STORE))
        .build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let mut total = 0u64;
    let written = archive
        .decompress_entry(&archive.entries()[0], |chunk| {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= 64 * 1024);
            total += chunk.len() as u64;
            true
        })
        .unwrap();
    assert_eq!(written, 300_000);
    assert_eq!(total, written);
}

#[test]
fn test_cancellation_from_first_chunk() {
    let content = vec![1u8; 200_000];
    let data = ArchiveBuilder::new()
        .entry(EntrySpec::new("big", &content, DEFLATE))
        .build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let mut calls = 0;
    let err = archive
        .decompress_entry(&archive.entries()[0], |_| {
            calls += 1;
            false
        })
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Canceled));
    assert_eq!(calls, 1);
}

#[test]
fn test_crc_mismatch_detected() {
    let mut spec = EntrySpec::new("a.txt", b"abc", STORE);
    spec.crc_override = Some(0xdead_beef);
    let data = ArchiveBuilder::new().entry(spec).build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let err = collect(&archive, 0).unwrap_err();
    match err.kind() {
        ErrorKind::InvalidChecksum { expected, actual } => {
            assert_eq!(*expected, 0xdead_beef);
            assert_eq!(*actual, crc32fast::hash(b"abc"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_corrupt_deflate_stream() {
    let content = vec![7u8; 50_000];
    let mut data = ArchiveBuilder::new()
        .entry(EntrySpec::new("a.bin", &content, DEFLATE))
        .build();
    // Local header is 30 bytes plus the 5-byte name; garble the middle of
    // the compressed payload.
    data[60] ^= 0xff;
    data[61] ^= 0xff;
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let err = collect(&archive, 0).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Decompress(_) | ErrorKind::InvalidChecksum { .. }
    ));
}

#[test]
fn test_trailing_garbage_after_deflate_stream() {
    // The declared compressed size extends past the end of the deflate
    // stream; the engine must notice the stalled decoder instead of looping.
    let mut spec = EntrySpec::new("a.txt", b"hello", DEFLATE);
    spec.payload_padding = 8;
    let data = ArchiveBuilder::new().entry(spec).build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let err = collect(&archive, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Decompress(_)));
}

#[test]
fn test_compressed_range_past_eof() {
    // A declared compressed size reaching beyond the end of the file must
    // fail the read mid-block, never hand the sink a short result.
    let content = vec![3u8; 10_000];
    let mut data = ArchiveBuilder::new()
        .entry(EntrySpec::new("cut.bin", &content, DEFLATE))
        .build();
    let sig = 0x02014b50u32.to_le_bytes();
    let pos = data.windows(4).position(|w| w == sig).unwrap();
    data[pos + 20..pos + 24].copy_from_slice(&1_000_000u32.to_le_bytes());
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let err = collect(&archive, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Eof));
}

#[test]
fn test_encrypted_entry_refused() {
    let mut spec = EntrySpec::new("secret.txt", b"abc", STORE);
    spec.flags = 0x0001;
    let data = ArchiveBuilder::new().entry(spec).build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let err = collect(&archive, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Encrypted));
}

#[test]
fn test_unsupported_method_refused() {
    let data = ArchiveBuilder::new()
        .entry(EntrySpec::new("a.bz2", b"abc", 12))
        .build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let err = collect(&archive, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnsupportedMethod(12)));
}

#[test]
fn test_bad_local_header_signature() {
    let mut data = ArchiveBuilder::new()
        .entry(EntrySpec::new("a.txt", b"abc", STORE))
        .build();
    data[0] = b'Q';
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    let err = collect(&archive, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidSignature { .. }));
}

#[test]
fn test_several_entries_from_one_handle() {
    // Positioned reads keep the handle shareable; decompressing one entry
    // must not disturb another.
    let data = ArchiveBuilder::new()
        .entry(EntrySpec::new("first", b"alpha", DEFLATE))
        .entry(EntrySpec::new("second", b"beta", STORE))
        .build();
    let archive = ZipArchive::from_reader(data.as_slice(), data.len() as u64).unwrap();

    assert_eq!(collect(&archive, 1).unwrap(), b"beta");
    assert_eq!(collect(&archive, 0).unwrap(), b"alpha");
    assert_eq!(collect(&archive, 1).unwrap(), b"beta");
}
