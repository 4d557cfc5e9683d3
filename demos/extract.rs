use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <archive.zip> <target_dir>", args[0]);
        std::process::exit(1);
    }

    let archive_path = &args[1];
    let target_dir = &args[2];
    extract_zip_archive(archive_path, target_dir)?;
    Ok(())
}

fn extract_zip_archive<P: AsRef<std::path::Path>>(
    archive_path: P,
    target_dir: P,
) -> std::io::Result<()> {
    use std::io::{Error, ErrorKind::InvalidData};

    let archive = pakzip::ZipArchive::open(archive_path)
        .map_err(|e| Error::new(InvalidData, format!("Failed to read ZIP archive: {e}")))?;

    for entry in archive.entries() {
        let file_path = entry
            .file_path()
            .normalize()
            .map_err(|e| Error::new(InvalidData, format!("Bad entry name: {e}")))?;
        let out_path = target_dir.as_ref().join(file_path.as_ref());

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut outfile = std::fs::File::create(&out_path)?;
        let mut write_error = None;
        let result = archive.decompress_entry(entry, |chunk| {
            match outfile.write_all(chunk) {
                Ok(()) => true,
                Err(e) => {
                    write_error = Some(e);
                    false
                }
            }
        });
        match result {
            Ok(_) => {}
            Err(e) if matches!(e.kind(), pakzip::ErrorKind::Canceled) => {
                return Err(write_error
                    .unwrap_or_else(|| Error::new(InvalidData, "extraction canceled")));
            }
            Err(e) => {
                return Err(Error::new(
                    InvalidData,
                    format!("Failed to extract {file_path:?}: {e}"),
                ));
            }
        }
        println!("Extracted: {out_path:?}");
    }

    Ok(())
}
