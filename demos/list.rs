use pakzip::ZipArchive;
use std::env;
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <archive.zip>", args[0]);
        eprintln!("List the contents of a ZIP archive");
        std::process::exit(1);
    }

    let archive_path = &args[1];
    let archive = ZipArchive::open(archive_path)?;

    println!("Archive:  {}", archive_path);

    if !archive.comment().is_empty() {
        println!("Comment:  {}", String::from_utf8_lossy(archive.comment()));
    }

    println!();
    println!("   Length  Date/Time             Perms       Name");
    println!("---------  --------------------  ----------  -------");

    for entry in archive.entries() {
        let permissions_str = format_permissions(entry.mode().value());

        // Directories get a blank size column
        let size_str = if entry.is_dir() {
            format!("{:9}", "")
        } else {
            format!("{:9}", entry.uncompressed_size())
        };

        let when = entry.last_modified().strftime("%Y-%m-%d %H:%M:%S").to_string();
        print!("{}  {:20}  {:10}  ", size_str, when, permissions_str);
        std::io::stdout().write_all(entry.file_path().as_bytes())?;
        println!();
    }

    println!("---------  --------------------  ----------  -------");
    println!(
        "{:9}                                             {} files",
        archive.uncompressed_total(),
        archive.entries().len()
    );

    if archive.compressed_total() > 0 && archive.uncompressed_total() > 0 {
        let compression_ratio =
            (archive.compressed_total() as f64 / archive.uncompressed_total() as f64) * 100.0;
        println!(
            "Compressed size: {} bytes ({:.1}%)",
            archive.compressed_total(),
            compression_ratio
        );
    }

    Ok(())
}

fn format_permissions(mode: u32) -> String {
    let file_type = match mode & 0o170000 {
        0o040000 => 'd', // Directory
        0o120000 => 'l', // Symbolic link
        0o100000 => '-', // Regular file
        0o060000 => 'b', // Block device
        0o020000 => 'c', // Character device
        0o010000 => 'p', // FIFO
        0o140000 => 's', // Socket
        _ => '?',        // Unknown
    };

    let owner = format!(
        "{}{}{}",
        if mode & 0o400 != 0 { 'r' } else { '-' },
        if mode & 0o200 != 0 { 'w' } else { '-' },
        if mode & 0o100 != 0 { 'x' } else { '-' }
    );

    let group = format!(
        "{}{}{}",
        if mode & 0o040 != 0 { 'r' } else { '-' },
        if mode & 0o020 != 0 { 'w' } else { '-' },
        if mode & 0o010 != 0 { 'x' } else { '-' }
    );

    let other = format!(
        "{}{}{}",
        if mode & 0o004 != 0 { 'r' } else { '-' },
        if mode & 0o002 != 0 { 'w' } else { '-' },
        if mode & 0o001 != 0 { 'x' } else { '-' }
    );

    format!("{}{}{}{}", file_type, owner, group, other)
}
