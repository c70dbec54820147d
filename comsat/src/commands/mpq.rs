//! Archive inspection commands

use anyhow::{Context, Result};
use comsat_mpq::{Archive, BlockFlags};
use std::path::Path;

use crate::replay_header::ReplayHeader;
use crate::utils::{
    add_table_row, create_spinner, create_table, format_bytes, format_compression_ratio,
    matches_pattern, truncate_path,
};

/// List the named files of an archive
pub fn list_archive(path: &Path, long: bool, filter: Option<&str>) -> Result<()> {
    let spinner = create_spinner("Opening archive...");
    let mut archive = Archive::open(path)
        .with_context(|| format!("Failed to open archive {}", path.display()))?;
    let entries = archive.list().context("Failed to read file list")?;
    spinner.finish_and_clear();

    let pattern = filter.unwrap_or("*");
    let mut filtered: Vec<_> = entries
        .iter()
        .filter(|e| matches_pattern(&e.name, pattern))
        .collect();
    filtered.sort_by(|a, b| a.name.cmp(&b.name));

    if filtered.is_empty() {
        println!("No files found matching pattern: {pattern}");
        return Ok(());
    }

    if long {
        let mut table = create_table(vec!["File", "Size", "Compressed", "Ratio", "Flags"]);
        for entry in filtered {
            add_table_row(
                &mut table,
                vec![
                    truncate_path(&entry.name, 50),
                    format_bytes(entry.size),
                    format_bytes(entry.compressed_size),
                    format_compression_ratio(entry.size, entry.compressed_size),
                    flags_string(entry.flags),
                ],
            );
        }
        table.printstd();
    } else {
        for entry in filtered {
            println!("{}", entry.name);
        }
    }

    Ok(())
}

/// Print header and table information about an archive
pub fn show_info(path: &Path) -> Result<()> {
    let spinner = create_spinner("Opening archive...");
    let archive = Archive::open(path)
        .with_context(|| format!("Failed to open archive {}", path.display()))?;
    spinner.finish_and_clear();

    let info = archive.get_info();

    println!("MPQ Archive Information");
    println!("=======================");
    println!("Path: {}", path.display());
    println!("File size: {}", format_bytes(info.file_size));
    println!("Archive offset: 0x{:X}", info.archive_offset);
    println!("Format version: {:?}", info.format_version);
    println!("Header size: {} bytes", info.header_size);
    println!("Archive size: {}", format_bytes(info.archive_size));
    println!("Sector size: {} bytes", info.sector_size);
    println!("Hash table entries: {}", info.hash_table_size);
    println!("Block table entries: {}", info.block_table_size);
    println!("Number of files: {}", info.file_count);
    println!(
        "Hi-block table: {}",
        if info.has_hi_block_table { "yes" } else { "no" }
    );
    println!(
        "Listfile: {}",
        if info.has_listfile { "yes" } else { "no" }
    );

    if let Some(user_data) = &info.user_data_info {
        println!("\nUser Data");
        println!("---------");
        println!("Header size: {} bytes", user_data.header_size);
        println!("Data size: {} bytes", user_data.data_size);
        println!("MPQ header offset: 0x{:X}", user_data.header_offset);
    }

    if let Some(user_data) = archive.user_data() {
        match ReplayHeader::parse(&user_data.content) {
            Ok(header) => {
                println!("\nReplay Header");
                println!("-------------");
                println!("Game version: {}", header.version);
                println!(
                    "Game length: {} game loops ({})",
                    header.elapsed_game_loops,
                    header.game_length()
                );
            }
            Err(e) => log::warn!("User data is not a replay header: {e}"),
        }
    }

    Ok(())
}

/// One letter per storage flag: Compressed, Imploded, Encrypted, fix Key, Single unit, cRc
fn flags_string(flags: BlockFlags) -> String {
    [
        (BlockFlags::COMPRESS, 'C'),
        (BlockFlags::IMPLODE, 'I'),
        (BlockFlags::ENCRYPTED, 'E'),
        (BlockFlags::FIX_KEY, 'K'),
        (BlockFlags::SINGLE_UNIT, 'S'),
        (BlockFlags::SECTOR_CRC, 'R'),
    ]
    .iter()
    .map(|&(flag, c)| if flags.contains(flag) { c } else { '-' })
    .collect()
}
