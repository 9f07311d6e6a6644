//! Board configuration display

use ftfx_core::regs::{KL25Z_PFLASH_SECTOR_SIZE, LONGWORD_SIZE, PROT_REGIONS};
use ftfx_core::CompletionMode;

use crate::config::{format_size, BoardConfig};

fn print_region(label: &str, base: u32, size: u32) {
    if size == 0 {
        println!("  {:<10} (none)", label);
    } else {
        println!(
            "  {:<10} 0x{:08X} - 0x{:08X} ({})",
            label,
            base,
            u64::from(base) + u64::from(size) - 1,
            format_size(size)
        );
    }
}

/// Print the effective board configuration
pub fn show_info(board: &BoardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = board.geometry()?;

    match &board.source {
        Some(path) => println!("Board file: {}", path.display()),
        None => println!("Board file: (built-in FRDM-KL25Z)"),
    }
    println!();

    println!("Memory:");
    println!("  {:<10} 0x{:08X}", "Controller", geometry.controller_base());
    print_region("P-Flash", geometry.flash_base(), geometry.flash_size());
    print_region("D-Flash", board.flash.dflash_base, board.flash.dflash_size);
    print_region("EERAM", board.flash.eeram_base, board.flash.eeram_size);
    println!();

    println!("P-Flash:");
    println!("  Write unit:         {} bytes", LONGWORD_SIZE);
    println!("  Last word:          0x{:08X}", geometry.last_word());
    println!(
        "  Protection regions: {} x {}",
        PROT_REGIONS,
        format_size(geometry.flash_size() / PROT_REGIONS)
    );
    if geometry == ftfx_core::FlashGeometry::KL25Z {
        println!("  Sector size:        {}", format_size(KL25Z_PFLASH_SECTOR_SIZE));
    }
    println!();

    let completion = match board.writer.completion {
        CompletionMode::LaunchOnly => "launch only",
        CompletionMode::WaitForCompletion => "wait for completion",
    };
    println!("Writer:");
    println!("  Timeout:            {} us", board.writer.timeout_us);
    println!("  Poll interval:      {} us", board.writer.poll_interval_us);
    println!("  Completion:         {}", completion);
    println!(
        "  Debug:              {}",
        if board.flash.debug_enable { "enabled" } else { "disabled" }
    );

    Ok(())
}
