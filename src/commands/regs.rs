//! Register map listing

use ftfx_core::regs::{is_command_object, REGISTER_MAP};

/// Print the controller register map
pub fn list_registers(controller_base: u32) {
    println!("FTFx registers at 0x{:08X}:", controller_base);
    println!();
    println!("{:<8} {:>6} {:>12}  {}", "Name", "Offset", "Address", "Purpose");
    println!("{}", "-".repeat(72));

    for &(name, offset, purpose) in REGISTER_MAP {
        let marker = if is_command_object(offset) { "*" } else { " " };
        println!(
            "{:<8} {:>6} {:>12} {}{}",
            name,
            format!("0x{:02X}", offset),
            format!("0x{:08X}", controller_base as usize + offset),
            marker,
            purpose
        );
    }

    println!();
    println!("* command object (FCCOB)");
}
