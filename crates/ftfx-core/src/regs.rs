//! FTFx flash memory module register definitions
//!
//! Offsets are bytes from the controller base address. The module is
//! byte-addressed and its command object registers are laid out in reverse
//! order within each 32-bit word (FCCOB0 lives at 0x07, FCCOB3 at 0x04), so
//! every access in this crate is a single 8-bit access at the exact offset.
//!
//! Values follow the KSDK 1.3.0 C90TFS/FTFx device definitions for the KL25Z.

// ============================================================================
// Status and configuration
// ============================================================================

/// Flash Status Register
pub const FSTAT: usize = 0x00;
/// Flash Configuration Register
pub const FCNFG: usize = 0x01;
/// Flash Security Register
pub const FSEC: usize = 0x02;
/// Flash Option Register
pub const FOPT: usize = 0x03;

// FSTAT bits
/// Command Complete Interrupt Flag (write 1 to launch)
pub const FSTAT_CCIF: u8 = 0x80;
/// Read Collision Error Flag (write 1 to clear)
pub const FSTAT_RDCOLERR: u8 = 0x40;
/// Access Error Flag (write 1 to clear)
pub const FSTAT_ACCERR: u8 = 0x20;
/// Protection Violation Flag (write 1 to clear)
pub const FSTAT_FPVIOL: u8 = 0x10;
/// Memory Controller Command Completion Status (read only)
pub const FSTAT_MGSTAT0: u8 = 0x01;
/// Flags cleared by writing a one to them
pub const FSTAT_W1C_MASK: u8 = FSTAT_RDCOLERR | FSTAT_ACCERR | FSTAT_FPVIOL;

// ============================================================================
// Command object (FCCOB0-B)
// ============================================================================

/// Command code
pub const FCCOB0: usize = 0x07;
/// Command parameter 1
pub const FCCOB1: usize = 0x06;
/// Command parameter 2
pub const FCCOB2: usize = 0x05;
/// Command parameter 3
pub const FCCOB3: usize = 0x04;
/// Command parameter 4
pub const FCCOB4: usize = 0x0B;
/// Command parameter 5
pub const FCCOB5: usize = 0x0A;
/// Command parameter 6
pub const FCCOB6: usize = 0x09;
/// Command parameter 7
pub const FCCOB7: usize = 0x08;
/// Command parameter 8
pub const FCCOB8: usize = 0x0F;
/// Command parameter 9
pub const FCCOB9: usize = 0x0E;
/// Command parameter A
pub const FCCOBA: usize = 0x0D;
/// Command parameter B
pub const FCCOBB: usize = 0x0C;

/// Lowest offset of the command object block
pub const FCCOB_FIRST: usize = 0x04;
/// Highest offset of the command object block
pub const FCCOB_LAST: usize = 0x0F;

/// Registers receiving the flash address, bits 0-7 first
pub const ADDR_LANES: [usize; 3] = [FCCOB1, FCCOB2, FCCOB3];
/// Registers receiving the data longword, bits 0-7 first
pub const DATA_LANES: [usize; 4] = [FCCOB4, FCCOB5, FCCOB6, FCCOB7];

// Commands
/// Program Longword
pub const CMD_PROGRAM_LONGWORD: u8 = 0x06;

// ============================================================================
// Protection and access control
// ============================================================================

/// P-Flash protection, regions 24-31
pub const FPROT0: usize = 0x13;
/// P-Flash protection, regions 16-23
pub const FPROT1: usize = 0x12;
/// P-Flash protection, regions 8-15
pub const FPROT2: usize = 0x11;
/// P-Flash protection, regions 0-7
pub const FPROT3: usize = 0x10;
/// D-Flash protection
pub const FDPROT: usize = 0x17;
/// EERAM protection
pub const FEPROT: usize = 0x16;

// Execute-only access registers
/// Execute-only access H0 (high segments)
pub const XACCH0: usize = 0x1B;
/// Execute-only access H1 (high segments)
pub const XACCH1: usize = 0x1A;
/// Execute-only access H2 (high segments)
pub const XACCH2: usize = 0x19;
/// Execute-only access H3 (high segments)
pub const XACCH3: usize = 0x18;
/// Execute-only access L0 (low segments)
pub const XACCL0: usize = 0x1F;
/// Execute-only access L1 (low segments)
pub const XACCL1: usize = 0x1E;
/// Execute-only access L2 (low segments)
pub const XACCL2: usize = 0x1D;
/// Execute-only access L3 (low segments)
pub const XACCL3: usize = 0x1C;

// Supervisor-only access registers
/// Supervisor-only access H0 (high segments)
pub const SACCH0: usize = 0x23;
/// Supervisor-only access H1 (high segments)
pub const SACCH1: usize = 0x22;
/// Supervisor-only access H2 (high segments)
pub const SACCH2: usize = 0x21;
/// Supervisor-only access H3 (high segments)
pub const SACCH3: usize = 0x20;
/// Supervisor-only access L0 (low segments)
pub const SACCL0: usize = 0x27;
/// Supervisor-only access L1 (low segments)
pub const SACCL1: usize = 0x26;
/// Supervisor-only access L2 (low segments)
pub const SACCL2: usize = 0x25;
/// Supervisor-only access L3 (low segments)
pub const SACCL3: usize = 0x24;

/// P-Flash access segment size
pub const FACSS: usize = 0x28;
/// P-Flash access segment number
pub const FACSN: usize = 0x2B;

/// Size of the register block in bytes
pub const REG_BLOCK_SIZE: usize = 0x2C;

/// P-Flash protection registers, PROT bits 0-7 first
pub const FPROT_LANES: [usize; 4] = [FPROT3, FPROT2, FPROT1, FPROT0];
/// Number of independently protectable P-Flash regions
pub const PROT_REGIONS: u32 = 32;

// ============================================================================
// KL25Z program flash
// ============================================================================

/// Flash memory module register base address
pub const KL25Z_REG_BASE: u32 = 0x4002_0000;
/// P-Flash start address
pub const KL25Z_PFLASH_BASE: u32 = 0x0000_0000;
/// P-Flash block size
pub const KL25Z_PFLASH_BLOCK_SIZE: u32 = 131_072;
/// P-Flash block count
pub const KL25Z_PFLASH_BLOCK_COUNT: u32 = 1;
/// P-Flash sector size
pub const KL25Z_PFLASH_SECTOR_SIZE: u32 = 1024;
/// P-Flash write unit size
pub const KL25Z_PFLASH_WRITE_UNIT_SIZE: u32 = 4;
/// Total P-Flash size
pub const KL25Z_PFLASH_SIZE: u32 = KL25Z_PFLASH_BLOCK_SIZE * KL25Z_PFLASH_BLOCK_COUNT;

/// Longword size in bytes
pub const LONGWORD_SIZE: u32 = 4;

/// Extract byte lane `lane` (0 = bits 0-7) of a value
#[inline]
pub const fn byte_lane(value: u32, lane: usize) -> u8 {
    ((value >> (lane * 8)) & 0xFF) as u8
}

/// Register name, description and offset, in offset order
pub const REGISTER_MAP: &[(&str, usize, &str)] = &[
    ("FSTAT", FSTAT, "status: CCIF 0x80, RDCOLERR 0x40, ACCERR 0x20, FPVIOL 0x10, MGSTAT0 0x01"),
    ("FCNFG", FCNFG, "configuration"),
    ("FSEC", FSEC, "security"),
    ("FOPT", FOPT, "options"),
    ("FCCOB3", FCCOB3, "address bits 16-23"),
    ("FCCOB2", FCCOB2, "address bits 8-15"),
    ("FCCOB1", FCCOB1, "address bits 0-7"),
    ("FCCOB0", FCCOB0, "command code (0x06 = program longword)"),
    ("FCCOB7", FCCOB7, "data bits 24-31"),
    ("FCCOB6", FCCOB6, "data bits 16-23"),
    ("FCCOB5", FCCOB5, "data bits 8-15"),
    ("FCCOB4", FCCOB4, "data bits 0-7"),
    ("FCCOBB", FCCOBB, "command parameter B"),
    ("FCCOBA", FCCOBA, "command parameter A"),
    ("FCCOB9", FCCOB9, "command parameter 9"),
    ("FCCOB8", FCCOB8, "command parameter 8"),
    ("FPROT3", FPROT3, "P-Flash protection, regions 0-7"),
    ("FPROT2", FPROT2, "P-Flash protection, regions 8-15"),
    ("FPROT1", FPROT1, "P-Flash protection, regions 16-23"),
    ("FPROT0", FPROT0, "P-Flash protection, regions 24-31"),
    ("FEPROT", FEPROT, "EERAM protection"),
    ("FDPROT", FDPROT, "D-Flash protection"),
    ("XACCH3", XACCH3, "execute-only access, high"),
    ("XACCH2", XACCH2, "execute-only access, high"),
    ("XACCH1", XACCH1, "execute-only access, high"),
    ("XACCH0", XACCH0, "execute-only access, high"),
    ("XACCL3", XACCL3, "execute-only access, low"),
    ("XACCL2", XACCL2, "execute-only access, low"),
    ("XACCL1", XACCL1, "execute-only access, low"),
    ("XACCL0", XACCL0, "execute-only access, low"),
    ("SACCH3", SACCH3, "supervisor-only access, high"),
    ("SACCH2", SACCH2, "supervisor-only access, high"),
    ("SACCH1", SACCH1, "supervisor-only access, high"),
    ("SACCH0", SACCH0, "supervisor-only access, high"),
    ("SACCL3", SACCL3, "supervisor-only access, low"),
    ("SACCL2", SACCL2, "supervisor-only access, low"),
    ("SACCL1", SACCL1, "supervisor-only access, low"),
    ("SACCL0", SACCL0, "supervisor-only access, low"),
    ("FACSS", FACSS, "access segment size"),
    ("FACSN", FACSN, "access segment number"),
];

/// Look up the name of the register at `offset`
pub fn register_name(offset: usize) -> Option<&'static str> {
    REGISTER_MAP
        .iter()
        .find(|(_, off, _)| *off == offset)
        .map(|(name, _, _)| *name)
}

/// Returns true if `offset` is one of the FCCOB registers
#[inline]
pub const fn is_command_object(offset: usize) -> bool {
    offset >= FCCOB_FIRST && offset <= FCCOB_LAST
}
