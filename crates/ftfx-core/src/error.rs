//! Error types for ftfx-core
//!
//! This module provides a no_std compatible error type. Every failure of a
//! program operation is reported through it; nothing in the driver panics.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Request errors
    /// No target address was supplied (null pointer)
    NullAddress,
    /// Target address lies outside the programmable flash region
    OutOfRange {
        /// The rejected address
        addr: u32,
    },
    /// Target address is not aligned to a longword boundary
    Misaligned {
        /// The rejected address
        addr: u32,
    },

    // Controller faults
    /// FSTAT[ACCERR] was set (illegal command or access)
    AccessError,
    /// FSTAT[FPVIOL] was set (target region is protected)
    ProtectionViolation,
    /// FSTAT[MGSTAT0] was set after the command completed
    CommandFailed,
    /// The controller did not report command-complete in time
    Timeout,

    // Setup errors
    /// Flash geometry is empty, unaligned, or wraps the address space
    InvalidGeometry,
    /// The shared writer has not been installed yet
    NotInstalled,
    /// The shared writer already holds a writer
    AlreadyInstalled,
}

impl Error {
    /// Integer outcome code for C-style callers
    ///
    /// Success is `0` (see [`outcome_code`]); the hardware and request
    /// errors keep the values used by the classic `fprogram()` routine.
    pub const fn code(&self) -> i32 {
        match self {
            Self::ProtectionViolation => -1,
            Self::AccessError => -2,
            Self::NullAddress => -3,
            Self::OutOfRange { .. } => -4,
            Self::Timeout => -5,
            Self::Misaligned { .. } => -6,
            Self::CommandFailed => -7,
            Self::InvalidGeometry => -8,
            Self::NotInstalled => -9,
            Self::AlreadyInstalled => -10,
        }
    }

    /// Returns true if this error was reported by the flash controller
    /// rather than detected before touching it
    pub const fn is_hardware_fault(&self) -> bool {
        matches!(
            self,
            Self::AccessError | Self::ProtectionViolation | Self::CommandFailed | Self::Timeout
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullAddress => write!(f, "null target address"),
            Self::OutOfRange { addr } => {
                write!(f, "address 0x{:08X} is outside program flash", addr)
            }
            Self::Misaligned { addr } => {
                write!(f, "address 0x{:08X} is not longword aligned", addr)
            }
            Self::AccessError => write!(f, "flash access error (ACCERR)"),
            Self::ProtectionViolation => write!(f, "flash protection violation (FPVIOL)"),
            Self::CommandFailed => write!(f, "flash command failed (MGSTAT0)"),
            Self::Timeout => write!(f, "flash controller timed out"),
            Self::InvalidGeometry => write!(f, "invalid flash geometry"),
            Self::NotInstalled => write!(f, "flash writer not installed"),
            Self::AlreadyInstalled => write!(f, "flash writer already installed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Collapse a program result into its integer outcome code
pub fn outcome_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}
