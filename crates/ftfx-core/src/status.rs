//! Flash status register decoding
//!
//! A [`ControllerStatus`] is a snapshot of one FSTAT read. The hardware
//! changes FSTAT on its own, so a snapshot is only meaningful for the poll
//! that produced it.

use core::fmt;

use bitflags::bitflags;

use crate::error::Error;
use crate::regs::{FSTAT_ACCERR, FSTAT_CCIF, FSTAT_FPVIOL, FSTAT_MGSTAT0, FSTAT_RDCOLERR};

bitflags! {
    /// FSTAT flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControllerStatus: u8 {
        /// Command complete; writing 1 launches the loaded command
        const CCIF     = FSTAT_CCIF;
        /// Read collision during a command
        const RDCOLERR = FSTAT_RDCOLERR;
        /// Illegal command, parameter or access sequence
        const ACCERR   = FSTAT_ACCERR;
        /// Program or erase of a protected region
        const FPVIOL   = FSTAT_FPVIOL;
        /// Command completed with errors
        const MGSTAT0  = FSTAT_MGSTAT0;

        /// Faults that block launching a new command
        const LAUNCH_BLOCKING = Self::ACCERR.bits() | Self::FPVIOL.bits();
    }
}

impl ControllerStatus {
    /// Decode a raw FSTAT value, keeping unknown bits
    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self::from_bits_retain(raw)
    }

    /// Returns true if no command is in progress
    #[inline]
    pub fn is_idle(self) -> bool {
        self.contains(Self::CCIF)
    }

    /// The pending fault that must be reported, if any
    ///
    /// ACCERR takes precedence over FPVIOL. Returns the flag to clear along
    /// with the error it maps to.
    pub fn pending_fault(self) -> Option<(ControllerStatus, Error)> {
        if self.contains(Self::ACCERR) {
            Some((Self::ACCERR, Error::AccessError))
        } else if self.contains(Self::FPVIOL) {
            Some((Self::FPVIOL, Error::ProtectionViolation))
        } else {
            None
        }
    }
}

impl Default for ControllerStatus {
    fn default() -> Self {
        ControllerStatus::empty()
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FSTAT=0x{:02X}: CCIF={} RDCOLERR={} ACCERR={} FPVIOL={} MGSTAT0={}",
            self.bits(),
            self.contains(Self::CCIF) as u8,
            self.contains(Self::RDCOLERR) as u8,
            self.contains(Self::ACCERR) as u8,
            self.contains(Self::FPVIOL) as u8,
            self.contains(Self::MGSTAT0) as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_idle() {
        let status = ControllerStatus::from_raw(0x80);
        assert!(status.is_idle());
        assert_eq!(status.pending_fault(), None);
    }

    #[test]
    fn test_accerr_wins_over_fpviol() {
        let status = ControllerStatus::from_raw(0x80 | 0x20 | 0x10);
        assert_eq!(
            status.pending_fault(),
            Some((ControllerStatus::ACCERR, Error::AccessError))
        );

        let status = ControllerStatus::from_raw(0x80 | 0x10);
        assert_eq!(
            status.pending_fault(),
            Some((ControllerStatus::FPVIOL, Error::ProtectionViolation))
        );
    }

    #[test]
    fn test_unknown_bits_retained() {
        let status = ControllerStatus::from_raw(0x0E);
        assert_eq!(status.bits(), 0x0E);
        assert!(!status.is_idle());
    }

    #[test]
    fn test_display() {
        let status = ControllerStatus::CCIF | ControllerStatus::FPVIOL;
        assert_eq!(
            status.to_string(),
            "FSTAT=0x90: CCIF=1 RDCOLERR=0 ACCERR=0 FPVIOL=1 MGSTAT0=0"
        );
    }
}
