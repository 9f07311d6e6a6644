//! Globally shared flash writer
//!
//! There is one flash controller per chip, but firmware often needs it from
//! both thread mode and interrupt handlers. [`SharedFlashWriter`] holds the
//! single [`FlashWriter`] behind a `critical_section::Mutex` so it can live
//! in a `static`, and runs each program sequence inside one critical
//! section so that callers serialize instead of interleaving register
//! writes.
//!
//! ```ignore
//! static FLASH: SharedFlashWriter<MmioBus<fn(u32)>> = SharedFlashWriter::new();
//!
//! FLASH.install(FlashWriter::new(bus, FlashGeometry::KL25Z))?;
//! FLASH.program(0x0001_F000, 0x1234_5678)?;
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::bus::ControllerBus;
use crate::error::{Error, Result};
use crate::writer::{FlashWriter, ProgramRequest};

/// A [`FlashWriter`] slot guarded by a critical section
pub struct SharedFlashWriter<B> {
    slot: Mutex<RefCell<Option<FlashWriter<B>>>>,
}

impl<B> SharedFlashWriter<B> {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
        }
    }

    /// Returns true if a writer has been installed
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow(cs).borrow().is_some())
    }

    /// Put the writer into the slot
    ///
    /// Fails with [`Error::AlreadyInstalled`] if the slot is occupied; the
    /// installed writer is left in place.
    pub fn install(&self, writer: FlashWriter<B>) -> Result<()> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow(cs).borrow_mut();
            if slot.is_some() {
                return Err(Error::AlreadyInstalled);
            }
            *slot = Some(writer);
            Ok(())
        })
    }

    /// Remove the writer from the slot
    pub fn take(&self) -> Option<FlashWriter<B>> {
        critical_section::with(|cs| self.slot.borrow(cs).borrow_mut().take())
    }

    /// Run `f` with exclusive access to the writer
    ///
    /// Interrupts are masked for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut FlashWriter<B>) -> R) -> Result<R> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow(cs).borrow_mut();
            let writer = slot.as_mut().ok_or(Error::NotInstalled)?;
            Ok(f(writer))
        })
    }
}

impl<B: ControllerBus> SharedFlashWriter<B> {
    /// Program one longword under the critical section
    pub fn program_word(&self, request: ProgramRequest) -> Result<()> {
        self.with(|writer| writer.program_word(request))?
    }

    /// Program `data` at `address` under the critical section
    pub fn program(&self, address: u32, data: u32) -> Result<()> {
        self.program_word(ProgramRequest::new(address, data))
    }

    /// Wait for the controller to go idle under the critical section
    pub fn wait_idle(&self) -> Result<()> {
        self.with(|writer| writer.wait_idle())?
    }
}

impl<B> Default for SharedFlashWriter<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FlashGeometry;
    use crate::regs::{is_command_object, FCCOB0, FSTAT, FSTAT_CCIF, REG_BLOCK_SIZE};

    /// Records writes; every command completes instantly
    struct TraceBus {
        regs: [u8; REG_BLOCK_SIZE],
        writes: Vec<(usize, u8)>,
    }

    impl TraceBus {
        fn new() -> Self {
            let mut regs = [0u8; REG_BLOCK_SIZE];
            regs[FSTAT] = FSTAT_CCIF;
            Self {
                regs,
                writes: Vec::new(),
            }
        }
    }

    impl ControllerBus for TraceBus {
        fn read8(&mut self, offset: usize) -> u8 {
            self.regs[offset]
        }

        fn write8(&mut self, offset: usize, value: u8) {
            self.writes.push((offset, value));
            if offset != FSTAT {
                self.regs[offset] = value;
            }
            // Give other threads a chance to interleave if unguarded
            std::thread::yield_now();
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    #[test]
    fn test_not_installed() {
        let shared: SharedFlashWriter<TraceBus> = SharedFlashWriter::new();
        assert!(!shared.is_installed());
        assert_eq!(shared.program(0x100, 0), Err(Error::NotInstalled));
        assert_eq!(shared.wait_idle(), Err(Error::NotInstalled));
    }

    #[test]
    fn test_install_once() {
        let shared = SharedFlashWriter::new();
        let geom = FlashGeometry::KL25Z;

        assert_eq!(shared.install(FlashWriter::new(TraceBus::new(), geom)), Ok(()));
        assert!(shared.is_installed());
        assert_eq!(
            shared.install(FlashWriter::new(TraceBus::new(), geom)),
            Err(Error::AlreadyInstalled)
        );

        assert_eq!(shared.program(0x100, 0xABCD_0123), Ok(()));
        assert_eq!(shared.with(|w| w.bus().writes.len()), Ok(9));

        let writer = shared.take().unwrap();
        assert_eq!(writer.bus().regs[FCCOB0], 0x06);
        assert!(!shared.is_installed());
    }

    #[test]
    fn test_concurrent_callers_serialize() {
        const THREADS: u32 = 4;
        const WORDS: u32 = 16;

        let shared = SharedFlashWriter::new();
        shared
            .install(FlashWriter::new(TraceBus::new(), FlashGeometry::KL25Z))
            .unwrap();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let shared = &shared;
                s.spawn(move || {
                    for i in 0..WORDS {
                        let addr = (t * WORDS + i) * 4;
                        shared.program(addr, addr).unwrap();
                    }
                });
            }
        });

        let writer = shared.take().unwrap();
        let writes = &writer.bus().writes;
        assert_eq!(writes.len(), (THREADS * WORDS * 9) as usize);

        // Every sequence is opcode, seven operand bytes, launch, unbroken
        for seq in writes.chunks(9) {
            assert_eq!(seq[0], (FCCOB0, 0x06));
            assert!(seq[1..8].iter().all(|(off, _)| is_command_object(*off)));
            assert_eq!(seq[8], (FSTAT, FSTAT_CCIF));
        }
    }
}
