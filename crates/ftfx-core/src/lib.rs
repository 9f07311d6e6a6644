//! ftfx-core - Word programming for the FTFx flash memory module
//!
//! This crate drives the on-chip flash controller found on Kinetis parts
//! such as the KL25Z to program a single 32-bit word into program flash.
//! It is `no_std` and has no allocator requirement, so it can run straight
//! out of a bare-metal firmware image.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```ignore
//! use ftfx_core::{FlashGeometry, FlashWriter, MmioBus};
//!
//! let bus = unsafe { MmioBus::new(FlashGeometry::KL25Z.controller_base() as usize, delay_us) };
//! let mut writer = FlashWriter::new(bus, FlashGeometry::KL25Z);
//!
//! writer.program(0x0001_F000, 0xDEAD_BEEF)?;
//! // The command is only launched; wait before relying on the data.
//! writer.wait_idle()?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod error;
pub mod geometry;
pub mod mmio;
pub mod regs;
pub mod shared;
pub mod status;
pub mod writer;

pub use bus::ControllerBus;
pub use error::{outcome_code, Error, Result};
pub use geometry::{FlashConfig, FlashGeometry};
pub use mmio::MmioBus;
pub use shared::SharedFlashWriter;
pub use status::ControllerStatus;
pub use writer::{CompletionMode, FlashWriter, ProgramRequest, WriterConfig};
