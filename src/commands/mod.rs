//! CLI command implementations
//!
//! Every command runs against an in-memory simulator of the FTFx controller
//! built from the board configuration, so nothing here touches real
//! hardware.

mod info;
mod program;
mod regs;

pub use info::show_info;
pub use program::{run_program, ProgramOptions};
pub use regs::list_registers;
