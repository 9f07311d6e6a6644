//! Program command implementation

use ftfx_core::regs::PROT_REGIONS;
use ftfx_core::{outcome_code, CompletionMode, ControllerStatus, FlashWriter, ProgramRequest};
use ftfx_sim::{SimConfig, SimController};

use crate::cli::Fault;
use crate::config::BoardConfig;

/// Options for one program run
#[derive(Debug, Clone, Default)]
pub struct ProgramOptions {
    pub address: u32,
    pub data: u32,
    pub wait: bool,
    pub timeout_us: Option<u32>,
    pub busy_cycles: u32,
    pub inject: Option<Fault>,
    pub wedged: bool,
    pub protect: Vec<u32>,
}

/// Build the simulated controller described by the board and options
fn build_simulator(
    board: &BoardConfig,
    opts: &ProgramOptions,
) -> Result<SimController, Box<dyn std::error::Error>> {
    let mut sim = SimController::new(SimConfig {
        geometry: board.geometry()?,
        busy_polls: opts.busy_cycles,
        ..Default::default()
    });

    for &region in &opts.protect {
        if region >= PROT_REGIONS {
            return Err(format!(
                "Protection region {} out of range (0-{})",
                region,
                PROT_REGIONS - 1
            )
            .into());
        }
        sim.protect_region(region);
    }

    match opts.inject {
        Some(Fault::Accerr) => sim.inject(ControllerStatus::ACCERR),
        Some(Fault::Fpviol) => sim.inject(ControllerStatus::FPVIOL),
        None => {}
    }

    sim.set_wedged(opts.wedged);
    Ok(sim)
}

/// Run one program sequence and return the simulator with the outcome
pub fn program_on_simulator(
    board: &BoardConfig,
    opts: &ProgramOptions,
) -> Result<(SimController, ftfx_core::Result<()>), Box<dyn std::error::Error>> {
    let sim = build_simulator(board, opts)?;

    let mut writer_config = board.writer;
    if let Some(timeout) = opts.timeout_us {
        writer_config.timeout_us = timeout;
    }
    if opts.wait {
        writer_config.completion = CompletionMode::WaitForCompletion;
    }

    let mut writer = FlashWriter::from_flash_config(sim, &board.flash, writer_config)?;
    let outcome = writer.program_word(ProgramRequest::new(opts.address, opts.data));

    Ok((writer.release(), outcome))
}

/// Run the program command
pub fn run_program(
    board: &BoardConfig,
    opts: &ProgramOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if opts.wait || board.writer.completion == CompletionMode::WaitForCompletion {
        "wait for completion"
    } else {
        "launch only"
    };
    println!(
        "Programming 0x{:08X} at 0x{:08X} ({})",
        opts.data, opts.address, mode
    );

    let (sim, outcome) = program_on_simulator(board, opts)?;

    println!();
    if sim.writes().is_empty() {
        println!("No register writes");
    } else {
        println!("Register writes:");
        for write in sim.writes() {
            println!("  {}", write);
        }
    }
    println!();
    println!("FSTAT reads:  {}", sim.reads());
    println!("Time waited:  {} us", sim.delayed_us());
    println!("Final status: {}", sim.fstat());
    match sim.flash_word(opts.address) {
        Some(word) => println!("Flash word:   0x{:08X}", word),
        None => println!("Flash word:   (not in P-Flash)"),
    }
    println!("Outcome code: {}", outcome_code(outcome));

    match outcome {
        Ok(()) => {
            if sim.fstat().is_idle() {
                println!("Programmed successfully");
            } else {
                println!("Command launched, controller still busy");
            }
            Ok(())
        }
        Err(e) if e.is_hardware_fault() => {
            println!("Controller reported a fault");
            Err(e.into())
        }
        Err(e) => {
            println!("Request rejected before touching the controller");
            Err(e.into())
        }
    }
}
