use crate::{
    bus::memory::Memory,
    cpu::Cpu,
    machine::Machine,
    sound::Console,
};

use log::{error, info, warn};
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

pub use clap::Parser;
pub use error::{Error, Result};

pub mod bus;
pub mod cpu;
pub mod display;
mod error;
pub mod machine;
pub mod sound;
pub mod timer;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Path to Chip-8 ROM
    pub rom_path: PathBuf,

    /// Load address of the ROM (hex with 0x prefix, or decimal)
    #[arg(long, default_value = "0x200", value_parser = parse_address)]
    pub origin: u16,

    /// Instructions executed per second
    #[arg(long, default_value_t = Core::STEPS_PER_SECOND)]
    pub steps_per_second: u32,

    /// Stop after this many instructions
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Log beeps instead of staying silent
    #[arg(long)]
    pub beep: bool,
}

fn parse_address(s: &str) -> std::result::Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };

    match parsed {
        Ok(addr) if (addr as usize) < Memory::SIZE => Ok(addr),
        Ok(addr) => Err(format!("{:#06X} is outside memory", addr)),
        Err(err) => Err(err.to_string()),
    }
}

pub struct Core {
    cpu: Cpu,
    step_period: Duration,
    max_steps: Option<u64>,
}

impl Core {
    pub const ROM_START: u16 = 0x200;
    pub const STEPS_PER_SECOND: u32 = 700;

    pub fn new(args: Args) -> Result<Self> {
        // Load ROM
        let rom = std::fs::read(&args.rom_path)?;

        let mut machine = Machine::new();
        let len = machine.write_bytes(args.origin, &rom);

        if len < rom.len() {
            warn!("ROM truncated from {} to {} bytes", rom.len(), len);
        }

        machine.set_pc(args.origin);

        info!("Loaded {} bytes from {} at {:#06X}", len, args.rom_path.display(), args.origin);

        let cpu = if args.beep {
            Cpu::new(machine).with_sound(Console::default())
        } else {
            Cpu::new(machine)
        };

        Ok(Self {
            cpu,
            step_period: Duration::from_secs(1) / args.steps_per_second.max(1),
            max_steps: args.max_steps,
        })
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Steps at the configured rate until `max_steps` or a fatal error
    pub fn run(&mut self) -> Result<()> {
        self.cpu.start()?;

        let result = self.step_loop();

        self.cpu.stop();

        let machine = self.cpu.machine();
        info!(
            "Halted at pc {:#06X}, I {:#06X}, V {:02X?}",
            machine.pc(),
            machine.index(),
            machine.registers()
        );

        result
    }

    fn step_loop(&mut self) -> Result<()> {
        let mut next_step = Instant::now();
        let mut steps = 0u64;

        while self.max_steps.map_or(true, |max| steps < max) {
            if let Err(err) = self.cpu.step() {
                error!("Fatal error after {} steps: {}", steps, err);
                return Err(err);
            }

            steps += 1;
            next_step += self.step_period;

            if let Some(wait) = next_step.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }

        info!("Executed {} steps", steps);

        Ok(())
    }
}
