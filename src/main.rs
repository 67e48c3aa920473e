//! Demo harness for the Leading Edge Model D RTC.
//!
//! Registers the clock on a port bus, seeds it from the host calendar, and
//! then drives one tick per second the way the machine's timer subsystem
//! would, printing the time as read back through port I/O. Useful for
//! eyeballing rollovers (`--fast` skips the sleeping) and for watching
//! interrupt events (`--irq` wires the line to a logging controller).

use clap::Parser;
use log::info;
use std::cell::RefCell;
use std::error::Error;
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use mm58167::devices::mm58167::regs;
use mm58167::devices::{
    InterruptController, Mm58167, Mm58167Config, PortIoBus, RTC_PORT_BASE, RTC_PORT_COUNT,
};
use mm58167::nvr::{ClockChip, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "mm58167")]
#[command(about = "Leading Edge Model D real-time clock emulator")]
struct Args {
    /// Base I/O port (hex with 0x prefix, or decimal)
    #[arg(long, default_value = "0x300", value_parser = parse_port)]
    base: u16,

    /// Interrupt line raised on clock events
    #[arg(long)]
    irq: Option<u8>,

    /// Interrupt control mask to program (enables rollover events)
    #[arg(long, default_value = "0", value_parser = parse_byte)]
    ictrl: u8,

    /// Disable the board's year register (plain MM58167 behavior)
    #[arg(long)]
    no_year: bool,

    /// Number of ticks to run before exiting (default: run forever)
    #[arg(long)]
    ticks: Option<u64>,

    /// Do not sleep between ticks
    #[arg(long)]
    fast: bool,
}

fn parse_port(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid port {s:?}: {e}"))
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte {s:?}: {e}"))
}

/// Interrupt controller that just reports raised lines.
struct LoggingIntc;

impl InterruptController for LoggingIntc {
    fn raise(&mut self, mask: u16) {
        info!("interrupt raised, mask {mask:#06x}");
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Mm58167Config {
        irq: args.irq,
        year_register: if args.no_year {
            None
        } else {
            Some(regs::AL_DOM)
        },
    };

    let rtc = Rc::new(RefCell::new(Mm58167::new(
        config,
        Box::new(SystemClock),
        Box::new(LoggingIntc),
    )));

    let mut bus = PortIoBus::new();
    bus.register(args.base, RTC_PORT_COUNT, rtc.clone())?;
    rtc.borrow_mut().reset();
    if args.base != RTC_PORT_BASE {
        info!("rtc at {:#06x} (hardware default {RTC_PORT_BASE:#06x})", args.base);
    }

    // Program the event mask through the bus, like guest software would.
    bus.write(args.base + regs::ICTRL as u16, args.ictrl);

    let mut remaining = args.ticks;
    loop {
        if let Some(n) = remaining.as_mut() {
            if *n == 0 {
                break;
            }
            *n -= 1;
        }

        if !args.fast {
            thread::sleep(Duration::from_secs(1));
        }
        rtc.borrow_mut().tick();

        // BCD registers print as decimal digits in hex formatting.
        println!(
            "{:02x}:{:02x}:{:02x}  dow {:x} dom {:02x} mon {:02x} year {:02x}  status {:02x}",
            bus.read(args.base + regs::HOUR as u16),
            bus.read(args.base + regs::MIN as u16),
            bus.read(args.base + regs::SEC as u16),
            bus.read(args.base + regs::DOW as u16),
            bus.read(args.base + regs::DOM as u16),
            bus.read(args.base + regs::MON as u16),
            bus.read(args.base + regs::AL_DOM as u16),
            bus.read(args.base + regs::ISTAT as u16),
        );
    }

    bus.deregister(args.base)?;
    Ok(())
}
