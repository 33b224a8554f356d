//! Host-pluggable logging.
//!
//! The core never talks to a global logger directly. A frontend that wants
//! core logs installs a [`LogSink`] once per process; until then the
//! `core_*!` macros compile down to a cheap flag check. Events are tagged
//! with the machine [`Unit`] they came from, so a sink can filter on, say,
//! PPU mode traces without string-matching targets.

use std::fmt;
use std::sync::OnceLock;

/// Verbosity of a core log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Trace,
    Info,
}

/// The part of the machine an event originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Cartridge,
    Cpu,
    Bus,
    Ppu,
    Serial,
}

impl Unit {
    pub const fn name(self) -> &'static str {
        match self {
            Unit::Cartridge => "cartridge",
            Unit::Cpu => "cpu",
            Unit::Bus => "bus",
            Unit::Ppu => "ppu",
            Unit::Serial => "serial",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait LogSink: Send + Sync + 'static {
    fn log(&self, level: Level, unit: Unit, args: fmt::Arguments);
}

static SINK: OnceLock<Box<dyn LogSink>> = OnceLock::new();

/// Install the process-wide sink. Fails if one is already installed.
pub fn install_sink(sink: Box<dyn LogSink>) -> Result<(), Box<dyn LogSink>> {
    SINK.set(sink)
}

/// Whether a sink is installed; the log macros check this before
/// formatting anything.
pub fn enabled() -> bool {
    SINK.get().is_some()
}

pub(crate) fn emit(level: Level, unit: Unit, args: fmt::Arguments) {
    if let Some(sink) = SINK.get() {
        sink.log(level, unit, args);
    }
}
