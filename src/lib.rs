//! DMG (Sharp LR35902) CPU core: register file, fetch/decode/execute loop,
//! flag semantics, and the interrupt controller.
//!
//! This crate models the CPU in isolation. It knows nothing about cartridges,
//! the PPU/APU/timer, or any front-end; it only requires an implementation of
//! [`MemoryBus`] to read and write a 16-bit address space.

pub mod alu;
pub mod bus;
pub mod constants;
pub mod cpu;
pub mod error;
pub mod reg;

pub use bus::MemoryBus;
pub use cpu::{Cpu, Snapshot, TickOutcome};
pub use error::CpuError;
pub use reg::{Condition, Flag, Reg16, Reg8};
