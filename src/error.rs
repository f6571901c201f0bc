//! Error surface for the decoder/executor.
//!
//! Decode failures are fatal but never panics: `Cpu::step` returns a `Result`
//! so an embedder decides whether to abort, log and halt, or otherwise react.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    /// A byte on the primary opcode page has no defined instruction (the
    /// eleven `ILLEGAL_*` slots on real hardware, e.g. 0xD3, 0xDB, 0xDD, 0xE3,
    /// 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD).
    InvalidOpcode { opcode: u8, pc: u16 },
    /// A byte on the 0xCB-prefixed page has no defined instruction. The CB
    /// page is actually fully decoded (every byte maps to a rotate/shift/bit
    /// op), so this variant exists for completeness/future-proofing rather
    /// than a reachable case today.
    InvalidCbOpcode { opcode: u8, pc: u16 },
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuError::InvalidOpcode { opcode, pc } => {
                write!(f, "invalid opcode 0x{opcode:02X} at PC=0x{pc:04X}")
            }
            CpuError::InvalidCbOpcode { opcode, pc } => {
                write!(f, "invalid CB-prefixed opcode 0x{opcode:02X} at PC=0x{pc:04X}")
            }
        }
    }
}

impl std::error::Error for CpuError {}
