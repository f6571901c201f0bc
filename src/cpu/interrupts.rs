//! Interrupt controller: priority selection and dispatch.
//!
//! Grounded on the teacher's `Cpu::handle_interrupts`/`service_interrupt`
//! (lowest-bit-first priority via `trailing_zeros`, push PC / clear IF bit /
//! IME←false / jump to vector), cross-checked against
//! `original_source/src/cpu.py`'s cascading `elif` priority chain.

use log::debug;

use crate::bus::MemoryBus;
use crate::constants::{IF_IE_MASK, INTERRUPT_VECTORS};
use crate::cpu::Cpu;

/// Runs after every instruction. Returns the bit index of the interrupt
/// serviced, if any.
pub(crate) fn handle_interrupts(cpu: &mut Cpu, bus: &mut dyn MemoryBus) -> Option<u8> {
    if !cpu.ime {
        return None;
    }

    let pending = bus.read_if() & bus.read_ie() & IF_IE_MASK;
    if pending == 0 {
        return None;
    }

    let bit = pending.trailing_zeros() as u8;
    let (_, vector) = INTERRUPT_VECTORS
        .iter()
        .find(|(b, _)| *b == bit)
        .copied()
        .expect("pending bit is always one of the five defined interrupt sources");

    debug!("servicing interrupt bit {bit} -> vector 0x{vector:04X}");

    cpu.ime = false;
    bus.write_if(bus.read_if() & !(1 << bit));
    cpu.push16(bus, cpu.pc);
    cpu.pc = vector;

    Some(bit)
}
