//! Flag bitmasks, interrupt-controller addresses, and opcode-space landmarks.

pub const FLAG_Z: u8 = 0b1000_0000;
pub const FLAG_N: u8 = 0b0100_0000;
pub const FLAG_H: u8 = 0b0010_0000;
pub const FLAG_C: u8 = 0b0001_0000;

pub const CB_PREFIX_OPCODE_BYTE: u8 = 0xCB;

/// Interrupt Flag register: pending, requested interrupts.
pub const ADDR_IF: u16 = 0xFF0F;
/// Interrupt Enable register.
pub const ADDR_IE: u16 = 0xFFFF;

pub const IF_IE_MASK: u8 = 0b0001_1111;

pub const ADDR_VEC_VBLANK: u16 = 0x0040;
pub const ADDR_VEC_LCD_STAT: u16 = 0x0048;
pub const ADDR_VEC_TIMER: u16 = 0x0050;
pub const ADDR_VEC_SERIAL: u16 = 0x0058;
pub const ADDR_VEC_JOYPAD: u16 = 0x0060;

/// Power-on register values (post-BIOS handoff), per the DMG bootstrap ROM.
pub const POWER_ON_A: u8 = 0x01;
pub const POWER_ON_F: u8 = 0xB0;
pub const POWER_ON_B: u8 = 0x00;
pub const POWER_ON_C: u8 = 0x13;
pub const POWER_ON_D: u8 = 0x00;
pub const POWER_ON_E: u8 = 0xD8;
pub const POWER_ON_H: u8 = 0x01;
pub const POWER_ON_L: u8 = 0x4D;
pub const POWER_ON_SP: u16 = 0xFFFE;
pub const POWER_ON_PC: u16 = 0x0100;

/// Interrupt bit index -> service vector, lowest bit serviced first.
pub const INTERRUPT_VECTORS: [(u8, u16); 5] = [
    (0, ADDR_VEC_VBLANK),
    (1, ADDR_VEC_LCD_STAT),
    (2, ADDR_VEC_TIMER),
    (3, ADDR_VEC_SERIAL),
    (4, ADDR_VEC_JOYPAD),
];
