/// Size of the memory image: 1 MiB, addresses 0x00000 through 0xFFFFF.
pub const MEMORY_SIZE: usize = 0x100000;

pub const ADDRESS_MIN: u32 = 0x00000;
pub const ADDRESS_MAX: u32 = 0xFFFFF;

/// A machine word is three bytes.
pub const WORD_BYTES: u32 = 3;
pub const WORD_MASK: u32 = 0xFF_FFFF;

/// The opcode proper occupies the high six bits of the first byte.
pub const OPCODE_MASK: u8 = 0xFC;

pub const FLAG_N: u8 = 0x02; // first byte
pub const FLAG_I: u8 = 0x01; // first byte
pub const FLAG_X: u8 = 0x80; // second byte
pub const FLAG_B: u8 = 0x40; // second byte
pub const FLAG_P: u8 = 0x20; // second byte
pub const FLAG_E: u8 = 0x10; // second byte

/// Range of the signed 12-bit displacement of a format 3 instruction.
pub const PC_DISP_MIN: i32 = -2048;
pub const PC_DISP_MAX: i32 = 2047;

/// Range of the unsigned 12-bit base-relative displacement.
pub const BASE_DISP_MAX: u32 = 4095;

/// A format 4 address field holds five nibbles, i.e. 20 bits.
pub const ADDR_FIELD_NIBBLES: u32 = 5;

pub const REGISTER_FILE_LEN: usize = 10;
