use num_enum::TryFromPrimitive;

/// Signature every precompiled chunk starts with (ESC "Lua")
pub const MAGIC_NUMBER: &[u8] = b"\x1BLua";

/// Version byte of the PUC-Rio 5.2 format this tool is tested against
pub const EXPECTED_VERSION: u8 = 0x52;

/// Length of the header this tool reads: signature, version pair, system parameters
pub const HEADER_SIZE: usize = 12;

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    /// Maps a raw flag to a byte order: 0 is big endian, anything else little endian.
    pub const fn from_flag(flag: u8) -> Self {
        match flag {
            0 => Endianness::Big,
            _ => Endianness::Little,
        }
    }
}

/// Type tags of the constants stored in a function's constant list
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ConstantTag {
    Nil = 0,
    Boolean = 1,
    Number = 3,
    String = 4,
}
