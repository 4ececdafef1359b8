use super::constants::{EXPECTED_VERSION, Endianness, HEADER_SIZE, MAGIC_NUMBER};
use crate::error::{PatchError, Result};
use log::{debug, info, warn};
use nom::{
    IResult, Parser,
    bytes::complete::{tag, take},
    combinator::map,
    error::context,
    number::complete::u8,
};

/// Only little endian chunks are supported
const LITTLE_ENDIAN_FLAG: u8 = 1;

/// Header metadata describing the bytecode format and target architecture
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: u8,            // Lua version, major in high nibble (0x52 for Lua 5.2)
    pub format: u8,             // Bytecode format (0 for official Lua bytecode)
    pub endianness: Endianness, // Byte order of multi-byte fields
    pub size_int: u8,           // Size of an integer in bytes
    pub size_size_t: u8,        // Size of a size_t value, the width of string length prefixes
    pub size_instruction: u8,   // Size of an instruction in bytes
    pub size_number: u8,        // Size of a number in bytes

    /// Whether numbers (constants) are stored as integers (`true`) or floats (`false`)
    pub integral_flag: bool,
}

impl Header {
    pub const fn version_major(&self) -> u8 {
        self.version >> 4
    }

    pub const fn version_minor(&self) -> u8 {
        self.version & 0x0F
    }
}

/// Parsing functions module
mod parsers {
    use super::*;

    pub fn parse_magic_number(input: &[u8]) -> IResult<&[u8], &[u8]> {
        context("invalid magic number", tag(MAGIC_NUMBER)).parse(input)
    }

    pub fn parse_version_pair(input: &[u8]) -> IResult<&[u8], (u8, u8)> {
        let (input, version) = u8(input)?;
        let (input, format) = u8(input)?;
        Ok((input, (version, format)))
    }

    pub fn parse_system_parameters(input: &[u8]) -> IResult<&[u8], [u8; 6]> {
        map(take(6usize), |b: &[u8]| {
            let mut params = [0u8; 6];
            params.copy_from_slice(b);
            params
        })
        .parse(input)
    }
}

use parsers::*;

/// Parse and validate the header of a precompiled chunk.
///
/// Returns the remaining input (the body) together with the decoded header.
pub fn parse_header(input: &[u8]) -> Result<(&[u8], Header)> {
    let truncated = |_| PatchError::TruncatedHeader { len: input.len() };

    let (rest, _) = parse_magic_number(input).map_err(|_| PatchError::NotLuaFile {
        found: input.iter().take(MAGIC_NUMBER.len()).copied().collect(),
    })?;

    let (rest, (version, format)) = parse_version_pair(rest).map_err(truncated)?;
    info!("Lua {}.{} detected", version >> 4, version & 0x0F);
    if format != 0 {
        return Err(PatchError::UnsupportedVersion { reserved: format });
    }
    if version != EXPECTED_VERSION {
        warn!("untested Lua version {version:#04x}, continuing anyway");
    }

    let (rest, params) = parse_system_parameters(rest).map_err(truncated)?;
    let [endian_flag, size_int, size_size_t, size_instruction, size_number, integral] = params;
    info!(
        "Lua settings: endian {endian_flag}, int {size_int}, size_t {size_size_t}, \
         instruction {size_instruction}, number {size_number}"
    );
    if endian_flag != LITTLE_ENDIAN_FLAG {
        return Err(PatchError::UnsupportedEndianness { flag: endian_flag });
    }

    let header = Header {
        version,
        format,
        endianness: Endianness::from_flag(endian_flag),
        size_int,
        size_size_t,
        size_instruction,
        size_number,
        integral_flag: integral != 0,
    };
    debug_assert_eq!(input.len() - rest.len(), HEADER_SIZE);

    debug!("Parsed header: {:#?}", header);

    Ok((rest, header))
}
