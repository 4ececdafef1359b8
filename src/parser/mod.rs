pub mod codec;
pub mod constants;
pub mod container;
pub mod header;

pub use codec::{decode_int, encode_int};
pub use constants::{ConstantTag, Endianness};
pub use container::BytecodeContainer;
pub use header::{Header, parse_header};
