//! Find and replace string constants inside precompiled Lua 5.2 chunks.

pub mod error;
pub mod job;
pub mod parser;
pub mod patcher;
pub mod script;

pub use error::{PatchError, RecordFault, Result};
pub use parser::BytecodeContainer;
pub use patcher::{Patch, StringPatcher};
