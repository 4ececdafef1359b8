use std::io::Read;

use super::header::{Header, parse_header};
use crate::error::{PatchError, Result};

/// A loaded precompiled chunk: the verbatim header bytes plus the body.
///
/// The body is kept opaque; only string records inside it are ever touched.
#[derive(Debug, Clone)]
pub struct BytecodeContainer {
    header: Header,
    header_bytes: Vec<u8>,
    body: Vec<u8>,
}

impl BytecodeContainer {
    /// Split `data` into a validated header and the remaining body.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (body, header) = parse_header(data)?;
        let header_len = data.len() - body.len();

        Ok(Self {
            header,
            header_bytes: data[..header_len].to_vec(),
            body: body.to_vec(),
        })
    }

    /// Read a whole chunk from `reader`.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse(&data)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replace the body, e.g. with the output of a patch pass.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Total size of header and body in bytes.
    pub fn size(&self) -> usize {
        self.header_bytes.len() + self.body.len()
    }

    /// Header bytes followed by the current body.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.extend_from_slice(&self.header_bytes);
        out.extend_from_slice(&self.body);
        out
    }
}

impl TryFrom<&[u8]> for BytecodeContainer {
    type Error = PatchError;

    fn try_from(data: &[u8]) -> Result<Self> {
        Self::parse(data)
    }
}
