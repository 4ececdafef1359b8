use nom::{IResult, Parser, bytes::complete::take_until};

use crate::error::{PatchError, RecordFault, Result};
use crate::parser::{ConstantTag, Endianness, decode_int};

/// Position of one string record's content inside a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    /// First content byte
    pub start: usize,
    /// NUL terminator
    pub end: usize,
}

impl RecordSpan {
    pub const fn content_len(&self) -> usize {
        self.end - self.start
    }
}

fn malformed(offset: usize, fault: RecordFault) -> PatchError {
    PatchError::MalformedRecord { offset, fault }
}

/// Offset of the next occurrence of `needle` in `body` at or after `from`.
pub fn find_next_match(body: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    let haystack = body.get(from..)?;
    let found: IResult<&[u8], &[u8]> = take_until(needle).parse(haystack);
    let (_, skipped) = found.ok()?;
    Some(from + skipped.len())
}

/// Walk outward from a match to the NUL bytes enclosing it.
///
/// Content bytes are assumed to never be zero.
pub fn locate_record(body: &[u8], match_offset: usize) -> Result<RecordSpan> {
    let start = body[..match_offset]
        .iter()
        .rposition(|&b| b == 0)
        .map(|nul| nul + 1)
        .ok_or_else(|| malformed(match_offset, RecordFault::UnboundedStart))?;

    let end = body[match_offset..]
        .iter()
        .position(|&b| b == 0)
        .map(|len| match_offset + len)
        .ok_or_else(|| malformed(match_offset, RecordFault::UnboundedEnd))?;

    Ok(RecordSpan { start, end })
}

/// Check the type tag and length prefix in front of `span`.
///
/// Returns the content length in bytes.
pub fn validate_framing(
    body: &[u8],
    span: RecordSpan,
    size_size_t: usize,
    endianness: Endianness,
) -> Result<usize> {
    let tag_offset = span
        .start
        .checked_sub(size_size_t + 1)
        .ok_or_else(|| malformed(span.start, RecordFault::MissingTypeTag))?;

    let tag = body[tag_offset];
    if !matches!(ConstantTag::try_from(tag), Ok(ConstantTag::String)) {
        return Err(malformed(tag_offset, RecordFault::TypeTag(tag)));
    }

    let declared = decode_int(&body[tag_offset + 1..span.start], endianness);
    let actual = span.content_len() as u64 + 1;
    if declared != actual {
        return Err(malformed(
            tag_offset,
            RecordFault::LengthMismatch { declared, actual },
        ));
    }

    Ok(span.content_len())
}

/// Content of a validated record as text.
pub fn record_text(body: &[u8], span: RecordSpan) -> Result<&str> {
    std::str::from_utf8(&body[span.start..span.end])
        .map_err(|_| malformed(span.start, RecordFault::NotUtf8))
}

#[cfg(test)]
mod tests {
    use super::*;

    // tag, 4 byte little endian length, "cat", NUL
    const CAT: [u8; 9] = [0x04, 0x04, 0x00, 0x00, 0x00, b'c', b'a', b't', 0x00];

    #[test]
    fn finds_matches_from_cursor() {
        let body = b"xxabxxab";
        assert_eq!(find_next_match(body, b"ab", 0), Some(2));
        assert_eq!(find_next_match(body, b"ab", 3), Some(6));
        assert_eq!(find_next_match(body, b"ab", 7), None);
        assert_eq!(find_next_match(body, b"ab", 100), None);
    }

    #[test]
    fn locates_enclosing_record() {
        let span = locate_record(&CAT, 6).unwrap();
        assert_eq!(span, RecordSpan { start: 5, end: 8 });
        assert_eq!(span.content_len(), 3);
    }

    #[test]
    fn validates_well_formed_record() {
        let span = locate_record(&CAT, 5).unwrap();
        assert_eq!(validate_framing(&CAT, span, 4, Endianness::Little).unwrap(), 3);
        assert_eq!(record_text(&CAT, span).unwrap(), "cat");
    }

    #[test]
    fn rejects_wrong_type_tag() {
        let mut body = CAT;
        body[0] = 0x03;
        let span = locate_record(&body, 5).unwrap();
        assert!(matches!(
            validate_framing(&body, span, 4, Endianness::Little),
            Err(PatchError::MalformedRecord { offset: 0, fault: RecordFault::TypeTag(3) })
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut body = CAT;
        body[1] = 0x07;
        let span = locate_record(&body, 5).unwrap();
        assert!(matches!(
            validate_framing(&body, span, 4, Endianness::Little),
            Err(PatchError::MalformedRecord {
                fault: RecordFault::LengthMismatch { declared: 7, actual: 4 },
                ..
            })
        ));
    }

    #[test]
    fn unbounded_scans_are_errors() {
        assert!(matches!(
            locate_record(b"cat\x00", 0),
            Err(PatchError::MalformedRecord { fault: RecordFault::UnboundedStart, .. })
        ));
        assert!(matches!(
            locate_record(b"\x00cat", 1),
            Err(PatchError::MalformedRecord { fault: RecordFault::UnboundedEnd, .. })
        ));
    }

    #[test]
    fn record_too_close_to_start_has_no_tag() {
        let body = [0x00, 0x00, b'c', 0x00];
        let span = locate_record(&body, 2).unwrap();
        assert!(matches!(
            validate_framing(&body, span, 4, Endianness::Little),
            Err(PatchError::MalformedRecord { fault: RecordFault::MissingTypeTag, .. })
        ));
    }

    #[test]
    fn binary_content_is_not_text() {
        let body = [0x04, 0x03, 0x00, 0x00, 0x00, 0xFF, b'a', 0x00];
        let span = locate_record(&body, 6).unwrap();
        validate_framing(&body, span, 4, Endianness::Little).unwrap();
        assert!(matches!(
            record_text(&body, span),
            Err(PatchError::MalformedRecord { fault: RecordFault::NotUtf8, .. })
        ));
    }
}
