pub mod locator;

use log::{debug, warn};

use crate::error::{PatchError, RecordFault, Result};
use crate::parser::{BytecodeContainer, ConstantTag, Endianness, Header, encode_int};
use locator::{find_next_match, locate_record, record_text, validate_framing};

/// One find/replace pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub find: String,
    pub replacement: String,
}

impl Patch {
    pub fn new(find: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replacement: replacement.into(),
        }
    }
}

/// Result of one pass over a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub body: Vec<u8>,
    pub count: usize,
}

/// Rewrites string records in a body, using the framing of a given header.
#[derive(Debug, Clone, Copy)]
pub struct StringPatcher {
    size_size_t: usize,
    endianness: Endianness,
}

impl StringPatcher {
    pub fn new(header: &Header) -> Self {
        Self {
            size_size_t: usize::from(header.size_size_t),
            endianness: header.endianness,
        }
    }

    /// Replace `find` with `replacement` in every string record containing it.
    ///
    /// Every occurrence inside a matched record is replaced, not only the one
    /// that located it.
    ///
    /// The scan resumes after the original terminator of each rewritten
    /// record, so replacement text is never searched again. Any malformed
    /// record aborts the whole pass.
    pub fn replace(&self, body: &[u8], find: &str, replacement: &str) -> Result<PatchOutcome> {
        if find.is_empty() {
            return Err(PatchError::EmptyFind);
        }

        let mut out = Vec::with_capacity(body.len());
        let mut cursor = 0;
        let mut count = 0;

        while let Some(pos) = find_next_match(body, find.as_bytes(), cursor) {
            debug!("Found '{find}' at {pos}");

            let span = locate_record(body, pos)?;
            validate_framing(body, span, self.size_size_t, self.endianness)?;
            let tag_offset = span.start - self.size_size_t - 1;
            if tag_offset < cursor {
                return Err(PatchError::MalformedRecord {
                    offset: span.start,
                    fault: RecordFault::MissingTypeTag,
                });
            }
            let original = record_text(body, span)?;

            let text = original.replace(find, replacement);
            out.extend_from_slice(&body[cursor..tag_offset]);
            self.write_record(&mut out, &text);
            count += 1;
            cursor = span.end + 1;
        }

        out.extend_from_slice(&body[cursor..]);

        Ok(PatchOutcome { body: out, count })
    }

    /// Apply `patch` to the container body in place, returning the replacement count.
    ///
    /// The body is left untouched when the pass fails.
    pub fn apply(&self, container: &mut BytecodeContainer, patch: &Patch) -> Result<usize> {
        let outcome = self.replace(container.body(), &patch.find, &patch.replacement)?;
        container.set_body(outcome.body);
        Ok(outcome.count)
    }

    fn write_record(&self, out: &mut Vec<u8>, text: &str) {
        let len = text.len() as u64 + 1;
        if self.size_size_t < 8 && len >> (8 * self.size_size_t) != 0 {
            warn!("string of {len} bytes does not fit a {}-byte length", self.size_size_t);
        }

        out.push(ConstantTag::String as u8);
        out.extend(encode_int(len, self.size_size_t, self.endianness));
        out.extend_from_slice(text.as_bytes());
        out.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decode_int;

    const HEADER: [u8; 12] = [0x1B, 0x4C, 0x75, 0x61, 0x52, 0x00, 0x01, 0x04, 0x04, 0x04, 0x08, 0x00];

    fn record(text: &str) -> Vec<u8> {
        let mut out = vec![0x04];
        out.extend_from_slice(&(text.len() as u32 + 1).to_le_bytes());
        out.extend_from_slice(text.as_bytes());
        out.push(0);
        out
    }

    fn container(body: &[u8]) -> BytecodeContainer {
        let mut data = HEADER.to_vec();
        data.extend_from_slice(body);
        BytecodeContainer::parse(&data).unwrap()
    }

    fn patcher() -> StringPatcher {
        StringPatcher::new(container(&[]).header())
    }

    #[test]
    fn replaces_single_record() {
        let body = record("cat");
        let outcome = patcher().replace(&body, "cat", "dog").unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.body, vec![0x04, 0x04, 0x00, 0x00, 0x00, 0x64, 0x6F, 0x67, 0x00]);
    }

    #[test]
    fn replaces_with_eight_byte_size_t() {
        let mut data = HEADER.to_vec();
        data[8] = 0x08;
        data.extend_from_slice(&[0x04, 0x04, 0, 0, 0, 0, 0, 0, 0, b'c', b'a', b't', 0x00]);
        let container = BytecodeContainer::parse(&data).unwrap();

        let outcome = StringPatcher::new(container.header())
            .replace(container.body(), "cat", "dog")
            .unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.body, vec![0x04, 0x04, 0, 0, 0, 0, 0, 0, 0, 0x64, 0x6F, 0x67, 0x00]);
    }

    #[test]
    fn resizes_record_and_keeps_surroundings() {
        let mut body = vec![0x24, 0x00, 0x01];
        body.extend(record("hello world"));
        body.extend([0x08, 0x00, 0x00]);

        let outcome = patcher().replace(&body, "world", "there, friend").unwrap();

        let mut expected = vec![0x24, 0x00, 0x01];
        expected.extend(record("hello there, friend"));
        expected.extend([0x08, 0x00, 0x00]);
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.body, expected);
    }

    #[test]
    fn new_length_prefix_matches_content() {
        let body = record("short");
        let outcome = patcher().replace(&body, "short", "a much longer string").unwrap();

        let declared = decode_int(&outcome.body[1..5], Endianness::Little);
        let content = &outcome.body[5..outcome.body.len() - 1];
        assert_eq!(declared, content.len() as u64 + 1);
        assert_eq!(outcome.body.last(), Some(&0));
        assert!(!content.contains(&0));
    }

    #[test]
    fn replaces_every_occurrence_within_record() {
        let body = record("na na na");
        let outcome = patcher().replace(&body, "na", "la").unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.body, record("la la la"));
    }

    #[test]
    fn replaces_across_several_records() {
        let mut body = record("print");
        body.extend([0x01, 0x00]);
        body.extend(record("x print y"));

        let outcome = patcher().replace(&body, "print", "echo").unwrap();

        let mut expected = record("echo");
        expected.extend([0x01, 0x00]);
        expected.extend(record("x echo y"));
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.body, expected);
    }

    #[test]
    fn replacement_containing_find_is_not_rescanned() {
        let body = record("cat");
        let outcome = patcher().replace(&body, "a", "aa").unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.body, record("caat"));
    }

    #[test]
    fn identical_replacement_keeps_body() {
        let mut body = record("abc");
        body.extend(record("xabcx"));
        let outcome = patcher().replace(&body, "abc", "abc").unwrap();
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.body, body);
    }

    #[test]
    fn no_match_is_not_an_error() {
        let body = record("cat");
        let outcome = patcher().replace(&body, "dog", "cat").unwrap();
        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.body, body);
    }

    #[test]
    fn empty_find_is_rejected() {
        assert!(matches!(
            patcher().replace(&record("cat"), "", "x"),
            Err(PatchError::EmptyFind)
        ));
    }

    #[test]
    fn malformed_record_aborts_pass() {
        let mut body = record("good");
        let mut bad = record("bad");
        bad[0] = 0x03;
        body.extend(bad);

        let mut container = container(&body);
        let patch = Patch::new("o", "0");
        let err = patcher().apply(&mut container, &Patch::new("bad", "evil")).unwrap_err();
        assert!(matches!(
            err,
            PatchError::MalformedRecord { fault: RecordFault::TypeTag(3), .. }
        ));
        assert_eq!(container.body(), body.as_slice());

        assert_eq!(patcher().apply(&mut container, &patch).unwrap(), 1);
        assert_eq!(&container.body()[..10], record("g00d").as_slice());
    }

    #[test]
    fn partial_match_rewrites_whole_record() {
        let mut body = record("cat");
        body.extend(record("concat"));

        let outcome = patcher().replace(&body, "cat", "dog").unwrap();

        let mut expected = record("dog");
        expected.extend(record("condog"));
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.body, expected);
    }

    #[test]
    fn apply_updates_container() {
        let mut container = container(&record("cat"));
        let count = patcher().apply(&mut container, &Patch::new("cat", "tiger")).unwrap();
        assert_eq!(count, 1);

        let out = container.serialize();
        assert_eq!(&out[..12], &HEADER[..]);
        assert_eq!(&out[12..], record("tiger").as_slice());
    }
}
