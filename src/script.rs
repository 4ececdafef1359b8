use std::path::PathBuf;

use log::debug;
use nom::{
    IResult, Parser,
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::{all_consuming, rest},
    sequence::{delimited, separated_pair},
};
use thiserror::Error;

use crate::job::default_output_path;
use crate::patcher::Patch;

/// One input/output file pair and the patches applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub patches: Vec<Patch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptErrorKind {
    #[error("line is outside of a [section]")]
    MissingSection,

    #[error("find string must not be empty")]
    EmptyFind,

    #[error("malformed find line, expected '< text'")]
    MalformedFind,

    #[error("malformed replace line, expected '> text'")]
    MalformedReplace,

    #[error("replace line without a preceding find line")]
    ReplaceWithoutFind,

    #[error("find string has no replace line")]
    MissingReplacement,

    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("key '{0}' has no value")]
    EmptyValue(String),

    #[error("expected '[section]', '< find', '> replace' or 'key = value'")]
    UnrecognizedLine,

    #[error("section [{0}] has no input file")]
    MissingInput(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ScriptError {
    pub line: usize,
    pub kind: ScriptErrorKind,
}

/// Every problem found in a script; nothing is applied when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error(s) in patch script", .0.len())]
pub struct ScriptErrors(pub Vec<ScriptError>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Comment,
    SectionHeader(&'a str),
    Find(&'a str),
    Replace(&'a str),
    KeyValue(&'a str, &'a str),
}

/// Line parsers
mod parsers {
    use super::*;

    pub fn section_header(input: &str) -> IResult<&str, &str> {
        all_consuming(delimited(char('['), take_until("]"), char(']'))).parse(input)
    }

    pub fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
        separated_pair(
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            delimited(space0, char('='), space0),
            rest,
        )
        .parse(input)
    }

    /// Text after a `<` or `>` marker: nothing, or one space then the text.
    pub fn marker_text(after_marker: &str) -> Option<&str> {
        if after_marker.is_empty() {
            Some("")
        } else {
            after_marker.strip_prefix(' ')
        }
    }
}

use parsers::*;

fn classify_line(line: &str) -> Result<Line<'_>, ScriptErrorKind> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Line::Blank);
    }
    if trimmed.starts_with('#') {
        return Ok(Line::Comment);
    }

    let line = line.trim_start();
    if let Some(after) = line.strip_prefix('<') {
        return marker_text(after)
            .map(Line::Find)
            .ok_or(ScriptErrorKind::MalformedFind);
    }
    if let Some(after) = line.strip_prefix('>') {
        return marker_text(after)
            .map(Line::Replace)
            .ok_or(ScriptErrorKind::MalformedReplace);
    }
    if let Ok((_, name)) = section_header(trimmed) {
        return Ok(Line::SectionHeader(name.trim()));
    }
    if let Ok((_, (key, value))) = key_value(trimmed) {
        return Ok(Line::KeyValue(key, value.trim_end()));
    }

    Err(ScriptErrorKind::UnrecognizedLine)
}

#[derive(Debug)]
struct SectionDraft {
    name: String,
    line: usize,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    patches: Vec<Patch>,
}

impl SectionDraft {
    fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_owned(),
            line,
            input: None,
            output: None,
            patches: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct PatchDraft {
    find: String,
    replacement: Option<String>,
    line: usize,
}

#[derive(Debug)]
enum State {
    NoSection,
    InSection(SectionDraft),
    AfterFind(SectionDraft, PatchDraft),
}

struct ScriptParser {
    sections: Vec<SectionDraft>,
    errors: Vec<ScriptError>,
}

impl ScriptParser {
    fn error(&mut self, line: usize, kind: ScriptErrorKind) {
        self.errors.push(ScriptError { line, kind });
    }

    /// Finish a pending patch and hand back its section.
    fn close_patch(&mut self, mut section: SectionDraft, patch: PatchDraft) -> SectionDraft {
        match patch.replacement {
            Some(replacement) => section.patches.push(Patch {
                find: patch.find,
                replacement,
            }),
            None => self.error(patch.line, ScriptErrorKind::MissingReplacement),
        }
        section
    }

    /// Current section with any pending patch closed, if inside one.
    fn settle(&mut self, state: State) -> Option<SectionDraft> {
        match state {
            State::NoSection => None,
            State::InSection(section) => Some(section),
            State::AfterFind(section, patch) => Some(self.close_patch(section, patch)),
        }
    }

    fn step(&mut self, state: State, line_no: usize, line: Line<'_>) -> State {
        match line {
            Line::Blank | Line::Comment => state,

            Line::SectionHeader(name) => {
                if let Some(section) = self.settle(state) {
                    self.sections.push(section);
                }
                State::InSection(SectionDraft::new(name, line_no))
            }

            Line::Find(find) => {
                let Some(section) = self.settle(state) else {
                    self.error(line_no, ScriptErrorKind::MissingSection);
                    return State::NoSection;
                };
                if find.is_empty() {
                    self.error(line_no, ScriptErrorKind::EmptyFind);
                    return State::InSection(section);
                }
                let patch = PatchDraft {
                    find: find.to_owned(),
                    replacement: None,
                    line: line_no,
                };
                State::AfterFind(section, patch)
            }

            Line::Replace(text) => match state {
                State::NoSection => {
                    self.error(line_no, ScriptErrorKind::MissingSection);
                    State::NoSection
                }
                State::InSection(section) => {
                    self.error(line_no, ScriptErrorKind::ReplaceWithoutFind);
                    State::InSection(section)
                }
                State::AfterFind(section, mut patch) => {
                    patch.replacement = Some(match patch.replacement.take() {
                        Some(previous) => format!("{previous}\n{text}"),
                        None => text.to_owned(),
                    });
                    State::AfterFind(section, patch)
                }
            },

            Line::KeyValue(key, value) => {
                let Some(mut section) = self.settle(state) else {
                    self.error(line_no, ScriptErrorKind::MissingSection);
                    return State::NoSection;
                };
                let slot = match key {
                    "in" => &mut section.input,
                    "out" => &mut section.output,
                    _ => {
                        self.error(line_no, ScriptErrorKind::UnknownKey(key.to_owned()));
                        return State::InSection(section);
                    }
                };
                if value.is_empty() {
                    self.error(line_no, ScriptErrorKind::EmptyValue(key.to_owned()));
                } else if slot.is_some() {
                    self.error(line_no, ScriptErrorKind::DuplicateKey(key.to_owned()));
                } else {
                    *slot = Some(PathBuf::from(value));
                }
                State::InSection(section)
            }
        }
    }
}

/// Parse a patch script into its sections.
///
/// The whole text is checked before anything is returned, so a script with
/// any error yields every error found and no sections.
pub fn parse_script(text: &str) -> Result<Vec<Section>, ScriptErrors> {
    let mut parser = ScriptParser {
        sections: Vec::new(),
        errors: Vec::new(),
    };
    let mut state = State::NoSection;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        state = match classify_line(raw) {
            Ok(line) => parser.step(state, line_no, line),
            Err(kind) => {
                parser.error(line_no, kind);
                state
            }
        };
    }
    if let Some(section) = parser.settle(state) {
        parser.sections.push(section);
    }

    let mut sections = Vec::with_capacity(parser.sections.len());
    for draft in std::mem::take(&mut parser.sections) {
        let Some(input) = draft.input else {
            parser.error(draft.line, ScriptErrorKind::MissingInput(draft.name));
            continue;
        };
        let output = draft.output.unwrap_or_else(|| default_output_path(&input));
        sections.push(Section {
            name: draft.name,
            input,
            output,
            patches: draft.patches,
        });
    }

    if !parser.errors.is_empty() {
        parser.errors.sort_by_key(|e| e.line);
        return Err(ScriptErrors(parser.errors));
    }

    debug!("Parsed patch script: {:#?}", sections);

    Ok(sections)
}
