use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{PatchError, Result};
use crate::parser::BytecodeContainer;
use crate::patcher::{Patch, StringPatcher};
use crate::script::Section;

/// Outcome of patching one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub replacements: usize,
    pub bytes_read: usize,
    /// `None` when nothing matched and no file was written
    pub bytes_written: Option<usize>,
}

/// `input` with `.patched` appended.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".patched");
    PathBuf::from(path)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PatchError + '_ {
    move |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn load(path: &Path) -> Result<BytecodeContainer> {
    let file = File::open(path).map_err(io_error(path))?;
    BytecodeContainer::from_reader(BufReader::new(file)).map_err(|err| match err {
        PatchError::Read(source) => io_error(path)(source),
        other => other,
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    PathBuf::from(partial)
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

/// Write `data` next to `path` first and move it into place once complete.
fn store(path: &Path, data: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    let written = write_file(&partial, data).and_then(|()| std::fs::rename(&partial, path));
    if let Err(source) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(io_error(path)(source));
    }
    Ok(())
}

/// Load `input`, apply `patches` in order and write the result to `output`.
///
/// The output is only written once every patch succeeded and at least one
/// string was replaced.
pub fn run_job(input: &Path, output: &Path, patches: &[Patch]) -> Result<JobReport> {
    info!("Processing {}", input.display());

    let mut container = load(input)?;
    let bytes_read = container.size();
    info!("{bytes_read} bytes read from file");

    let patcher = StringPatcher::new(container.header());
    let mut replacements = 0;
    for patch in patches {
        let count = patcher.apply(&mut container, patch)?;
        if count == 0 {
            warn!("'{}' not found, nothing to patch", patch.find);
        } else {
            info!("Updated {count} strings matching '{}'", patch.find);
        }
        replacements += count;
    }

    let bytes_written = if replacements == 0 {
        None
    } else {
        let data = container.serialize();
        store(output, &data)?;
        info!("{} bytes written to {}", data.len(), output.display());
        Some(data.len())
    };

    Ok(JobReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        replacements,
        bytes_read,
        bytes_written,
    })
}

/// Run one script section.
pub fn run_section(section: &Section) -> Result<JobReport> {
    run_job(&section.input, &section.output, &section.patches)
}
