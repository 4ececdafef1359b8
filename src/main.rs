use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use luastrpatch::job::{JobReport, default_output_path, run_job, run_section};
use luastrpatch::patcher::Patch;
use luastrpatch::script::parse_script;

/// Command-line arguments parser
#[derive(Parser, Debug)]
#[clap(
    version = "0.1.0",
    about = "Find and replace string constants in compiled Lua 5.2 files",
    arg_required_else_help = true
)]
struct Arguments {
    /// Lua bytecode file to patch
    #[clap(
        required_unless_present = "patch_file",
        value_name = "FILE",
        value_hint = clap::ValueHint::FilePath
    )]
    input: Option<PathBuf>,

    /// String to find
    #[clap(required_unless_present = "patch_file")]
    find: Option<String>,

    /// String to use as replacement
    #[clap(required_unless_present = "patch_file")]
    replace: Option<String>,

    /// Output file, defaults to the input file with `.patched` appended
    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Accepted for compatibility; substrings are always replaced
    #[clap(short, long)]
    #[allow(dead_code)]
    substr: bool,

    /// Apply every section of a patch script; other arguments are ignored
    #[clap(short = 'p', long, value_name = "SCRIPT", value_hint = clap::ValueHint::FilePath)]
    patch_file: Option<PathBuf>,
}

fn print_report(report: &JobReport, find: Option<&str>) {
    match report.bytes_written {
        Some(written) => {
            println!("Updated {} strings", report.replacements);
            println!("{} bytes written to {}", written, report.output.display());
        }
        None => match find {
            Some(find) => println!("'{find}' not found, nothing to patch"),
            None => println!("Nothing to patch in {}", report.input.display()),
        },
    }
}

fn run_direct(args: Arguments) -> Result<()> {
    let (Some(input), Some(find), Some(replace)) = (args.input, args.find, args.replace) else {
        bail!("an input file, a find string and a replacement are required");
    };
    let output = args.output.unwrap_or_else(|| default_output_path(&input));

    let patch = Patch::new(find, replace);
    let report = run_job(&input, &output, std::slice::from_ref(&patch))?;
    print_report(&report, Some(&patch.find));
    Ok(())
}

fn run_script(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read patch script {}", path.display()))?;

    let sections = match parse_script(&text) {
        Ok(sections) => sections,
        Err(errors) => {
            for error in &errors.0 {
                eprintln!("{}: {}", path.display(), error);
            }
            return Err(errors.into());
        }
    };
    info!("{} section(s) in {}", sections.len(), path.display());

    for section in &sections {
        let report = run_section(section)
            .with_context(|| format!("section [{}] failed", section.name))?;
        print_report(&report, None);
    }
    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Arguments::parse();

    let result = match args.patch_file.clone() {
        Some(script) => run_script(&script),
        None => run_direct(args),
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
