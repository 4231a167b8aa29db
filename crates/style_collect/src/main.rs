//! `style_collect`: turn a JSON style document into a stylesheet.

use anyhow::{Context as _, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;
use style_collect::{Collected, collect_file, collect_str};

/// Collect CSS from a JSON style document.
#[derive(Parser, Debug)]
#[command(name = "style_collect")]
#[command(about = "Define style rules on a headless engine and print the stylesheet")]
struct Args {
    /// JSON style document; `-` reads standard input.
    #[arg(value_name = "PATH")]
    input: PathBuf,

    /// Write the stylesheet here instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also write the generated names as a JSON array.
    #[arg(long, value_name = "PATH")]
    names: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let collected = read(&args)?;
    if let Some(path) = &args.output {
        fs::write(path, &collected.css)
            .with_context(|| format!("writing stylesheet to {}", path.display()))?;
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(collected.css.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }
    if let Some(path) = &args.names {
        let json = serde_json::to_string_pretty(&collected.names)?;
        fs::write(path, json).with_context(|| format!("writing names to {}", path.display()))?;
    }
    Ok(())
}

fn read(args: &Args) -> Result<Collected> {
    if args.input.as_os_str() == "-" {
        let source = io::read_to_string(io::stdin()).context("reading standard input")?;
        collect_str(&source)
    } else {
        collect_file(&args.input)
    }
}
