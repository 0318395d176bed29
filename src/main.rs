//! LCF CLI - convert LCF game data files to and from JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;
use walkdir::WalkDir;

use lcf::codec::schema::signatures;
use lcf::prelude::*;

#[derive(Parser)]
#[command(name = "lcf")]
#[command(about = "Convert LCF game data files to and from JSON", long_about = None)]
struct Cli {
    /// Codepage used for strings (e.g. 1252, 932, shift_jis)
    #[arg(long, global = true, env = "LCF_CODEPAGE")]
    codepage: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an LCF file to JSON
    ToJson {
        /// Input LCF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },

    /// Convert JSON produced by to-json back to an LCF file
    FromJson {
        /// Input JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output LCF file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the layout of an LCF file
    Info {
        /// Input LCF file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check that a file survives a JSON round trip byte for byte
    Verify {
        /// Input LCF file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Convert every LCF file under a directory to JSON
    ConvertDir {
        /// Input directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// File name filter (glob pattern, e.g. "*.lmu")
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Some(label) = &cli.codepage {
        let encoding = set_codepage(label).with_context(|| format!("Invalid codepage '{}'", label))?;
        tracing::info!(codepage = encoding.name(), "using codepage");
    }

    match cli.command {
        Commands::ToJson {
            input,
            output,
            pretty,
        } => cmd_to_json(&input, output.as_deref(), pretty),
        Commands::FromJson { input, output } => cmd_from_json(&input, &output),
        Commands::Info { input } => cmd_info(&input),
        Commands::Verify { input } => cmd_verify(&input),
        Commands::ConvertDir {
            input,
            output,
            filter,
        } => cmd_convert_dir(&input, &output, filter.as_deref()),
    }
}

fn open_valid(path: &Path) -> Result<LcfFile> {
    let file = open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if !file.valid() {
        bail!("{}: {}", path.display(), file.error());
    }
    Ok(file)
}

fn render_json(file: &LcfFile, pretty: bool) -> Result<String> {
    let value = serde_json::Value::from(to_json(file)?);
    let text = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(text)
}

fn cmd_to_json(input: &Path, output: Option<&Path>, pretty: bool) -> Result<()> {
    let start = Instant::now();
    let file = open_valid(input)?;
    let text = render_json(&file, pretty)
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    match output {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote {} ({} bytes) in {:.2?}",
                path.display(),
                text.len(),
                start.elapsed()
            );
        }
        None => println!("{}", text),
    }

    Ok(())
}

fn cmd_from_json(input: &Path, output: &Path) -> Result<()> {
    let start = Instant::now();
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let bytes = to_bytes(&Value::from(json))
        .with_context(|| format!("Failed to encode {}", input.display()))?;
    fs::write(output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} ({} bytes) in {:.2?}",
        output.display(),
        bytes.len(),
        start.elapsed()
    );
    Ok(())
}

fn cmd_info(input: &Path) -> Result<()> {
    let file = open(input).with_context(|| format!("Failed to open {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Size: {} bytes", file.stream().len());
    println!("Signature: {}", file.signature());

    if !file.valid() {
        println!("Invalid: {}", file.error());
        println!("Known signatures: {}", signatures().join(", "));
        return Ok(());
    }

    println!("Roots: {}", file.roots().len());
    for (i, root) in file.roots().iter().enumerate() {
        let data_type = root.data_type()?;
        let detail = match data_type {
            DataType::Array1d => format!("{} fields", root.a1d()?.len()),
            DataType::Array2d => format!("{} rows", root.a2d()?.len()),
            DataType::MapTree => format!("{} nodes", root.map_tree()?.nodes.len()),
            _ => String::new(),
        };
        println!(
            "  [{}] {:<12} {:<10} offset {:>8}  len {:>8}  {}",
            i,
            root.label(),
            data_type.name(),
            root.offset(),
            root.len(),
            detail
        );
    }

    if file.trailing_bytes() > 0 {
        println!("Trailing: {} bytes", file.trailing_bytes());
    }

    Ok(())
}

fn cmd_verify(input: &Path) -> Result<()> {
    let start = Instant::now();
    let original = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let file = LcfFile::from_bytes(original.clone())
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    if !file.valid() {
        bail!("{}: {}", input.display(), file.error());
    }

    let value = to_json(&file)?;
    let rebuilt = to_bytes(&value)?;

    if rebuilt == original {
        println!(
            "OK: {} ({} bytes) round-trips in {:.2?}",
            input.display(),
            original.len(),
            start.elapsed()
        );
        return Ok(());
    }

    let first_diff = original
        .iter()
        .zip(&rebuilt)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| original.len().min(rebuilt.len()));
    bail!(
        "{}: round trip differs at offset {:#x} (original {} bytes, rebuilt {} bytes)",
        input.display(),
        first_diff,
        original.len(),
        rebuilt.len()
    )
}

fn cmd_convert_dir(input: &Path, output: &Path, filter: Option<&str>) -> Result<()> {
    let start = Instant::now();
    let pattern = filter
        .map(glob::Pattern::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| match &pattern {
            Some(pattern) => pattern.matches(&entry.file_name().to_string_lossy()),
            None => true,
        })
        .map(|entry| entry.into_path())
        .collect();

    println!("Found {} files in {}", files.len(), input.display());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut converted = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for path in &files {
        match convert_one(input, output, path) {
            Ok(true) => converted += 1,
            Ok(false) => skipped += 1,
            Err(e) => {
                pb.suspend(|| eprintln!("Error: {:#}", e));
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    println!(
        "Converted {} files, skipped {}, failed {} in {:.2?}",
        converted,
        skipped,
        failed,
        start.elapsed()
    );

    if failed > 0 {
        bail!("{} files failed to convert", failed);
    }
    Ok(())
}

/// Convert one file; `Ok(false)` when it is not an LCF file we know.
fn convert_one(input: &Path, output: &Path, path: &Path) -> Result<bool> {
    let file = open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if !file.valid() {
        tracing::debug!(path = %path.display(), error = file.error(), "skipping");
        return Ok(false);
    }

    let text = render_json(&file, true)
        .with_context(|| format!("Failed to convert {}", path.display()))?;

    let relative = path.strip_prefix(input).unwrap_or(path);
    let mut target = output.join(relative).into_os_string();
    target.push(".json");
    let target = PathBuf::from(target);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&target, text).with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(true)
}
