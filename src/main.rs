//! Veles CLI - command-line tool for indexing game asset archives.
//!
//! This is the main entry point for the Veles command-line application.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use veles::prelude::*;

/// Veles - game asset archive indexer
#[derive(Parser)]
#[command(name = "veles")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the unified catalog and print the final listing
    List {
        /// Input archives, loose files, or directories (scanned recursively)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Candidate decryption key: ASCII string, 0x-prefixed hex, or @keyfile
        #[arg(short = 'k', long = "aes", value_name = "KEY")]
        aes: Vec<String>,

        /// Show sizes, package flags, and classification counts
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print one directory/filename line per catalogued record
    Dump {
        /// Input archives, loose files, or directories (scanned recursively)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Candidate decryption key: ASCII string, 0x-prefixed hex, or @keyfile
        #[arg(short = 'k', long = "aes", value_name = "KEY")]
        aes: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            inputs,
            aes,
            detailed,
        } => cmd_list(&inputs, &aes, detailed),
        Commands::Dump { inputs, aes } => cmd_dump(&inputs, &aes),
    }
}

fn cmd_list(inputs: &[PathBuf], aes: &[String], detailed: bool) -> Result<()> {
    let result = run_merge(inputs, aes)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for row in result.rows() {
        let path = if row.directory.is_empty() {
            row.filename.to_string()
        } else {
            format!("{}/{}", row.directory, row.filename)
        };
        if detailed {
            let kind = if row.is_package { "pkg" } else { "   " };
            write!(out, "{:>12}  {kind}  {path}", row.size)?;
            if let Some(c) = row.classes {
                write!(
                    out,
                    "  [skel:{} stat:{} anim:{} tex:{}]",
                    c.skeletal_mesh, c.static_mesh, c.animation, c.texture
                )?;
            }
            writeln!(out)?;
        } else {
            writeln!(out, "{path}")?;
        }
    }
    Ok(())
}

fn cmd_dump(inputs: &[PathBuf], aes: &[String]) -> Result<()> {
    let result = run_merge(inputs, aes)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    result.dump(&mut out).context("failed to write listing")?;
    Ok(())
}

fn run_merge(inputs: &[PathBuf], aes: &[String]) -> Result<MergeResult> {
    let keys = build_key_ring(aes)?;
    let paths = collect_paths(inputs);
    if paths.is_empty() {
        anyhow::bail!("no input files found");
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("indexing {} input files", paths.len()));

    let start = Instant::now();
    let result = merge(&paths, &keys);
    spinner.finish_and_clear();

    eprintln!(
        "Indexed {} records from {} sources in {:?} ({} warnings)",
        result.catalog().len(),
        result.sources().len(),
        start.elapsed(),
        result.diagnostics.len()
    );
    Ok(result)
}

fn build_key_ring(args: &[String]) -> Result<KeyRing> {
    let mut keys = KeyRing::new();
    for arg in args {
        keys.add_arg(arg)
            .with_context(|| format!("invalid key argument \"{arg}\""))?;
    }
    Ok(keys)
}

/// Flatten the inputs into a candidate path list. Directories are walked
/// recursively; the merge itself decides what each file is.
fn collect_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    paths.push(entry.into_path());
                }
            }
        } else {
            paths.push(input.clone());
        }
    }
    paths
}
