//! drivecat — offline catalog for slow drives.
//!
//! Thin binary entry point: argument parsing, logging setup, and output
//! formatting. All engine logic lives in the `drivecat-core` crate.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

use drivecat_core::analysis::{duplicate_groups, largest_directories, largest_files};
use drivecat_core::model::{format_mtime, format_size};
use drivecat_core::passes::{aggregate, cleanup, hash, index, PassSummary};
use drivecat_core::store::FileStore;

#[derive(Parser)]
#[command(name = "drivecat")]
#[command(about = "Index file metadata and content hashes into SQLite, then analyze offline")]
#[command(after_help = "\
TYPICAL SESSION:
  drivecat index /mnt/archive        # mirror metadata into files.db
  drivecat hash                      # compute content hashes (slow, resumable)
  drivecat cleanup /mnt/archive      # drop records for deleted paths
  drivecat aggregate /mnt/archive    # recompute directory sizes
  drivecat duplicates                # what can be deleted?
  drivecat largest --dirs            # what is eating the drive?")]
struct Cli {
    /// Path to the catalog database. Created if it does not exist.
    #[arg(short, long, global = true, default_value = "files.db")]
    database: PathBuf,

    /// Print how long the command took.
    #[arg(short, long, global = true)]
    time: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index files and directories under a path. Does not compute hashes.
    Index {
        /// Root of the tree to index.
        path: PathBuf,
    },
    /// Compute content hashes for every file that needs one. Slow; safe
    /// to interrupt and re-run.
    Hash,
    /// Remove records whose path no longer exists under the given root.
    Cleanup {
        /// Root of the stored subtree to sweep.
        path: PathBuf,
    },
    /// Recompute recursive directory sizes under the given root.
    Aggregate {
        /// Root of the stored subtree to aggregate.
        path: PathBuf,
    },
    /// Print statistics about the catalog.
    Stats {
        /// Emit JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
    /// List groups of files with identical content, most wasteful first.
    Duplicates {
        /// Maximum number of groups to report.
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
        /// Write the groups to a CSV file instead of stdout.
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// List the largest files (or directories) in the catalog.
    Largest {
        /// Rank directories by aggregated size instead of files.
        #[arg(long)]
        dirs: bool,
        /// Maximum number of entries to report.
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
        /// Write the listing to a CSV file instead of stdout.
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so CSV/JSON output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = FileStore::open(&cli.database)
        .with_context(|| format!("failed to open catalog {}", cli.database.display()))?;

    let start = Instant::now();
    let label = run(&cli.command, &store)?;

    if cli.time {
        println!("\"{label}\" took {:.3}s", start.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Dispatch one subcommand; returns the label used by `--time`.
fn run(command: &Command, store: &FileStore) -> anyhow::Result<String> {
    match command {
        Command::Index { path } => {
            let summary = index(store, path)?;
            print_summary("indexed", &summary);
            Ok(format!("index {}", path.display()))
        }
        Command::Hash => {
            let summary = hash(store)?;
            print_summary("hashed", &summary);
            Ok("hash".to_string())
        }
        Command::Cleanup { path } => {
            let summary = cleanup(store, path)?;
            print_summary("checked", &summary);
            Ok(format!("cleanup {}", path.display()))
        }
        Command::Aggregate { path } => {
            let summary = aggregate(store, path)?;
            print_summary("aggregated", &summary);
            Ok(format!("aggregate {}", path.display()))
        }
        Command::Stats { json } => {
            let stats = store.stats()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total records  {}", stats.total_records);
                println!("Files          {}", stats.files);
                println!("Files hashed   {}", stats.files_hashed);
                println!("Directories    {}", stats.directories);
                println!("Total size     {}", format_size(stats.total_file_size));
            }
            Ok("stats".to_string())
        }
        Command::Duplicates { limit, csv } => {
            let groups = duplicate_groups(store, *limit)?;
            match csv {
                Some(path) => write_duplicates_csv(path, &groups)?,
                None => {
                    for group in &groups {
                        println!(
                            "{} copies of {} ({} wasted)",
                            group.paths.len(),
                            format_size(group.size),
                            format_size(group.wasted_bytes()),
                        );
                        for p in &group.paths {
                            println!("  {p}");
                        }
                    }
                    if groups.is_empty() {
                        println!("No duplicates found. Have you run `drivecat hash`?");
                    }
                }
            }
            Ok("duplicates".to_string())
        }
        Command::Largest { dirs, limit, csv } => {
            let entries = if *dirs {
                largest_directories(store, *limit)?
            } else {
                largest_files(store, *limit)?
            };
            match csv {
                Some(path) => write_largest_csv(path, &entries)?,
                None => {
                    for entry in &entries {
                        println!(
                            "{:>10}  {}  {}",
                            format_size(entry.size),
                            format_mtime(entry.modified_at),
                            entry.path
                        );
                    }
                }
            }
            Ok("largest".to_string())
        }
    }
}

fn print_summary(verb: &str, summary: &PassSummary) {
    println!(
        "{verb} {} entries ({} changed, {} skipped)",
        summary.processed, summary.changed, summary.skipped
    );
}

fn write_duplicates_csv(
    path: &Path,
    groups: &[drivecat_core::analysis::DuplicateGroup],
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(["hash", "size", "path"])?;
    for group in groups {
        for p in &group.paths {
            writer.write_record([group.hash.as_str(), &group.size.to_string(), p])?;
        }
    }
    writer.flush()?;
    println!("wrote {} groups to {}", groups.len(), path.display());
    Ok(())
}

fn write_largest_csv(
    path: &Path,
    entries: &[drivecat_core::analysis::LargestEntry],
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(["path", "size"])?;
    for entry in entries {
        writer.write_record([entry.path.as_str(), &entry.size.to_string()])?;
    }
    writer.flush()?;
    println!("wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}
