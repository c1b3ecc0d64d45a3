//! strata - A mount-based virtual filesystem.
//!
//! Usage:
//!   strata mounts                 List mounted modules
//!   strata ls home:///docs        List a directory
//!   strata cat home:///a.txt      Print a file
//!   strata cp SRC DEST            Copy between any two modules
//!   strata --help                 Show help
//!
//! Modules are read from `mounts.toml` in the strata config directory, or
//! from the file given with `--config`.

mod mounts;

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tracing_subscriber::EnvFilter;

use strata_core::{FileDescriptor, OperationOptions, ProgressSink, ScandirFilter, UploadFile};
use strata_ops::{TransferPlan, UploadRequest, Vfs};

use mounts::MountFile;

#[derive(Parser)]
#[command(
    name = "strata",
    version,
    about = "A mount-based virtual filesystem",
    long_about = "strata presents one set of file operations over every mounted module.\n\n\
                  Paths are module-qualified, for example `home:///docs/notes.txt`."
)]
struct Cli {
    /// Mount file (defaults to <config dir>/strata/mounts.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Replace existing destinations
    #[arg(long, global = true)]
    overwrite: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List mounted modules
    Mounts,

    /// List a directory
    Ls {
        dir: String,

        /// Include dot-prefixed entries
        #[arg(short, long)]
        all: bool,

        /// Only files whose MIME type starts with this prefix (repeatable)
        #[arg(short, long)]
        mime: Vec<String>,
    },

    /// Print a file to stdout
    Cat { file: String },

    /// Write stdin (or a host file) to a file
    Put {
        file: String,

        /// Host file to read instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Copy a file or directory
    Cp { source: String, destination: String },

    /// Move or rename a file or directory
    Mv { source: String, destination: String },

    /// Delete a file or directory
    Rm { file: String },

    /// Create a directory
    Mkdir { dir: String },

    /// Show file information
    Stat { file: String },

    /// Print a URL for a file
    Url { file: String },

    /// Search below a directory by file name
    Find {
        root: String,

        /// Glob, or a plain substring
        query: String,

        /// Stop after this many matches
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show free space of a module
    Df { root: String },

    /// Move a file or directory to the trash
    Trash { file: String },

    /// Restore a file or directory from the trash
    Untrash { file: String },

    /// Empty the trash (of the internal module unless a root is given)
    EmptyTrash { root: Option<String> },

    /// Upload host files into a directory
    Upload {
        /// Host files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Destination directory
        #[arg(short, long)]
        to: String,
    },

    /// Download a file to the host
    Download {
        file: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let vfs = MountFile::load(cli.config.as_deref())?.into_vfs()?;
    let options = OperationOptions {
        overwrite: cli.overwrite,
        ..Default::default()
    };
    let format = cli.format;

    match cli.command {
        Command::Mounts => run_mounts(&vfs, format)?,
        Command::Ls { dir, all, mime } => {
            let options = OperationOptions {
                scandir: ScandirFilter {
                    show_hidden: all,
                    mime_filter: mime,
                    sort: true,
                },
                ..options
            };
            let entries = vfs.scandir(dir, &options).await?;
            print_entries(&entries, format)?;
        }
        Command::Cat { file } => {
            let content = vfs.read(file, &options).await?;
            let bytes = content.into_bytes().map_err(|e| eyre!(e))?;
            std::io::stdout().write_all(&bytes)?;
        }
        Command::Put { file, input } => {
            let data = match input {
                Some(path) => std::fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut data = Vec::new();
                    std::io::stdin().read_to_end(&mut data)?;
                    data
                }
            };
            let size = data.len() as u64;
            vfs.write(file.as_str(), data, &options).await?;
            eprintln!("Wrote {} to {}", format_size(size), file);
        }
        Command::Cp {
            source,
            destination,
        } => {
            let plan = with_progress(&options, |options| async move {
                vfs.copy(source, destination, &options).await
            })
            .await?;
            print_plan("Copied", &plan);
        }
        Command::Mv {
            source,
            destination,
        } => {
            let plan = with_progress(&options, |options| async move {
                vfs.move_to(source, destination, &options).await
            })
            .await?;
            print_plan("Moved", &plan);
        }
        Command::Rm { file } => vfs.unlink(file, &options).await?,
        Command::Mkdir { dir } => vfs.mkdir(dir, &options).await?,
        Command::Stat { file } => {
            let info = vfs.fileinfo(file, &options).await?;
            print_entries(std::slice::from_ref(&info), format)?;
        }
        Command::Url { file } => println!("{}", vfs.url(file, &options).await?),
        Command::Find { root, query, limit } => {
            let found = vfs.find(root, &query, limit, &options).await?;
            print_entries(&found, format)?;
        }
        Command::Df { root } => match vfs.free_space(root.as_str(), &options).await? {
            Some(free) => println!("{}: {} free", root, format_size(free)),
            None => println!("{}: free space unknown", root),
        },
        Command::Trash { file } => vfs.trash(file, &options).await?,
        Command::Untrash { file } => vfs.untrash(file, &options).await?,
        Command::EmptyTrash { root } => match root {
            Some(root) => vfs.empty_trash_in(root, &options).await?,
            None => vfs.empty_trash(&options).await?,
        },
        Command::Upload { files, to } => run_upload(&vfs, files, to, &options).await?,
        Command::Download { file, output } => {
            let bytes = vfs.download(file, &options).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)?;
                    eprintln!("Downloaded {} to {}", format_size(bytes.len() as u64), path.display());
                }
                None => std::io::stdout().write_all(&bytes)?,
            }
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run a transfer while printing its progress to stderr.
async fn with_progress<F, Fut>(options: &OperationOptions, run: F) -> Result<TransferPlan>
where
    F: FnOnce(OperationOptions) -> Fut,
    Fut: std::future::Future<Output = strata_ops::OperationResult<TransferPlan>>,
{
    let (sink, mut rx) = ProgressSink::channel();
    let options = OperationOptions {
        progress: Some(sink),
        ..options.clone()
    };

    let printer = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            eprintln!("{} {:>3}%  {}", update.kind, update.percent, update.destination);
        }
    });

    let result = run(options).await;
    // The printer exits once `run` has dropped the sink.
    let _ = printer.await;
    Ok(result?)
}

async fn run_upload(
    vfs: &Vfs,
    files: Vec<PathBuf>,
    destination: String,
    options: &OperationOptions,
) -> Result<()> {
    let files = files
        .iter()
        .map(|path| -> Result<UploadFile> {
            let data = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mime = FileDescriptor::from_path(filename.as_str()).mime;
            Ok(UploadFile::new(filename, mime, data))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut batch = vfs.upload(
        UploadRequest {
            files,
            destination: destination.into(),
        },
        options,
    )?;

    let mut failed = 0usize;
    while let Some(outcome) = batch.recv().await {
        match outcome.result {
            Ok(stored) => println!(
                "{} -> {} ({})",
                outcome.filename,
                stored.path,
                format_size(stored.size.unwrap_or(0))
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", outcome.filename, e);
            }
        }
    }

    if failed > 0 {
        color_eyre::eyre::bail!("{} of {} uploads failed", failed, batch.len());
    }
    Ok(())
}

fn run_mounts(vfs: &Vfs, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for module in vfs.registry().modules() {
                let desc = &module.descriptor;
                let mut flags = Vec::new();
                if desc.internal {
                    flags.push("internal");
                }
                if desc.read_only {
                    flags.push("read-only");
                }
                println!(
                    "{:<12} {:<24} {:<10} {}",
                    desc.name,
                    desc.pattern.as_str(),
                    desc.transport.as_deref().unwrap_or("-"),
                    flags.join(",")
                );
            }
        }
        OutputFormat::Json => {
            let mounts: Vec<_> = vfs
                .registry()
                .modules()
                .map(|m| {
                    serde_json::json!({
                        "name": m.descriptor.name.as_str(),
                        "pattern": m.descriptor.pattern.as_str(),
                        "transport": m.descriptor.transport.as_deref(),
                        "read_only": m.descriptor.read_only,
                        "internal": m.descriptor.internal,
                        "root": m.descriptor.root,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&mounts)?);
        }
    }
    Ok(())
}

fn print_entries(entries: &[FileDescriptor], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for entry in entries {
                let size = if entry.is_dir() {
                    "-".to_string()
                } else {
                    entry.size.map(format_size).unwrap_or_default()
                };
                let marker = if entry.is_dir() { "/" } else { "" };
                println!(
                    "{:>10}  {:<28} {}{}",
                    size,
                    truncate(&entry.mime, 28),
                    entry.path,
                    if entry.path.ends_with('/') { "" } else { marker }
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entries)?);
        }
    }
    Ok(())
}

fn print_plan(verb: &str, plan: &TransferPlan) {
    let how = if plan.same_transport {
        "native"
    } else {
        "emulated"
    };
    eprintln!(
        "{} {} -> {} ({})",
        verb, plan.source.path, plan.destination.path, how
    );
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{}…", head)
    }
}
