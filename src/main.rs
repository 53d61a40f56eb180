//! xmlpatch CLI

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use xmlpatch::patch::files::{read_document, write_document};
use xmlpatch::{patch_parallel, FileOptions, ParseOptions, Patcher, WriteOptions, XmlDocument};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Merge XML patch documents into XML files
#[derive(Parser)]
#[command(name = "xmlpatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch to one source document
    Apply {
        /// Source document
        source: PathBuf,
        /// Patch document
        patch: PathBuf,
        /// Write the result here instead of overwriting the source
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Apply one patch to many source documents in parallel, in place
    Batch {
        /// Patch document
        patch: PathBuf,
        /// Source documents
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Write results into this directory instead of overwriting the sources
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// List all elements of a document, indented by depth
    Elements {
        /// Document to list
        file: PathBuf,
        /// Reject malformed input
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
struct FormatArgs {
    /// Keep whitespace-only text nodes
    #[arg(long)]
    preserve_whitespace: bool,
    /// Reject malformed input
    #[arg(long)]
    strict: bool,
    /// Indent output by this many spaces per level
    #[arg(long)]
    indent: Option<usize>,
    /// Omit the XML declaration
    #[arg(long)]
    no_declaration: bool,
}

impl FormatArgs {
    fn options(&self) -> FileOptions {
        FileOptions {
            parse: ParseOptions {
                preserve_whitespace: self.preserve_whitespace,
                strict: self.strict,
            },
            write: WriteOptions {
                xml_declaration: !self.no_declaration,
                indent: self.indent,
            },
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn apply(source: &Path, patch: &Path, output: Option<&Path>, options: &FileOptions) -> Result<()> {
    let result = output.unwrap_or(source);
    let report = Patcher::new().patch_files_with(source, patch, result, options)?;
    info!(?report, result = %result.display(), "written");
    Ok(())
}

fn batch(patch: &Path, sources: &[PathBuf], out_dir: Option<&Path>, options: &FileOptions) -> Result<()> {
    let patch_doc = read_document(patch, options.parse)?;

    let mut docs: Vec<XmlDocument> = Vec::with_capacity(sources.len());
    for source in sources {
        docs.push(read_document(source, options.parse).with_context(|| format!("reading {}", source.display()))?);
    }

    let results = patch_parallel(&Patcher::new(), &mut docs, &patch_doc);

    let mut failed = 0;
    for ((source, doc), result) in sources.iter().zip(&docs).zip(results) {
        let outcome = result.map_err(anyhow::Error::from).and_then(|report| {
            let destination = match out_dir {
                Some(dir) => dir.join(
                    source
                        .file_name()
                        .with_context(|| format!("{} has no file name", source.display()))?,
                ),
                None => source.clone(),
            };
            write_document(doc, &destination, &options.write)?;
            info!(?report, result = %destination.display(), "written");
            Ok(())
        });
        if let Err(e) = outcome {
            error!(source = %source.display(), "{:#}", e);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} documents failed", failed, sources.len());
    }
    Ok(())
}

fn elements(file: &Path, strict: bool) -> Result<()> {
    let options = if strict { ParseOptions::strict() } else { ParseOptions::default() };
    let doc = read_document(file, options)?;
    let mut stdout = std::io::stdout().lock();
    for id in xmlpatch::list_all_elements(&doc) {
        writeln!(stdout, "{}{}", "  ".repeat(doc.depth(id)), doc.node_name(id).unwrap_or_default())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Apply { source, patch, output, format } => {
            apply(&source, &patch, output.as_deref(), &format.options())
        }
        Commands::Batch { patch, sources, out_dir, format } => {
            batch(&patch, &sources, out_dir.as_deref(), &format.options())
        }
        Commands::Elements { file, strict } => elements(&file, strict),
    }
}
