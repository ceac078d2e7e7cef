//! docsync - keep translated Markdown documents in step with their source

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docsync_core::config::OutputFormat;
use docsync_core::doc::read_or_empty;
use docsync_core::section::Section;
use docsync_core::{heading_map, identify_changed_sections, locate, update_heading_map};
use docsync_core::{ChangedSection, Config, Document};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Section-aware diffing and heading maps for translated documentation
#[derive(Parser, Debug)]
#[command(name = "docsync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the section tree of a document
    Sections {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List sections that changed between two versions of a document
    Diff {
        /// Source document before the edit (missing file = new document)
        #[arg(long, value_name = "FILE")]
        source_before: PathBuf,
        /// Source document after the edit (missing file = deleted document)
        #[arg(long, value_name = "FILE")]
        source_after: PathBuf,
        /// Translated document before the edit
        #[arg(long, value_name = "FILE")]
        target_before: Option<PathBuf>,
        /// Translated document after the edit
        #[arg(long, value_name = "FILE")]
        target_after: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<Format>,
    },
    /// Reconcile the heading map of a translated document
    HeadingMap {
        #[arg(value_name = "SOURCE")]
        source: PathBuf,
        #[arg(value_name = "TARGET")]
        target: PathBuf,
        /// Write the updated map into TARGET instead of printing it
        #[arg(long)]
        write: bool,
    },
    /// Print the translated heading for a source heading
    Locate {
        #[arg(value_name = "TARGET")]
        target: PathBuf,
        #[arg(value_name = "HEADING")]
        heading: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Yaml,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Yaml => OutputFormat::Yaml,
        }
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    match args.command {
        Command::Sections { file } => print_sections(&file),
        Command::Diff {
            source_before,
            source_after,
            target_before,
            target_after,
            format,
        } => {
            let format = format.map(OutputFormat::from).unwrap_or(config.output.format);
            let changes = identify_changed_sections(
                &read_or_empty(&source_before)?,
                &read_or_empty(&source_after)?,
                &read_optional(target_before.as_deref())?,
                &read_optional(target_after.as_deref())?,
            );
            print_changes(&changes, format, config.output.line_stats)
        }
        Command::HeadingMap {
            source,
            target,
            write,
        } => reconcile(&source, &target, write),
        Command::Locate { target, heading } => {
            let doc = Document::load(&target)
                .with_context(|| format!("Failed to load document: {}", target.display()))?;
            match locate(&heading, &doc.heading_map()) {
                Some(translated) => {
                    println!("{translated}");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    log::warn!("No heading map entry for '{heading}' in {}", target.display());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn read_optional(path: Option<&Path>) -> Result<String> {
    path.map(read_or_empty).transpose().map(Option::unwrap_or_default)
}

fn print_sections(file: &Path) -> Result<ExitCode> {
    let doc = Document::load(file)
        .with_context(|| format!("Failed to load document: {}", file.display()))?;

    if !doc.tree.preamble.is_empty() {
        println!("(preamble) {} blocks", doc.tree.preamble.len());
    }
    for section in &doc.tree.sections {
        print_section(section, 0);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_section(section: &Section, depth: usize) {
    println!(
        "{}{} ({} blocks)",
        "  ".repeat(depth),
        section.heading,
        section.body_blocks.len()
    );
    for sub in &section.subsections {
        print_section(sub, depth + 1);
    }
}

fn print_changes(
    changes: &[ChangedSection],
    format: OutputFormat,
    line_stats: bool,
) -> Result<ExitCode> {
    match format {
        OutputFormat::Yaml => {
            let yaml =
                serde_yaml::to_string(changes).context("Failed to serialize changed sections")?;
            print!("{yaml}");
        }
        OutputFormat::Text => {
            for change in changes {
                let indent = "  ".repeat(usize::from(change.level.saturating_sub(1)));
                if line_stats {
                    println!(
                        "{indent}{:<8} {} (+{} -{})",
                        change.change_type.as_str(),
                        change.heading,
                        change.lines.added,
                        change.lines.removed
                    );
                } else {
                    println!("{indent}{:<8} {}", change.change_type.as_str(), change.heading);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn reconcile(source: &Path, target: &Path, write: bool) -> Result<ExitCode> {
    let source_doc = Document::load(source)
        .with_context(|| format!("Failed to load document: {}", source.display()))?;
    let target_doc = Document::load(target)
        .with_context(|| format!("Failed to load document: {}", target.display()))?;

    let map = update_heading_map(
        &target_doc.heading_map(),
        &source_doc.tree.sections,
        &target_doc.tree.sections,
    );

    if write {
        let updated = heading_map::inject(&target_doc.text(), &map);
        std::fs::write(target, updated)
            .with_context(|| format!("Failed to write file: {}", target.display()))?;
        log::info!("Wrote {} heading map entries to {}", map.len(), target.display());
    } else {
        print!("{}", heading_map::serialize(&map));
    }
    Ok(ExitCode::SUCCESS)
}
