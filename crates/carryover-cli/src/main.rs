//! Carryover CLI
//!
//! The `carryover` command exposes the core library to migration scripts.
//!
//! ## Commands
//!
//! - `replace`: Rewrite `TODO(...)` token lists across a checkout
//! - `baseline`: Find the baseline revision of a reference in a git repository
//! - `log`: Show the revisions a walk visits, or the changes between two references
//! - `label`: Parse label lines from text

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use carryover_core::history::{LabeledAncestor, NoGrouping, SkipStart};
use carryover_core::{
    GitCliRepository, Label, ReplaceConfig, ReplaceMode, Revision, RevisionReader, Sorting,
    WalkOptions,
};

#[derive(Parser)]
#[command(name = "carryover")]
#[command(author = "Stevedores Org")]
#[command(version = carryover_core::VERSION)]
#[command(about = "Move source trees between repositories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and results
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite tag token lists in every in-scope file under a directory
    Replace {
        /// Checkout directory to rewrite in place
        dir: PathBuf,

        /// TOML configuration file
        #[arg(short, long, env = "CARRYOVER_CONFIG")]
        config: Option<PathBuf>,

        /// Replace mode (overrides the configuration)
        #[arg(short, long)]
        mode: Option<ReplaceMode>,

        /// Tag to rewrite; repeat for several (overrides the configuration)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Mapping entry `from=to`; repeat for several
        #[arg(long = "map", value_parser = parse_mapping)]
        mappings: Vec<(String, String)>,

        /// Default token for modes that need one
        #[arg(long)]
        default: Option<String>,

        /// Include glob, relative to the checkout
        #[arg(long)]
        include: Vec<String>,

        /// Exclude glob, relative to the checkout
        #[arg(long)]
        exclude: Vec<String>,

        /// Undo a previous run with the same configuration
        #[arg(long)]
        reverse: bool,
    },

    /// Find the baseline revision for a reference
    Baseline {
        /// Reference to start from (branch, sha, change ref)
        reference: String,

        #[command(flatten)]
        walk: WalkArgs,

        /// Use the nearest revision carrying this label instead of the parent
        #[arg(long, conflicts_with = "gerrit")]
        label: Option<String>,

        /// Treat the reference as a Gerrit change
        #[arg(long)]
        gerrit: bool,
    },

    /// Show revision history
    Log {
        /// Reference to show history for
        #[arg(default_value = "HEAD")]
        reference: String,

        #[command(flatten)]
        walk: WalkArgs,

        /// Only show revisions not reachable from this reference, oldest first
        #[arg(long)]
        since: Option<String>,

        /// Maximum number of revisions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Parse label lines; reads stdin when no text is given
    Label {
        /// Text to parse
        text: Option<String>,
    },
}

#[derive(clap::Args)]
struct WalkArgs {
    /// Git repository directory
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Follow only first parents
    #[arg(long)]
    first_parent: bool,

    /// Order of the walk
    #[arg(long, value_enum, default_value_t = SortingArg::Topological)]
    sorting: SortingArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortingArg {
    Topological,
    CommitTime,
}

impl WalkArgs {
    fn options(&self, limit: Option<usize>) -> WalkOptions {
        WalkOptions {
            sorting: match self.sorting {
                SortingArg::Topological => Sorting::Topological,
                SortingArg::CommitTime => Sorting::ByCommitTime,
            },
            first_parent: self.first_parent,
            limit,
        }
    }

    fn open(&self) -> Result<GitCliRepository> {
        GitCliRepository::open(&self.repo)
            .with_context(|| format!("Failed to open repository {}", self.repo.display()))
    }
}

fn parse_mapping(entry: &str) -> Result<(String, String), String> {
    match entry.split_once('=') {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        _ => Err(format!("expected 'from=to', got '{entry}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    carryover_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Replace {
            dir,
            config,
            mode,
            tags,
            mappings,
            default,
            include,
            exclude,
            reverse,
        } => {
            let mut config = match config {
                Some(path) => ReplaceConfig::load(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => ReplaceConfig::default(),
            };
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if !tags.is_empty() {
                config.tags = tags;
            }
            config.mapping.extend(mappings);
            if default.is_some() {
                config.default = default;
            }
            config.paths.include.extend(include);
            config.paths.exclude.extend(exclude);
            cmd_replace(&dir, &config, reverse, cli.json)
        }
        Commands::Baseline {
            reference,
            walk,
            label,
            gerrit,
        } => cmd_baseline(&walk, &reference, label.as_deref(), gerrit, cli.json),
        Commands::Log {
            reference,
            walk,
            since,
            limit,
        } => cmd_log(&walk, &reference, since.as_deref(), limit, cli.json),
        Commands::Label { text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            cmd_label(&text, cli.json)
        }
    }
}

/// Rewrite a checkout in place
fn cmd_replace(dir: &Path, config: &ReplaceConfig, reverse: bool, json: bool) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    let mut engine = config.build().context("Invalid replace configuration")?;
    if reverse {
        engine = engine.reverse()?;
    }

    let report = engine
        .transform(dir)
        .with_context(|| format!("Failed to rewrite {}", dir.display()))?;

    if json {
        print_json(&report)?;
    } else {
        for path in &report.changed {
            println!("M {}", path.display());
        }
        info!(
            files = report.files_scanned,
            changed = report.changed.len(),
            occurrences = report.occurrences_rewritten,
            "replace complete"
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct BaselineOutput<'a> {
    start: &'a Revision,
    baseline: &'a Revision,
    group_identity: Option<String>,
}

/// Resolve a reference and print its baseline
fn cmd_baseline(
    walk: &WalkArgs,
    reference: &str,
    label: Option<&str>,
    gerrit: bool,
    json: bool,
) -> Result<()> {
    let repo = walk.open()?;
    let reader = match (label, gerrit) {
        (_, true) => RevisionReader::gerrit(repo),
        (Some(label), false) => RevisionReader::new(repo, LabeledAncestor::new(label), NoGrouping),
        (None, false) => RevisionReader::new(repo, SkipStart, NoGrouping),
    }
    .with_options(walk.options(None));

    let start = reader.resolve(reference)?;
    let baseline = reader.find_baseline(&start)?;
    let output = BaselineOutput {
        start: &start,
        baseline: &baseline,
        group_identity: reader.group_identity(&start),
    };

    if json {
        print_json(&output)?;
    } else {
        println!("{}", baseline.id);
        if let Some(group) = &output.group_identity {
            println!("Group: {group}");
        }
    }
    Ok(())
}

/// Show the history of a reference
fn cmd_log(
    walk: &WalkArgs,
    reference: &str,
    since: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<()> {
    // The limit applies to the walk only when there is no exclusion.
    let options = walk.options(since.is_none().then_some(limit));
    let reader = RevisionReader::git(walk.open()?).with_options(options);
    let start = reader.resolve(reference)?;
    let history = match since {
        Some(since) => {
            let from = reader.resolve(since)?;
            let mut changes = reader.changes(Some(&from), &start)?;
            changes.truncate(limit);
            changes
        }
        None => reader.changes(None, &start)?.into_iter().rev().collect(),
    };

    if json {
        return print_json(&history);
    }
    if history.is_empty() {
        println!("No revisions found for '{reference}'");
        return Ok(());
    }
    for revision in history {
        println!("commit {}", revision.id);
        println!("Author: {}", revision.author);
        println!("Date:   {}", revision.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
        println!();
        for line in revision.message.lines() {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}

/// Print every label line of a text
fn cmd_label(text: &str, json: bool) -> Result<()> {
    let labels = Label::parse_all(text);
    if json {
        return print_json(&labels);
    }
    for label in labels {
        println!("{}\t{}", label.name, label.value);
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
