use clap::Parser;
use dex_method_list::{write_listing, ApiMapping, ListOptions, Members, Source};
use log::{debug, warn};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

/// Print every method referenced by dex images, one signature per line.
#[derive(Parser, Debug)]
#[command(name = "dex-method-list", version, about)]
struct Cli {
    /// Dex images or APK/ZIP archives. Reads standard input when none are given.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Strip synthetic counters (access$000 -> access, Foo$$Lambda$3 -> Foo$$Lambda)
    #[arg(long)]
    hide_synthetic_numbers: bool,

    /// List field references instead of methods
    #[arg(long, conflicts_with = "members")]
    fields: bool,

    /// List both method and field references
    #[arg(long)]
    members: bool,

    /// ProGuard/R8 mapping file used to restore original names
    #[arg(long, value_name = "MAPPING")]
    mapping: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Warnings only unless --verbose; RUST_LOG overrides
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("dex_method_list", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let members = if cli.members {
        Members::All
    } else if cli.fields {
        Members::Fields
    } else {
        Members::Methods
    };
    let mapping = match &cli.mapping {
        Some(path) => {
            let mapping = ApiMapping::from_file(path)?;
            if mapping.is_empty() {
                warn!("{}: no type mappings", path.display());
            }
            Some(mapping)
        }
        None => None,
    };
    debug!("members: {members:?}, mapping: {}", mapping.is_some());

    let sources: Vec<Source> = if cli.files.is_empty() {
        vec![Source::Stdin]
    } else {
        cli.files.into_iter().map(Source::Path).collect()
    };
    let options = ListOptions {
        hide_synthetic_numbers: cli.hide_synthetic_numbers,
        members,
        mapping,
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_listing(&sources, &options, &mut out)?;
    Ok(())
}
