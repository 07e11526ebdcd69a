//! Command-line interface for texmerge
//!
//! Usage:
//!   texmerge merge `<fragments>...` [--json]   - Merge fragments into the main file
//!   texmerge arrange                         - Sort figures into size folders
//!   texmerge duplicates [--prune]            - List (or prune) duplicated figures
//!   texmerge figure-list [--output `<file>`]   - Write a catalogue of all figures
//!   texmerge compile                         - Typeset the main file
//!   texmerge show-config                     - Print the effective configuration
//!
//! Every subcommand reads `texmerge.toml` from the working directory when it
//! exists; `--config` names another file and `--main`/`--figures` override
//! single paths.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process;
use texmerge::figures::{self, catalogue};
use texmerge::toolchain::{CancelHandle, Toolchain};
use texmerge::{MergeSettings, Merger};
use texmerge_config::{ConfigError, Loader, TexmergeConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG_FILE: &str = "texmerge.toml";

fn main() {
    let matches = Command::new("texmerge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Merges lecture fragments into a master LaTeX document")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Configuration file layered over the defaults"),
        )
        .arg(
            Arg::new("main")
                .long("main")
                .global(true)
                .help("Main document holding the content sentinels"),
        )
        .arg(
            Arg::new("figures")
                .long("figures")
                .global(true)
                .help("Figure root with size<N> folders"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("One of trace, debug, info, warn, error")
                .default_value("info"),
        )
        .subcommand(
            Command::new("merge")
                .about("Trim, decorate and inject fragments into the main file")
                .arg(
                    Arg::new("fragments")
                        .help("Fragment files to merge")
                        .num_args(0..)
                        .index(1),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the run report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("arrange").about("Move figures into size<N> folders"))
        .subcommand(
            Command::new("duplicates")
                .about("List figures that exist more than once")
                .arg(
                    Arg::new("prune")
                        .long("prune")
                        .help("Keep the newest copy of each and delete the rest")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("figure-list")
                .about("Write a document showing every figure")
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Catalogue file to write")
                        .default_value("figure-list.tex"),
                ),
        )
        .subcommand(Command::new("compile").about("Typeset the main file"))
        .subcommand(Command::new("show-config").about("Print the effective configuration as JSON"))
        .get_matches();

    init_logging(matches.get_one::<String>("log-level").map(String::as_str));
    let config = load_config(&matches).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    });

    let ok = match matches.subcommand() {
        Some(("merge", sub)) => handle_merge_command(&config, sub),
        Some(("arrange", _)) => handle_arrange_command(&config),
        Some(("duplicates", sub)) => handle_duplicates_command(&config, sub.get_flag("prune")),
        Some(("figure-list", sub)) => {
            let output = sub.get_one::<String>("output").unwrap();
            handle_figure_list_command(&config, Path::new(output))
        }
        Some(("compile", _)) => handle_compile_command(&config),
        Some(("show-config", _)) => handle_show_config_command(&config),
        _ => unreachable!(),
    };
    if !ok {
        process::exit(1);
    }
}

fn init_logging(level: Option<&str>) {
    let level = match level.unwrap_or("info").to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }
}

fn load_config(matches: &ArgMatches) -> Result<TexmergeConfig, ConfigError> {
    let mut loader = match matches.get_one::<String>("config") {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    if let Some(main) = matches.get_one::<String>("main") {
        loader = loader.set_override("paths.main", main.as_str())?;
    }
    if let Some(figures) = matches.get_one::<String>("figures") {
        loader = loader.set_override("paths.figures", figures.as_str())?;
    }
    loader.build()
}

/// Handle the merge command
fn handle_merge_command(config: &TexmergeConfig, matches: &ArgMatches) -> bool {
    let inputs: Vec<PathBuf> = matches
        .get_many::<String>("fragments")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();
    let merger = Merger::new(MergeSettings::from_config(config, Path::new(".")));
    match merger.run(&inputs) {
        Ok(report) => {
            if matches.get_flag("json") {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return false;
                    }
                }
            } else {
                println!("{}", report.summary());
            }
            true
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

/// Handle the arrange command
fn handle_arrange_command(config: &TexmergeConfig) -> bool {
    let report = figures::arrange(&config.paths.figures);
    for moved in &report.moved {
        println!("{} -> {}", moved.from.display(), moved.to.display());
    }
    for failure in &report.failures {
        eprintln!("Error: {}", failure);
    }
    report.failures.is_empty()
}

/// Handle the duplicates command
fn handle_duplicates_command(config: &TexmergeConfig, prune: bool) -> bool {
    let root = &config.paths.figures;
    if prune {
        let report = figures::remove_duplicates_by_last_modified(root);
        for deleted in &report.deleted {
            println!("deleted {}", deleted.display());
        }
        for failure in &report.failures {
            eprintln!("Error: {}", failure);
        }
        return report.failures.is_empty();
    }
    let duplicates = figures::find_duplicates(root);
    for (name, paths) in &duplicates {
        println!("{}:", name);
        for (i, path) in paths.iter().enumerate() {
            println!("\t{}. {}", i + 1, path.display());
        }
    }
    if duplicates.is_empty() {
        println!("No duplicated figures.");
    }
    true
}

/// Handle the figure-list command
fn handle_figure_list_command(config: &TexmergeConfig, output: &Path) -> bool {
    match catalogue::write_catalogue(&config.paths.figures, output) {
        Ok(count) => {
            println!("{} figure(s) written to {}", count, output.display());
            true
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

/// Handle the compile command
fn handle_compile_command(config: &TexmergeConfig) -> bool {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };
    let toolchain = Toolchain::from_config(&config.toolchain);
    let cancel = CancelHandle::new();
    let master = config.paths.main.clone();

    runtime.block_on(async move {
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        match toolchain.compile(&master, &cancel).await {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Error: {}", e);
                false
            }
        }
    })
}

/// Handle the show-config command
fn handle_show_config_command(config: &TexmergeConfig) -> bool {
    match serde_json::to_string_pretty(config) {
        Ok(json) => {
            println!("{}", json);
            true
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}
