//! # sim_roa_cli
//!
//! Part of the sim_roa crate family.
//!
//! This is the command line application converting simulation output to ROA.
//!
//! ## Use
//!
//! ```bash
//! sim_roa_cli -f run1.sim -f run2.sim -g cryostat.geo.setup
//! ```
//!
//! writes `FPGA_Input.txt` to the current directory. A YAML configuration can be given with
//! `-c`; simulation files given with `-f` are added to the ones in the configuration and the
//! other flags replace the configured values. `sim_roa_cli new -p config.yml` makes a template
//! configuration, and `sim_roa_cli check -i FPGA_Input.txt` counts the events accepted by the
//! FPGA trigger check.
//!
//! Ctrl-C stops reading and writes out the events read so far. A second Ctrl-C aborts.
use clap::{Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use libsim_roa::cancel::CancelToken;
use libsim_roa::config::Config;
use libsim_roa::fpga_check::check_document;
use libsim_roa::process::{convert, ConversionSummary};
use libsim_roa::roa_reader::RoaDocument;

/// Help spellings clap does not know about
const EXTRA_HELP_FLAGS: [&str; 2] = ["-?", "?"];

fn cli() -> Command {
    Command::new("sim_roa_cli")
        .about("Convert simulation output to ROA for the FPGA emulation")
        .arg_required_else_help(true)
        .args_conflicts_with_subcommands(true)
        .subcommand(
            Command::new("new")
                .about("Make a template configuration yaml file")
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Path to the file"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Count the events of an ROA file accepted by the FPGA check")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("ROA file to check"),
                ),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Configuration yaml file"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Simulation file name (repeatable)"),
        )
        .arg(
            Arg::new("geometry")
                .short('g')
                .long("geometry")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Geometry file name"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Output ROA file [default: FPGA_Input.txt]"),
        )
        .arg(
            Arg::new("horizon")
                .short('t')
                .long("horizon")
                .value_parser(clap::value_parser!(f64))
                .help("Time horizon in seconds [default: 10]"),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("Seed for synthetic energies"),
        )
}

fn init_logging(pb_manager: &MultiProgress) {
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");
}

/// First Ctrl-C cancels, the next one aborts
fn install_interrupt_handler(cancel: CancelToken) {
    let catches = AtomicUsize::new(0);
    let result = ctrlc::set_handler(move || {
        if catches.fetch_add(1, Ordering::SeqCst) == 0 {
            log::warn!("Caught Ctrl-C; stopping after the current event. Press again to abort.");
            cancel.cancel();
        } else {
            std::process::abort();
        }
    });
    if let Err(e) = result {
        log::warn!("Could not install the Ctrl-C handler: {e}");
    }
}

/// Build the run configuration from the (optional) config file and the command line
fn load_config(matches: &ArgMatches) -> Option<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("Loading config from {}...", path.to_string_lossy());
            match Config::read_config_file(path) {
                Ok(c) => c,
                Err(e) => {
                    log::error!("{e}");
                    return None;
                }
            }
        }
        None => Config::default(),
    };

    if let Some(files) = matches.get_many::<PathBuf>("file") {
        config.simulation_files.extend(files.cloned());
    }
    if let Some(geometry) = matches.get_one::<PathBuf>("geometry") {
        config.geometry_file = Some(geometry.clone());
    }
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        config.output_path = output.clone();
    }
    if let Some(horizon) = matches.get_one::<f64>("horizon") {
        config.time_horizon = *horizon;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }

    for file in config.simulation_files.iter() {
        log::info!("Accepting simulation file name: {}", file.to_string_lossy());
    }
    if let Some(geometry) = &config.geometry_file {
        log::info!("Accepting geometry file name: {}", geometry.to_string_lossy());
    }
    log::info!("Output: {}", config.output_path.to_string_lossy());
    log::info!("Time horizon: {} s", config.time_horizon);

    Some(config)
}

fn report(summary: &ConversionSummary) {
    if summary.interrupted {
        log::warn!("Conversion was interrupted; the output only holds the events read before.");
    }
    log::info!(
        "Events: {} ({:.3} per second)",
        summary.n_events,
        summary.event_rate()
    );
    log::info!(
        "Hits:   {} ({:.3} per second)",
        summary.n_strip_hits,
        summary.hit_rate()
    );
    log::info!("Detectors: {}", summary.n_detectors);
    log::info!(
        "Hits with synthetic energy: {}, non strip hits skipped: {}",
        summary.n_substituted,
        summary.n_skipped_records
    );
}

fn run_check(path: &Path) -> ExitCode {
    log::info!("Checking {}...", path.to_string_lossy());
    match RoaDocument::read_file(path) {
        Ok(document) => {
            let report = check_document(&document);
            log::info!("Good counts: {} of {}", report.n_accepted, report.n_events);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let command = cli();
    if std::env::args()
        .skip(1)
        .any(|arg| EXTRA_HELP_FLAGS.contains(&arg.as_str()))
    {
        let mut command = command;
        if let Err(e) = command.print_help() {
            eprintln!("{e}");
        }
        return ExitCode::SUCCESS;
    }
    let matches = command.get_matches();

    // Initialize feedback
    let pb_manager = MultiProgress::new();
    init_logging(&pb_manager);

    match matches.subcommand() {
        Some(("new", sub)) => {
            // Required by clap
            let path = sub.get_one::<PathBuf>("path").expect("We require args");
            log::info!("Making a template config at {}...", path.to_string_lossy());
            if let Err(e) = Config::default().write_config_file(path) {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
            log::info!("Done.");
            return ExitCode::SUCCESS;
        }
        Some(("check", sub)) => {
            let path = sub.get_one::<PathBuf>("input").expect("We require args");
            return run_check(path);
        }
        _ => (),
    }

    let config = match load_config(&matches) {
        Some(c) => c,
        None => return ExitCode::FAILURE,
    };

    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone());

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    pb.set_style(
        ProgressStyle::with_template("{msg:>8} [{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let result = convert(&config, &cancel, |status| {
        pb.set_message(status.stage.as_str());
        pb.set_position((status.progress * 100.0) as u64);
    });
    pb.finish();

    match result {
        Ok(summary) => {
            report(&summary);
            log::info!(
                "Successfully wrote {}",
                config.output_path.to_string_lossy()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_write_error() {
                log::error!("Writing the output failed: {e}");
            } else {
                log::error!("Error during analysis: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
