//! # lcls_bdp_cli
//!
//! Part of the lcls_bdp crate family.
//!
//! Command-line front end for the converter. One invocation performs one
//! conversion run:
//!
//! ```bash
//! lcls-bdp --settings run396.ini \
//!     --diffraction-input xppl1026722_Run0396_nolzo.h5 \
//!     --probe-position-input xppl1026722_Run0396_nolzo.h5 \
//!     --product-name run396 \
//!     -o ./output_run396
//! ```
//!
//! `lcls-bdp new --path settings.ini` writes a template settings document,
//! and `lcls-bdp --list-plugins` prints the registered reader plugins.
use clap::{Arg, ArgAction, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

use liblcls_bdp::convert::{convert, ConversionRequest};
use liblcls_bdp::geometry::GeometryConfig;
use liblcls_bdp::plugins::PluginRegistry;
use liblcls_bdp::settings::{MetadataOverrides, Settings};

fn build_cli() -> Command {
    Command::new("lcls-bdp")
        .about("Convert LCLS diffraction data into a Ptychodus product")
        .arg_required_else_help(true)
        .subcommand_negates_reqs(true)
        .subcommand(
            Command::new("new")
                .about("Write a template settings INI file")
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Path to the file"),
                ),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .required_unless_present("list-plugins")
                .help("Path to the settings INI file"),
        )
        .arg(
            Arg::new("diffraction-input")
                .long("diffraction-input")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .required_unless_present("list-plugins")
                .help("HDF5 file holding the diffraction stack"),
        )
        .arg(
            Arg::new("probe-position-input")
                .long("probe-position-input")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .required_unless_present("list-plugins")
                .help("HDF5 file holding the scan positions (may equal the diffraction input)"),
        )
        .arg(
            Arg::new("product-name")
                .long("product-name")
                .value_name("NAME")
                .required_unless_present("list-plugins")
                .help("Label for the produced product"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .required_unless_present("list-plugins")
                .help("Output directory, created if absent"),
        )
        .arg(
            Arg::new("probe-energy-eV")
                .long("probe-energy-eV")
                .value_name("FLOAT")
                .value_parser(clap::value_parser!(f64))
                .help("Probe energy metadata override"),
        )
        .arg(
            Arg::new("detector-distance-m")
                .long("detector-distance-m")
                .value_name("FLOAT")
                .value_parser(clap::value_parser!(f64))
                .help("Detector distance metadata override"),
        )
        .arg(
            Arg::new("geometry-config")
                .long("geometry-config")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .requires("run")
                .help("YAML file with run-range geometry overrides"),
        )
        .arg(
            Arg::new("run")
                .long("run")
                .value_name("INT")
                .value_parser(clap::value_parser!(i64))
                .help("Run number used to select geometry overrides"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("INT")
                .value_parser(clap::value_parser!(i64))
                .help("Verbosity: 10=DEBUG, 20=INFO, 30=WARN, 40=ERROR"),
        )
        .arg(
            Arg::new("list-plugins")
                .long("list-plugins")
                .action(ArgAction::SetTrue)
                .conflicts_with_all([
                    "settings",
                    "diffraction-input",
                    "probe-position-input",
                    "product-name",
                    "output",
                    "probe-energy-eV",
                    "detector-distance-m",
                    "geometry-config",
                    "run",
                ])
                .help("Print the registered reader plugin names and exit"),
        )
}

fn level_filter(log_level: Option<i64>) -> simplelog::LevelFilter {
    match log_level {
        Some(level) if level <= 10 => simplelog::LevelFilter::Debug,
        Some(level) if level <= 20 => simplelog::LevelFilter::Info,
        Some(level) if level <= 30 => simplelog::LevelFilter::Warn,
        Some(_) => simplelog::LevelFilter::Error,
        None => simplelog::LevelFilter::Info,
    }
}

fn make_template_settings(path: &Path) {
    Settings::default()
        .write_settings_file(path)
        .expect("Could not write template settings file!");
}

fn main() {
    let matches = build_cli().get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        level_filter(matches.get_one::<i64>("log-level").copied()),
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    if let Some(("new", sub_matches)) = matches.subcommand() {
        let path = sub_matches
            .get_one::<PathBuf>("path")
            .expect("We require args");
        log::info!("Making a template settings file at {}...", path.to_string_lossy());
        make_template_settings(path);
        log::info!("Done.");
        return;
    }

    let registry = PluginRegistry::standard();

    if matches.get_flag("list-plugins") {
        println!("Diffraction reader plugins:");
        for name in registry.diffraction_names() {
            println!("  {name}");
        }
        println!("Position reader plugins:");
        for name in registry.position_names() {
            println!("  {name}");
        }
        return;
    }

    let mut overrides = MetadataOverrides {
        probe_energy_ev: matches.get_one::<f64>("probe-energy-eV").copied(),
        detector_distance_m: matches.get_one::<f64>("detector-distance-m").copied(),
    };

    if let Some(config_path) = matches.get_one::<PathBuf>("geometry-config") {
        let run = matches
            .get_one::<i64>("run")
            .copied()
            .expect("We require args");
        match GeometryConfig::read_config_file(config_path) {
            Ok(config) => {
                if overrides.probe_energy_ev.is_none() {
                    overrides.probe_energy_ev = config.probe_energy_for_run(run);
                }
                if overrides.detector_distance_m.is_none() {
                    overrides.detector_distance_m = config.detector_distance_for_run(run);
                }
            }
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        }
    }

    let request = ConversionRequest {
        settings_path: matches
            .get_one::<PathBuf>("settings")
            .expect("We require args")
            .clone(),
        diffraction_input: matches
            .get_one::<PathBuf>("diffraction-input")
            .expect("We require args")
            .clone(),
        position_input: matches
            .get_one::<PathBuf>("probe-position-input")
            .expect("We require args")
            .clone(),
        product_name: matches
            .get_one::<String>("product-name")
            .expect("We require args")
            .clone(),
        output_dir: matches
            .get_one::<PathBuf>("output")
            .expect("We require args")
            .clone(),
        overrides,
    };

    log::info!("Settings: {}", request.settings_path.to_string_lossy());
    log::info!(
        "Diffraction input: {}",
        request.diffraction_input.to_string_lossy()
    );
    log::info!(
        "Position input: {}",
        request.position_input.to_string_lossy()
    );
    log::info!("Product name: {}", request.product_name);
    log::info!("Output directory: {}", request.output_dir.to_string_lossy());

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    let (tx, rx) = channel();
    // Spawn the task!
    let handle = std::thread::spawn(move || convert(&request, &registry, &tx));

    // The sender hangs up when the worker finishes
    while let Ok(status) = rx.recv() {
        pb.set_position((status.progress * 100.0) as u64);
    }

    match handle.join() {
        Ok(Ok(summary)) => {
            pb.finish();
            log::info!(
                "Successfully converted {} frames and {} positions.",
                summary.frames,
                summary.positions
            );
        }
        Ok(Err(e)) => {
            pb.finish();
            log::error!("Conversion failed with error: {e}");
            std::process::exit(1);
        }
        Err(_) => {
            log::error!("Failed to join conversion task!");
            std::process::exit(1);
        }
    }

    log::info!("Done.");
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_COMMAND: [&str; 11] = [
        "lcls-bdp",
        "--settings",
        "run396.ini",
        "--diffraction-input",
        "run396.h5",
        "--probe-position-input",
        "run396.h5",
        "--product-name",
        "run396",
        "-o",
        "output",
    ];

    #[test]
    fn test_cli_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_required_flags_accepted() {
        let matches = build_cli().try_get_matches_from(FULL_COMMAND).unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("settings").unwrap(),
            &PathBuf::from("run396.ini")
        );
        assert_eq!(
            matches.get_one::<String>("product-name").unwrap(),
            "run396"
        );
        assert_eq!(
            matches.get_one::<PathBuf>("output").unwrap(),
            &PathBuf::from("output")
        );
    }

    #[test]
    fn test_missing_required_flag_rejected() {
        let args = [
            "lcls-bdp",
            "--settings",
            "run396.ini",
            "--diffraction-input",
            "run396.h5",
        ];
        assert!(build_cli().try_get_matches_from(args).is_err());
    }

    #[test]
    fn test_list_plugins_stands_alone() {
        let matches = build_cli()
            .try_get_matches_from(["lcls-bdp", "--list-plugins"])
            .unwrap();
        assert!(matches.get_flag("list-plugins"));
    }

    #[test]
    fn test_list_plugins_conflicts_with_conversion() {
        let args = ["lcls-bdp", "--list-plugins", "--settings", "run396.ini"];
        assert!(build_cli().try_get_matches_from(args).is_err());
    }

    #[test]
    fn test_metadata_overrides_parse() {
        let mut args = FULL_COMMAND.to_vec();
        args.extend(["--probe-energy-eV", "8800.0", "--detector-distance-m", "4.05"]);
        let matches = build_cli().try_get_matches_from(args).unwrap();
        assert_eq!(
            matches.get_one::<f64>("probe-energy-eV").copied(),
            Some(8800.0)
        );
        assert_eq!(
            matches.get_one::<f64>("detector-distance-m").copied(),
            Some(4.05)
        );
    }

    #[test]
    fn test_geometry_config_requires_run() {
        let mut args = FULL_COMMAND.to_vec();
        args.extend(["--geometry-config", "geometry.yml"]);
        assert!(build_cli().try_get_matches_from(args.clone()).is_err());
        args.extend(["--run", "396"]);
        assert!(build_cli().try_get_matches_from(args).is_ok());
    }

    #[test]
    fn test_template_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["lcls-bdp", "new", "--path", "settings.ini"])
            .unwrap();
        match matches.subcommand() {
            Some(("new", sub)) => {
                assert_eq!(
                    sub.get_one::<PathBuf>("path").unwrap(),
                    &PathBuf::from("settings.ini")
                );
            }
            _ => panic!("expected the new subcommand"),
        }
    }
}
