//! `vta` command-line tool.

use anyhow::anyhow;
use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;
use vta_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use vta_cli::commands::{
    run_inspect, run_rename, run_reorder, run_set_classes, run_swap_classes, run_verify,
};
use vta_cli::logging::{LogConfig, LogFormat, init_logging};
use vta_cli::summary::{print_edit, print_inspect, print_json, print_verify};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let options = cli.parse_options();
    let result = match &cli.command {
        Command::Inspect(args) => {
            run_inspect(&args.file, args.view.as_deref(), &options).and_then(|report| {
                if args.json {
                    print_json(&report)?;
                } else {
                    print_inspect(&report);
                }
                Ok(if report.has_mismatches() { 1 } else { 0 })
            })
        }
        Command::Verify(args) => run_verify(&args.file, &options).map(|report| {
            print_verify(&report);
            if report.is_identical() { 0 } else { 1 }
        }),
        Command::Rename(args) => run_rename(
            &args.file,
            args.id,
            &args.name,
            &args.output,
            args.rebuild,
            &options,
        )
        .map(|report| {
            print_edit(&report);
            0
        }),
        Command::Reorder(args) => match args.source() {
            Some(source) => run_reorder(
                &args.file,
                source,
                args.include_templates,
                &args.output,
                &options,
            )
            .map(|report| {
                print_edit(&report);
                0
            }),
            None => Err(anyhow!("reorder needs --order or --flatten")),
        },
        Command::SetClasses(args) => {
            run_set_classes(&args.file, args.id, &args.classes, &args.output, &options).map(
                |report| {
                    print_edit(&report);
                    0
                },
            )
        }
        Command::SwapClasses(args) => {
            run_swap_classes(&args.file, args.first, args.second, &args.output, &options).map(
                |report| {
                    print_edit(&report);
                    0
                },
            )
        }
    };
    let exit_code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
