//! `reflow`: run, check and inspect the reflow oven controller.

mod cli;
mod error_fmt;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use reflow_config::Config;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{RunOpts, print_profile, run_profile, self_check};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(err) = real_main(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    match cli.cmd {
        Commands::Run {
            max_run_ms,
            sim_clock,
            stats,
            rt,
            rt_prio,
            rt_lock,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .wrap_err("install Ctrl-C handler")?;
            }
            let opts = RunOpts {
                max_run_ms,
                sim_clock,
                stats,
                rt,
                rt_prio,
                rt_lock,
                json: cli.json,
            };
            let report = run_profile(&cfg, &opts, &shutdown)?;
            tracing::debug!(ticks = report.ticks, overruns = report.overruns, "run finished");
            Ok(())
        }
        Commands::SelfCheck => self_check(&cfg, cli.json),
        Commands::Profile => print_profile(&cfg, cli.json),
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    match path {
        Some(p) => reflow_config::load_path(p),
        None => {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

/// Console logs go to stderr (stdout carries tick records); `[logging] file`
/// adds a JSON-lines file sink with optional rotation.
fn init_tracing(json: bool, level: &str, logging: &reflow_config::Logging) -> eyre::Result<()> {
    let console_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let console: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
                .unwrap_or_else(|_| EnvFilter::new("info"));
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("init tracing")
}
