use clap::Parser;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::Cli;
use crate::codec::TextCodec;
use crate::config::{load_config, ConfigFile};
use crate::context::RunContext;
use crate::identity::RunIdentity;
use crate::logger::Logger;
use crate::sync::{CycleError, SyncRunner};
use crate::task::HostRunner;
use crate::tracker::{MantisClient, Tracker, MIN_SUPPORTED_VERSION};

const DEFAULT_CONFIG_REL: &str = ".config/errand.yml";
const DEFAULT_PROJECT: &str = "Runner";
const DEFAULT_CODEPAGE: &str = "cp1251";

#[derive(Debug)]
pub(crate) struct Quit {
    pub(crate) code: i32,
    #[allow(dead_code)]
    pub(crate) reason: String,
}

impl Quit {
    pub(crate) fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code as u8)
    }
}

pub(crate) fn quit(logger: &Logger, reason: &str, code: i32) -> Quit {
    let sanitized = if reason.trim().is_empty() {
        "unknown".to_string()
    } else {
        crate::logger::sanitize_value(reason)
    };
    logger.transition(&format!("quit reason={}", sanitized));
    Quit {
        code,
        reason: reason.to_string(),
    }
}

#[derive(Debug)]
struct Settings {
    server: String,
    user: Option<String>,
    password: Option<String>,
    codepage: String,
    project: String,
    log_path: Option<PathBuf>,
}

// Flags win over config-file values; the URL is the one mandatory setting
// and is checked before anything touches the network.
fn merge_settings(cli: &Cli, config: &ConfigFile) -> Result<Settings, String> {
    let tracker_type = cli
        .tracker_type
        .clone()
        .or_else(|| config.tracker_type.clone());
    if let Some(kind) = tracker_type {
        if !kind.eq_ignore_ascii_case("mantis") {
            return Err(format!(
                "Unsupported tracker type: {} (only \"mantis\" is supported)",
                kind
            ));
        }
    }

    let server = cli
        .server
        .clone()
        .or_else(|| config.server.clone())
        .map(|value| value.trim().to_string())
        .unwrap_or_default();
    if server.is_empty() {
        return Err("Issue tracker URL is not defined".to_string());
    }

    Ok(Settings {
        server,
        user: cli.user.clone().or_else(|| config.user.clone()),
        password: cli.password.clone().or_else(|| config.password.clone()),
        codepage: cli
            .codepage
            .clone()
            .or_else(|| config.codepage.clone())
            .unwrap_or_else(|| DEFAULT_CODEPAGE.to_string()),
        project: config
            .project
            .clone()
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        log_path: config.log_path.clone().map(PathBuf::from),
    })
}

fn load_config_for(cli: &Cli) -> Result<ConfigFile, Quit> {
    if let Some(path) = &cli.config {
        if !path.is_file() {
            let message = format!("Missing config file: {}", path.display());
            eprintln!("{}", message);
            return Err(Quit {
                code: 1,
                reason: format!("missing_config:{}", path.display()),
            });
        }
        return load_config(path)
            .map(|loaded| loaded.config)
            .map_err(|message| {
                eprintln!("{}", message);
                Quit {
                    code: 1,
                    reason: message,
                }
            });
    }

    let Some(home) = env::var_os("HOME").map(PathBuf::from) else {
        return Ok(ConfigFile::default());
    };
    let default_path = home.join(DEFAULT_CONFIG_REL);
    if !default_path.is_file() {
        return Ok(ConfigFile::default());
    }
    load_config(&default_path)
        .map(|loaded| loaded.config)
        .map_err(|message| {
            eprintln!("{}", message);
            Quit {
                code: 1,
                reason: message,
            }
        })
}

pub(crate) fn run_with_cli(cli: Cli) -> Result<(), Quit> {
    let config = load_config_for(&cli)?;
    let settings = merge_settings(&cli, &config).map_err(|message| {
        eprintln!("{}", message);
        Quit {
            code: 1,
            reason: message,
        }
    })?;

    let identity = RunIdentity::resolve(
        settings.user.clone(),
        settings.password.clone(),
        cli.use_hostname,
        cli.use_hostname_pc,
        cli.down_case,
    )
    .map_err(|message| {
        eprintln!("{}", message);
        Quit {
            code: 1,
            reason: message,
        }
    })?;

    let codec = TextCodec::for_label(&settings.codepage).map_err(|err| {
        let message = err.to_string();
        eprintln!("{}", message);
        Quit {
            code: 1,
            reason: message,
        }
    })?;

    let logger = Logger::new(settings.log_path.clone());

    let interrupt_flag = Arc::new(AtomicBool::new(false));
    if let Err(err) = ctrlc::set_handler({
        let interrupt_flag = Arc::clone(&interrupt_flag);
        move || {
            interrupt_flag.store(true, Ordering::SeqCst);
        }
    }) {
        eprintln!("Failed to set interrupt handler: {}", err);
    }

    let ctx = RunContext {
        debug: cli.debug,
        codec,
        project: settings.project.clone(),
    };

    if cli.debug {
        println!("Username {}...", identity.user());
        println!("Codepage {}", ctx.codec.name());
    }

    let client = MantisClient::new(&settings.server, &identity, cli.debug);
    let version = client
        .server_version()
        .map_err(|err| fatal(&logger, &err.to_string()))?;
    println!("Server {}", settings.server);
    println!("API version is {}", version);
    if version.as_str() < MIN_SUPPORTED_VERSION {
        eprintln!(
            "Warning: server API version {} is older than supported {}",
            version, MIN_SUPPORTED_VERSION
        );
    }
    logger.transition(&format!(
        "connected server={} version={}",
        settings.server, version
    ));

    let runner = HostRunner;
    let sync = SyncRunner::new(
        &client,
        &runner,
        &identity,
        &ctx,
        &logger,
        Arc::clone(&interrupt_flag),
    );
    match sync.run_cycle() {
        Ok(report) => {
            logger.transition(&format!(
                "cycle done candidates={} executed={} submitted={} failed={}",
                report.candidates, report.executed, report.submitted, report.failed
            ));
            if cli.debug {
                println!(
                    "Cycle done: {} candidate(s), {} executed, {} submitted, {} failed",
                    report.candidates, report.executed, report.submitted, report.failed
                );
            }
            Ok(())
        }
        Err(CycleError::Interrupted) => Err(quit(&logger, "interrupted", 130)),
        Err(CycleError::Tracker(err)) => Err(fatal(&logger, &err.to_string())),
    }
}

fn fatal(logger: &Logger, message: &str) -> Quit {
    eprintln!("{}", message);
    quit(logger, message, 1)
}

pub(crate) fn run_with_args(args: Vec<OsString>) -> Result<(), Quit> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // Render clap's output ourselves so test harnesses can capture
            // it. Help and version belong on stdout, real errors on stderr.
            if err.use_stderr() {
                eprintln!("{err}");
            } else {
                println!("{err}");
            }
            return Err(Quit {
                code: err.exit_code(),
                reason: "cli_parse".to_string(),
            });
        }
    };
    run_with_cli(cli)
}

pub(crate) fn main_with_args(args: Vec<OsString>) -> ExitCode {
    match run_with_args(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(quit) => quit.exit_code(),
    }
}

pub(crate) fn main() -> ExitCode {
    main_with_args(env::args_os().collect())
}
