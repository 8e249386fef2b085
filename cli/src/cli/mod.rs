mod crypto;
mod daemon;
mod exec;
mod file;
mod path;
mod power;
mod rom;
use anyhow::{anyhow, Context, Result};
use colored::*;
use mbclient_core::utils::logging;
use mbclient_core::{ClientConfig, Connection, DaemonReplacer, Error, FailureReason};
use std::path::{Path, PathBuf};
use std::process::Command;

use structopt::{clap::AppSettings, StructOpt};
// Aggregate all subcommand types
use self::{
    crypto::CryptoCommand, daemon::DaemonCommand, exec::ExecCommand, file::FileCommand,
    path::PathCommand, power::PowerCommand, rom::RomCommand,
};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "mbclient",
    global_settings = &[AppSettings::DisableHelpSubcommand]
)]
pub struct App {
    /// Optional path to config file (defaults to ./default.json if present)
    #[structopt(long, global = true)]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    command: AppCommand,
}

#[derive(StructOpt, Debug)]
pub enum AppCommand {
    /// Daemon version and connection checks
    #[structopt(name = "daemon")]
    Daemon(DaemonCommand),

    /// Installed ROM management
    #[structopt(name = "rom")]
    Rom(RomCommand),

    /// Remote file access through daemon descriptors
    #[structopt(name = "file")]
    File(FileCommand),

    /// Path operations performed by the daemon
    #[structopt(name = "path")]
    Path(PathCommand),

    /// Run a signed binary and stream its output
    #[structopt(name = "exec")]
    Exec(ExecCommand),

    /// Reboot or shut down the device
    #[structopt(name = "power")]
    Power(PowerCommand),

    /// Encrypted data partition helpers
    #[structopt(name = "crypto")]
    Crypto(CryptoCommand),
}

impl App {
    pub fn execute(self) -> Result<()> {
        let config = ClientConfig::discover(self.config.as_deref())?;
        let log_path = config.log_path.as_deref().map(Path::new);
        logging::init(log_path, config.log_level()).context("Failed to initialize logger")?;

        match self.command {
            AppCommand::Daemon(cmd) => cmd.execute(&config),
            AppCommand::Rom(cmd) => cmd.execute(&config),
            AppCommand::File(cmd) => cmd.execute(&config),
            AppCommand::Path(cmd) => cmd.execute(&config),
            AppCommand::Exec(cmd) => cmd.execute(&config),
            AppCommand::Power(cmd) => cmd.execute(&config),
            AppCommand::Crypto(cmd) => cmd.execute(&config),
        }
    }
}

/// Runs the configured `replace-command` to reinstall the daemon.
struct CommandReplacer<'a> {
    command: Option<&'a str>,
}

impl DaemonReplacer for CommandReplacer<'_> {
    fn replace_daemon(&self) -> bool {
        let Some(command) = self.command else {
            log::warn!("No replace-command configured, cannot replace the daemon");
            return false;
        };
        let argv = match shlex::split(command) {
            Some(argv) if !argv.is_empty() => argv,
            _ => {
                log::error!("Could not parse replace-command '{}'", command);
                return false;
            }
        };

        println!("{} Replacing daemon: {}", "[INFO]".blue(), command.cyan());
        match Command::new(&argv[0]).args(&argv[1..]).status() {
            Ok(status) if status.success() => true,
            Ok(status) => {
                log::error!("replace-command exited with {}", status);
                false
            }
            Err(e) => {
                log::error!("Failed to run replace-command: {}", e);
                false
            }
        }
    }
}

// Helper function to open a ready connection, replacing the daemon once if needed
fn connect(config: &ClientConfig) -> Result<Connection> {
    let connection_config = config.connection_config()?;
    let replacer = CommandReplacer {
        command: config.replace_command.as_deref(),
    };

    Connection::connect_with_recovery(&connection_config, &replacer).map_err(|e| {
        let hint = match e.reason() {
            Some(FailureReason::DaemonNotRunning) => "Is the daemon running?",
            Some(FailureReason::SignatureCheckFail) => "This client build is not trusted by the daemon.",
            Some(FailureReason::InterfaceNotSupported) | Some(FailureReason::VersionTooOld) => {
                "Update the daemon or set replace-command in the config."
            }
            _ => "See the log for details.",
        };
        anyhow!("{} Failed to connect to daemon: {} {}", "[ERROR]".red(), e, hint)
    })
}

/// Adds a colored prefix to a failed daemon call.
fn call_failed(what: &str, e: Error) -> anyhow::Error {
    if e.is_fatal() {
        anyhow!("{} {} failed, connection lost: {}", "[ERROR]".red(), what, e)
    } else {
        anyhow!("{} {} failed: {}", "[ERROR]".red(), what, e)
    }
}

/// Parses an octal mode such as `755` or `0644`.
fn parse_mode(text: &str) -> Result<u32, String> {
    u32::from_str_radix(text.trim_start_matches("0o"), 8)
        .map_err(|_| format!("'{}' is not an octal mode", text))
}
