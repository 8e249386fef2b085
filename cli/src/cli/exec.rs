use super::{call_failed, connect};
use anyhow::{anyhow, Result};
use colored::*;
use mbclient_core::rpc::message::SignedExecRequest;
use mbclient_core::{ClientConfig, ExecCompletion};
use std::ops::ControlFlow;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub struct ExecCommand {
    /// Binary to execute
    #[structopt(name = "BINARY")]
    binary: String,

    /// Detached signature of the binary (defaults to BINARY.sig)
    #[structopt(long)]
    signature: Option<String>,

    /// Arguments, split like a shell would (e.g. --args "3 1 '/sdcard/my rom.zip'")
    #[structopt(long, default_value = "")]
    args: String,

    /// Override argv[0]
    #[structopt(long)]
    arg0: Option<String>,

    /// Run against this ROM instead of the booted one
    #[structopt(long)]
    rom_id: Option<String>,
}

impl ExecCommand {
    pub fn execute(self, config: &ClientConfig) -> Result<()> {
        let args = shlex::split(&self.args)
            .ok_or_else(|| anyhow!("{} Could not parse --args '{}'", "[ERROR]".red(), self.args))?;
        let signature = self
            .signature
            .unwrap_or_else(|| format!("{}.sig", self.binary));

        let connection = connect(config)?;
        println!("{} Executing {}", "[INFO]".blue(), self.binary.cyan());
        let request = SignedExecRequest {
            binary_path: self.binary.clone(),
            signature_path: signature,
            arg0: self.arg0,
            args,
            rom_id: self.rom_id,
        };

        let completion = connection
            .signed_exec(request, |line| {
                println!("{}", line.trim_end_matches('\n'));
                ControlFlow::Continue(())
            })
            .map_err(|e| call_failed("signed_exec", e))?;

        match completion {
            ExecCompletion::Exited { status: 0 } => {
                println!("{} {} exited successfully", "[SUCCESS]".green(), self.binary);
                Ok(())
            }
            ExecCompletion::Exited { status } => Err(anyhow!(
                "{} {} exited with status {}",
                "[ERROR]".red(),
                self.binary,
                status
            )),
            ExecCompletion::Signaled { signal } => {
                let name = completion.signal_name().unwrap_or("unknown signal");
                Err(anyhow!(
                    "{} {} was killed by {} ({})",
                    "[ERROR]".red(),
                    self.binary,
                    name,
                    signal
                ))
            }
            ExecCompletion::InvalidSignature => Err(anyhow!(
                "{} Signature of {} is invalid; ignore any output printed above",
                "[ERROR]".red().bold(),
                self.binary
            )),
            ExecCompletion::Failed { message } => Err(anyhow!(
                "{} Could not execute {}: {}",
                "[ERROR]".red(),
                self.binary,
                message
            )),
        }
    }
}
