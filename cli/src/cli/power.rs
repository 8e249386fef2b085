use super::{call_failed, connect};
use anyhow::Result;
use colored::*;
use mbclient_core::ClientConfig;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum PowerCommand {
    /// Reboot the device
    #[structopt(name = "reboot")]
    Reboot {
        /// Mechanism: framework, init or direct
        #[structopt(long, default_value = "framework", possible_values = &["framework", "init", "direct"])]
        via: String,

        /// Ask for confirmation (framework only)
        #[structopt(long)]
        confirm: bool,

        /// Reboot target such as recovery or bootloader (init/direct only)
        #[structopt(name = "ARG")]
        arg: Option<String>,
    },

    /// Power off the device
    #[structopt(name = "shutdown")]
    Shutdown {
        /// Mechanism: init or direct
        #[structopt(long, default_value = "init", possible_values = &["init", "direct"])]
        via: String,
    },
}

impl PowerCommand {
    pub fn execute(self, config: &ClientConfig) -> Result<()> {
        let connection = connect(config)?;
        match self {
            Self::Reboot { via, confirm, arg } => {
                println!("{} Rebooting via {}...", "[INFO]".blue(), via.cyan());
                let result = match via.as_str() {
                    "framework" => connection.reboot_via_framework(confirm),
                    "init" => connection.reboot_via_init(arg.as_deref()),
                    _ => connection.reboot_direct(arg.as_deref()),
                };
                result.map_err(|e| call_failed("reboot", e))?;
            }
            Self::Shutdown { via } => {
                println!("{} Shutting down via {}...", "[INFO]".blue(), via.cyan());
                let result = match via.as_str() {
                    "init" => connection.shutdown_via_init(),
                    _ => connection.shutdown_direct(),
                };
                result.map_err(|e| call_failed("shutdown", e))?;
            }
        }
        println!("{} Request accepted by daemon.", "[SUCCESS]".green());
        Ok(())
    }
}
