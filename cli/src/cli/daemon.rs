use super::{call_failed, connect};
use anyhow::Result;
use colored::*;
use mbclient_core::ClientConfig;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum DaemonCommand {
    /// Print the daemon version
    #[structopt(name = "version")]
    Version,

    /// Run the handshake and report the negotiated session
    #[structopt(name = "status")]
    Status,
}

impl DaemonCommand {
    pub fn execute(self, config: &ClientConfig) -> Result<()> {
        match self {
            Self::Version => Self::handle_version(config),
            Self::Status => Self::handle_status(config),
        }
    }

    fn handle_version(config: &ClientConfig) -> Result<()> {
        let connection = connect(config)?;
        let version = connection
            .get_version()
            .map_err(|e| call_failed("get_version", e))?;
        println!("{}", version.green().bold());
        Ok(())
    }

    fn handle_status(config: &ClientConfig) -> Result<()> {
        let connection_config = config.connection_config()?;
        println!(
            "{} Connecting to {:?} (protocol {}, minimum daemon {})...",
            "[INFO]".blue(),
            connection_config.address,
            connection_config.protocol_version,
            connection_config.minimum_version
        );
        let connection = connect(config)?;
        println!(
            "{} Daemon {} ready on protocol {}",
            "[SUCCESS]".green(),
            connection.daemon_version().to_string().bold(),
            connection.interface().version()
        );
        connection.close();
        Ok(())
    }
}
