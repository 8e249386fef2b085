use super::{call_failed, connect};
use anyhow::{anyhow, Result};
use colored::*;
use mbclient_core::ClientConfig;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum CryptoCommand {
    /// Show how the data partition is protected
    #[structopt(name = "pw-type")]
    PwType,

    /// Unlock the data partition
    #[structopt(name = "decrypt")]
    Decrypt {
        #[structopt(name = "PASSWORD")]
        password: String,
    },
}

impl CryptoCommand {
    pub fn execute(self, config: &ClientConfig) -> Result<()> {
        let connection = connect(config)?;
        match self {
            Self::PwType => {
                match connection
                    .crypto_get_pw_type()
                    .map_err(|e| call_failed("crypto_get_pw_type", e))?
                {
                    Some(pw_type) => println!("{}", pw_type),
                    None => println!("{} Data partition is not encrypted.", "[INFO]".blue()),
                }
                Ok(())
            }
            Self::Decrypt { password } => {
                let unlocked = connection
                    .crypto_decrypt(&password)
                    .map_err(|e| call_failed("crypto_decrypt", e))?;
                if unlocked {
                    println!("{} Data partition decrypted.", "[SUCCESS]".green());
                    Ok(())
                } else {
                    Err(anyhow!("{} Wrong password.", "[ERROR]".red()))
                }
            }
        }
    }
}
