use super::{call_failed, connect};
use anyhow::{anyhow, Result};
use colored::*;
use mbclient_core::rpc::message::{SwitchRomResult, WipeTarget};
use mbclient_core::ClientConfig;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum RomCommand {
    /// List installed ROMs
    #[structopt(name = "list")]
    List,

    /// Show the ID of the booted ROM
    #[structopt(name = "booted")]
    Booted,

    /// Switch the active ROM
    #[structopt(name = "switch")]
    Switch {
        #[structopt(name = "ROM_ID")]
        rom_id: String,
        #[structopt(long, default_value = "/dev/block/bootdevice/by-name/boot")]
        boot_blockdev: String,
        /// Directories searched for block devices
        #[structopt(long = "blockdev-dir", default_value = "/dev/block/bootdevice/by-name")]
        blockdev_dirs: Vec<String>,
        /// Accept a kernel whose checksum is unknown or changed
        #[structopt(long)]
        force: bool,
    },

    /// Make the given ROM's kernel the active one
    #[structopt(name = "set-kernel")]
    SetKernel {
        #[structopt(name = "ROM_ID")]
        rom_id: String,
        #[structopt(long, default_value = "/dev/block/bootdevice/by-name/boot")]
        boot_blockdev: String,
    },

    /// Wipe parts of a ROM
    #[structopt(name = "wipe")]
    Wipe {
        #[structopt(name = "ROM_ID")]
        rom_id: String,
        /// system, cache, data, dalvik-cache or multiboot
        #[structopt(name = "TARGETS", min_values = 1, parse(try_from_str = parse_target))]
        targets: Vec<WipeTarget>,
    },

    /// Count the packages installed in a ROM
    #[structopt(name = "packages")]
    Packages {
        #[structopt(name = "ROM_ID")]
        rom_id: String,
    },
}

fn parse_target(text: &str) -> Result<WipeTarget, String> {
    match text {
        "system" => Ok(WipeTarget::System),
        "cache" => Ok(WipeTarget::Cache),
        "data" => Ok(WipeTarget::Data),
        "dalvik-cache" => Ok(WipeTarget::DalvikCache),
        "multiboot" => Ok(WipeTarget::MultibootDir),
        other => Err(format!("unknown wipe target '{}'", other)),
    }
}

impl RomCommand {
    pub fn execute(self, config: &ClientConfig) -> Result<()> {
        let connection = connect(config)?;
        match self {
            Self::List => {
                let roms = connection
                    .get_installed_roms()
                    .map_err(|e| call_failed("get_installed_roms", e))?;
                if roms.is_empty() {
                    println!("{} No ROMs reported by daemon.", "[INFO]".blue());
                    return Ok(());
                }
                println!(
                    "{}",
                    format!(
                        "{:<20} {:<25} {:<15} {:<20}",
                        "ID".bold(),
                        "Name".bold(),
                        "Version".bold(),
                        "Build".bold()
                    )
                    .underline()
                );
                for rom in roms {
                    println!(
                        "{:<20} {:<25} {:<15} {:<20}",
                        rom.id.cyan(),
                        rom.name.as_deref().unwrap_or("-"),
                        rom.version.as_deref().unwrap_or("-"),
                        rom.build.as_deref().unwrap_or("-")
                    );
                }
                Ok(())
            }
            Self::Booted => {
                match connection
                    .get_booted_rom_id()
                    .map_err(|e| call_failed("get_booted_rom_id", e))?
                {
                    Some(id) => println!("{}", id.green().bold()),
                    None => println!("{} Daemon could not determine the booted ROM.", "[WARN]".yellow()),
                }
                Ok(())
            }
            Self::Switch {
                rom_id,
                boot_blockdev,
                blockdev_dirs,
                force,
            } => {
                let dirs: Vec<&str> = blockdev_dirs.iter().map(String::as_str).collect();
                let result = connection
                    .switch_rom(&rom_id, &boot_blockdev, &dirs, force)
                    .map_err(|e| call_failed("switch_rom", e))?;
                match result {
                    SwitchRomResult::Succeeded => {
                        println!("{} Switched to {}.", "[SUCCESS]".green(), rom_id.cyan());
                        Ok(())
                    }
                    SwitchRomResult::ChecksumNotFound => Err(anyhow!(
                        "{} No kernel checksum recorded for {}; rerun with --force to trust it.",
                        "[ERROR]".red(),
                        rom_id
                    )),
                    SwitchRomResult::ChecksumInvalid => Err(anyhow!(
                        "{} Kernel of {} was modified; rerun with --force to accept it.",
                        "[ERROR]".red(),
                        rom_id
                    )),
                    SwitchRomResult::Failed => {
                        Err(anyhow!("{} Failed to switch to {}.", "[ERROR]".red(), rom_id))
                    }
                }
            }
            Self::SetKernel {
                rom_id,
                boot_blockdev,
            } => {
                connection
                    .set_kernel(&rom_id, &boot_blockdev)
                    .map_err(|e| call_failed("set_kernel", e))?;
                println!("{} Kernel of {} is now active.", "[SUCCESS]".green(), rom_id.cyan());
                Ok(())
            }
            Self::Wipe { rom_id, targets } => {
                let result = connection
                    .wipe_rom(&rom_id, &targets)
                    .map_err(|e| call_failed("wipe_rom", e))?;
                for target in &result.succeeded {
                    println!("{} Wiped {:?}", "[SUCCESS]".green(), target);
                }
                for target in &result.failed {
                    println!("{} Failed to wipe {:?}", "[ERROR]".red(), target);
                }
                if result.is_complete() {
                    Ok(())
                } else {
                    Err(anyhow!(
                        "{} {} of {} targets could not be wiped",
                        "[ERROR]".red(),
                        result.failed.len(),
                        targets.len()
                    ))
                }
            }
            Self::Packages { rom_id } => {
                let counts = connection
                    .get_packages_count(&rom_id)
                    .map_err(|e| call_failed("get_packages_count", e))?;
                println!("System packages:         {}", counts.system_packages);
                println!("Updated system packages: {}", counts.system_update_packages);
                println!("Other packages:          {}", counts.non_system_packages);
                Ok(())
            }
        }
    }
}
