use super::{call_failed, connect, parse_mode};
use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use colored::*;
use mbclient_core::rpc::message::{FileOpenFlag, StatRecord};
use mbclient_core::{ClientConfig, Connection};
use std::io::{Read, Write};
use structopt::StructOpt;

/// Bytes requested per read call.
const READ_CHUNK: u64 = 64 * 1024;

#[derive(StructOpt, Debug)]
pub enum FileCommand {
    /// Print stat information for a file
    #[structopt(name = "stat")]
    Stat {
        #[structopt(name = "PATH")]
        path: String,
    },

    /// Copy a file's contents to stdout
    #[structopt(name = "cat")]
    Cat {
        #[structopt(name = "PATH")]
        path: String,
    },

    /// Write stdin into a file, creating or truncating it
    #[structopt(name = "put")]
    Put {
        #[structopt(name = "PATH")]
        path: String,
        /// Permissions for a newly created file (octal)
        #[structopt(long, default_value = "644", parse(try_from_str = parse_mode))]
        mode: u32,
    },
}

impl FileCommand {
    pub fn execute(self, config: &ClientConfig) -> Result<()> {
        let connection = connect(config)?;
        match self {
            Self::Stat { path } => {
                let id = connection
                    .file_open(&path, &[FileOpenFlag::RdOnly], 0)
                    .map_err(|e| call_failed("file_open", e))?;
                let stat = connection.file_stat(id);
                let label = connection.file_selinux_get_label(id);
                close(&connection, id);

                print_stat(&path, &stat.map_err(|e| call_failed("file_stat", e))?);
                match label {
                    Ok(label) => println!("  Context: {}", label),
                    Err(e) => log::debug!("No SELinux label for {}: {}", path, e),
                }
                Ok(())
            }
            Self::Cat { path } => {
                let id = connection
                    .file_open(&path, &[FileOpenFlag::RdOnly], 0)
                    .map_err(|e| call_failed("file_open", e))?;
                let result = copy_to_stdout(&connection, id);
                close(&connection, id);
                result
            }
            Self::Put { path, mode } => {
                let mut data = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut data)
                    .context("Failed to read stdin")?;
                let id = connection
                    .file_open(
                        &path,
                        &[FileOpenFlag::WrOnly, FileOpenFlag::Creat, FileOpenFlag::Trunc],
                        mode,
                    )
                    .map_err(|e| call_failed("file_open", e))?;
                let result = write_all(&connection, id, &data);
                close(&connection, id);
                result?;
                println!(
                    "{} Wrote {} bytes to {}",
                    "[SUCCESS]".green(),
                    data.len(),
                    path.cyan()
                );
                Ok(())
            }
        }
    }
}

fn close(connection: &Connection, id: i32) {
    if let Err(e) = connection.file_close(id) {
        log::warn!("Failed to close remote descriptor {}: {}", id, e);
    }
}

fn copy_to_stdout(connection: &Connection, id: i32) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    loop {
        let chunk = connection
            .file_read(id, READ_CHUNK)
            .map_err(|e| call_failed("file_read", e))?;
        if chunk.is_empty() {
            break;
        }
        out.write_all(&chunk)?;
    }
    out.flush()?;
    Ok(())
}

fn write_all(connection: &Connection, id: i32, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        let written = connection
            .file_write(id, data)
            .map_err(|e| call_failed("file_write", e))?;
        if written == 0 {
            return Err(anyhow::anyhow!("{} Daemon wrote no bytes", "[ERROR]".red()));
        }
        data = &data[(written as usize).min(data.len())..];
    }
    Ok(())
}

fn format_time(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

fn print_stat(path: &str, stat: &StatRecord) {
    let kind = if stat.is_dir() {
        "directory"
    } else if stat.is_symlink() {
        "symbolic link"
    } else {
        "file"
    };
    println!("  File: {} ({})", path.cyan(), kind);
    println!(
        "  Size: {:<12} Blocks: {:<10} IO Block: {}",
        stat.st_size, stat.st_blocks, stat.st_blksize
    );
    println!(
        "Device: {:<12} Inode: {:<11} Links: {}",
        stat.st_dev, stat.st_ino, stat.st_nlink
    );
    println!(
        "Access: ({:04o})     Uid: {:<13} Gid: {}",
        stat.permissions(),
        stat.st_uid,
        stat.st_gid
    );
    println!("Access: {}", format_time(stat.st_atime));
    println!("Modify: {}", format_time(stat.st_mtime));
    println!("Change: {}", format_time(stat.st_ctime));
}
