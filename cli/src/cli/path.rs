use super::{call_failed, connect, parse_mode};
use anyhow::Result;
use colored::*;
use mbclient_core::rpc::message::DeleteFlag;
use mbclient_core::ClientConfig;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum PathCommand {
    /// Copy a file
    #[structopt(name = "copy")]
    Copy {
        #[structopt(name = "SOURCE")]
        source: String,
        #[structopt(name = "TARGET")]
        target: String,
    },

    /// Delete a path
    #[structopt(name = "delete")]
    Delete {
        #[structopt(name = "PATH")]
        path: String,
        /// Delete directories and their contents
        #[structopt(short, long)]
        recursive: bool,
    },

    /// Create a directory
    #[structopt(name = "mkdir")]
    Mkdir {
        #[structopt(name = "PATH")]
        path: String,
        #[structopt(long, default_value = "755", parse(try_from_str = parse_mode))]
        mode: u32,
        /// Create missing parents
        #[structopt(short, long)]
        parents: bool,
    },

    /// Print a symlink's target
    #[structopt(name = "readlink")]
    Readlink {
        #[structopt(name = "PATH")]
        path: String,
    },

    /// Change permissions
    #[structopt(name = "chmod")]
    Chmod {
        #[structopt(name = "MODE", parse(try_from_str = parse_mode))]
        mode: u32,
        #[structopt(name = "PATH")]
        path: String,
    },

    /// Total size of a directory tree
    #[structopt(name = "size")]
    Size {
        #[structopt(name = "PATH")]
        path: String,
        /// Directory names to skip
        #[structopt(long = "exclude")]
        exclusions: Vec<String>,
    },

    /// Get or set the SELinux label of a path
    #[structopt(name = "label")]
    Label {
        #[structopt(name = "PATH")]
        path: String,
        /// New label to apply
        #[structopt(long)]
        set: Option<String>,
        /// Operate on the link itself instead of its target
        #[structopt(long)]
        no_follow: bool,
    },
}

impl PathCommand {
    pub fn execute(self, config: &ClientConfig) -> Result<()> {
        let connection = connect(config)?;
        match self {
            Self::Copy { source, target } => {
                connection
                    .path_copy(&source, &target)
                    .map_err(|e| call_failed("path_copy", e))?;
                println!("{} Copied {} to {}", "[SUCCESS]".green(), source.cyan(), target.cyan());
            }
            Self::Delete { path, recursive } => {
                let flag = if recursive {
                    DeleteFlag::Recursive
                } else {
                    DeleteFlag::Remove
                };
                connection
                    .path_delete(&path, flag)
                    .map_err(|e| call_failed("path_delete", e))?;
                println!("{} Deleted {}", "[SUCCESS]".green(), path.cyan());
            }
            Self::Mkdir {
                path,
                mode,
                parents,
            } => {
                connection
                    .path_mkdir(&path, mode, parents)
                    .map_err(|e| call_failed("path_mkdir", e))?;
                println!("{} Created {}", "[SUCCESS]".green(), path.cyan());
            }
            Self::Readlink { path } => {
                let target = connection
                    .path_readlink(&path)
                    .map_err(|e| call_failed("path_readlink", e))?;
                println!("{}", target);
            }
            Self::Chmod { mode, path } => {
                connection
                    .path_chmod(&path, mode)
                    .map_err(|e| call_failed("path_chmod", e))?;
                println!("{} {} is now {:04o}", "[SUCCESS]".green(), path.cyan(), mode);
            }
            Self::Size { path, exclusions } => {
                let excluded: Vec<&str> = exclusions.iter().map(String::as_str).collect();
                let size = connection
                    .path_get_directory_size(&path, &excluded)
                    .map_err(|e| call_failed("path_get_directory_size", e))?;
                println!("{}\t{}", size, path);
            }
            Self::Label {
                path,
                set,
                no_follow,
            } => match set {
                Some(label) => {
                    connection
                        .path_selinux_set_label(&path, &label, !no_follow)
                        .map_err(|e| call_failed("path_selinux_set_label", e))?;
                    println!("{} Labeled {} as {}", "[SUCCESS]".green(), path.cyan(), label);
                }
                None => {
                    let label = connection
                        .path_selinux_get_label(&path, !no_follow)
                        .map_err(|e| call_failed("path_selinux_get_label", e))?;
                    println!("{}", label);
                }
            },
        }
        Ok(())
    }
}
