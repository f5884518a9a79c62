mod chroot;
mod mount;

use crate::error::ErrorKind;
use anyhow::Context;
pub use chroot::Chroot;
pub use mount::{mount, target_path};

use std::path::PathBuf;
use std::process::Command;
use which::which;

#[derive(Debug, Clone)]
pub struct Tool {
    exec: PathBuf,
}

impl Tool {
    pub fn find(name: &'static str) -> anyhow::Result<Self> {
        Ok(Self {
            exec: which(name).context(ErrorKind::NoTool(name))?,
        })
    }

    pub fn execute(&self) -> Command {
        Command::new(&self.exec)
    }
}
