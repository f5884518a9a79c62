use super::Tool;
use crate::error::ErrorKind;
use crate::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs commands inside the installed system with arch-chroot
#[derive(Debug)]
pub struct Chroot {
    arch_chroot: Tool,
    root: PathBuf,
}

impl Chroot {
    pub fn new(arch_chroot: &Tool, root: &Path) -> Self {
        Self {
            arch_chroot: arch_chroot.clone(),
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A command running as root inside the target
    pub fn command<S: AsRef<str>>(&self, args: &[S]) -> Command {
        let mut command = self.arch_chroot.execute();
        command.arg(&self.root);
        command.args(args.iter().map(AsRef::as_ref));
        command
    }

    pub fn run<S: AsRef<str>>(&self, args: &[S], context: ErrorKind) -> anyhow::Result<()> {
        self.command(args).run(context)
    }

    /// Runs a shell snippet with bash, optionally as an unprivileged user
    pub fn shell(&self, user: Option<&str>, script: &str, context: ErrorKind) -> anyhow::Result<()> {
        let mut command = self.arch_chroot.execute();
        if let Some(user) = user {
            command.arg("-u").arg(user);
        }
        command
            .arg(&self.root)
            .args(&["bash", "-c"])
            .arg(script)
            .run(context)
    }

    pub fn enable_services<S: AsRef<str>>(
        &self,
        services: &[S],
        context: ErrorKind,
    ) -> anyhow::Result<()> {
        if services.is_empty() {
            return Ok(());
        }

        let mut command = self.command(&["systemctl", "enable"]);
        command.args(services.iter().map(AsRef::as_ref));
        command.run(context)
    }
}
