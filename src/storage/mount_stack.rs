use super::Filesystem;
use crate::error::ErrorKind;
use anyhow::{anyhow, Context};
use log::{debug, warn};
use nix::mount::{mount, umount, MsFlags};
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct MountStack {
    targets: Vec<PathBuf>,
}

impl MountStack {
    pub fn new() -> Self {
        MountStack {
            targets: Vec::new(),
        }
    }

    pub fn mount(
        &mut self,
        filesystem: &Filesystem,
        target: PathBuf,
        options: Option<&str>,
    ) -> nix::Result<()> {
        let source = filesystem.device();
        debug!(
            "Mounting {:?} to {:?} with {:?}",
            filesystem, target, options
        );
        mount(
            Some(source),
            &target,
            Some(filesystem.fs_type().to_mount_type()),
            MsFlags::MS_NOATIME,
            options,
        )?;
        self.targets.push(target);
        Ok(())
    }

    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    fn _umount(&mut self) -> anyhow::Result<()> {
        let mut result = Ok(());

        while let Some(target) = self.targets.pop() {
            debug!("Unmounting {}", target.display());
            if let Err(e) = umount(&target) {
                warn!("Unable to umount {}: {}", target.display(), e);
                result = Err(anyhow!(e)).context(ErrorKind::UmountFailure);
            };
        }

        result
    }

    pub fn umount(mut self) -> anyhow::Result<()> {
        self._umount()
    }
}

impl Drop for MountStack {
    fn drop(&mut self) {
        self._umount().ok();
    }
}
