use super::markers::BlockDevice;
use crate::error::ErrorKind;
use crate::plan::Password;
use crate::process::CommandExt;
use crate::tool::Tool;
use log::{debug, warn};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct EncryptedDevice {
    cryptsetup: Tool,
    name: String,
    path: PathBuf,
}

impl EncryptedDevice {
    pub fn prepare(cryptsetup: &Tool, device: &dyn BlockDevice, password: &Password) -> anyhow::Result<()> {
        debug!("Preparing encrypted device in {}", device.path().display());
        cryptsetup
            .execute()
            .args(&["luksFormat", "--type", "luks2", "--batch-mode", "--key-file=-"])
            .arg(device.path())
            .run_with_input(password.expose().as_bytes(), ErrorKind::LuksSetup)?;

        Ok(())
    }

    pub fn open(
        cryptsetup: &Tool,
        device: &dyn BlockDevice,
        name: String,
        password: &Password,
    ) -> anyhow::Result<EncryptedDevice> {
        debug!(
            "Opening encrypted device {} as {}",
            device.path().display(),
            name
        );
        cryptsetup
            .execute()
            .args(&["open", "--key-file=-"])
            .arg(device.path())
            .arg(&name)
            .run_with_input(password.expose().as_bytes(), ErrorKind::LuksOpen)?;

        let path = PathBuf::from("/dev/mapper").join(&name);
        Ok(Self {
            cryptsetup: cryptsetup.clone(),
            name,
            path,
        })
    }

    /// Enrolls `key_file` into a free keyslot of `device`, authorised by `password`
    pub fn add_key(
        cryptsetup: &Tool,
        device: &dyn BlockDevice,
        password: &Password,
        key_file: &Path,
    ) -> anyhow::Result<()> {
        debug!(
            "Adding key file {} to {}",
            key_file.display(),
            device.path().display()
        );
        cryptsetup
            .execute()
            .args(&["luksAddKey", "--batch-mode", "--key-file=-"])
            .arg(device.path())
            .arg(key_file)
            .run_with_input(password.expose().as_bytes(), ErrorKind::KeyFile)?;

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn _close(&mut self) -> anyhow::Result<()> {
        debug!("Closing encrypted device {}", self.name);
        self.cryptsetup
            .execute()
            .arg("close")
            .arg(&self.name)
            .run(ErrorKind::LuksClose)?;

        Ok(())
    }
}

impl Drop for EncryptedDevice {
    fn drop(&mut self) {
        if self._close().is_err() {
            warn!("Error closing {}", self.name);
        }
    }
}

impl BlockDevice for EncryptedDevice {
    fn path(&self) -> &Path {
        &self.path
    }
}
