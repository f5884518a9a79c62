use super::Engine;
use crate::error::ErrorKind;
use crate::layout::{DeviceInfo, DiskLayout, Size};
use crate::plan::{
    AudioKind, Bootloader, DesktopSpec, EncryptionSpec, InstallPlan, NetworkKind,
    PostInstallCommand, UserSpec,
};
use anyhow::anyhow;
use std::path::Path;

/// Records the operations it is asked to perform
pub struct Recording {
    pub device: Option<DeviceInfo>,
    pub fail_at: Option<&'static str>,
    pub calls: Vec<&'static str>,
    pub layout: Option<DiskLayout>,
    pub target: Option<std::path::PathBuf>,
    pub packages: Vec<String>,
}

impl Recording {
    pub fn with_device(total_gib: u64) -> Self {
        Self {
            device: Some(DeviceInfo {
                path: "/dev/nvme0n1".into(),
                total_size: Size::from_mib(total_gib * 1024),
                sector_size: 512,
            }),
            fail_at: None,
            calls: Vec::new(),
            layout: None,
            target: None,
            packages: Vec::new(),
        }
    }

    pub fn without_device() -> Self {
        Self {
            device: None,
            ..Self::with_device(0)
        }
    }

    fn record(&mut self, call: &'static str) -> anyhow::Result<()> {
        self.calls.push(call);
        if self.fail_at == Some(call) {
            if call == "sanity_check" {
                return Err(ErrorKind::SanityCheckFailed("/home is not mounted".into()).into());
            }
            return Err(anyhow!("{} failed", call));
        }
        Ok(())
    }
}

impl Engine for Recording {
    fn find_device(&mut self, _path: &Path) -> anyhow::Result<Option<DeviceInfo>> {
        self.record("find_device")?;
        Ok(self.device.clone())
    }

    fn format(&mut self, layout: &DiskLayout, _: Option<&EncryptionSpec>) -> anyhow::Result<()> {
        self.layout = Some(layout.clone());
        self.record("format")
    }

    fn mount_layout(&mut self, _: &DiskLayout, target: &Path) -> anyhow::Result<()> {
        self.target = Some(target.to_path_buf());
        self.record("mount_layout")
    }

    fn sanity_check(&mut self, _: &DiskLayout, _: Bootloader) -> anyhow::Result<()> {
        self.record("sanity_check")
    }

    fn generate_key_files(&mut self, _: &EncryptionSpec) -> anyhow::Result<()> {
        self.record("generate_key_files")
    }

    fn minimal_installation(&mut self, _: &InstallPlan) -> anyhow::Result<()> {
        self.record("minimal_installation")
    }

    fn setup_swap(&mut self) -> anyhow::Result<()> {
        self.record("setup_swap")
    }

    fn install_bootloader(&mut self, _: Bootloader, _: &[String]) -> anyhow::Result<()> {
        self.record("install_bootloader")
    }

    fn copy_iso_network_config(&mut self) -> anyhow::Result<()> {
        self.record("copy_iso_network_config")
    }

    fn install_network(&mut self, _: NetworkKind) -> anyhow::Result<()> {
        self.record("install_network")
    }

    fn create_users(&mut self, _: &[UserSpec]) -> anyhow::Result<()> {
        self.record("create_users")
    }

    fn install_audio(&mut self, _: AudioKind) -> anyhow::Result<()> {
        self.record("install_audio")
    }

    fn install_packages(&mut self, packages: &[String]) -> anyhow::Result<()> {
        self.packages = packages.to_vec();
        self.record("install_packages")
    }

    fn set_timezone(&mut self, _: &str) -> anyhow::Result<()> {
        self.record("set_timezone")
    }

    fn enable_time_sync(&mut self) -> anyhow::Result<()> {
        self.record("enable_time_sync")
    }

    fn install_desktop(&mut self, _: &DesktopSpec) -> anyhow::Result<()> {
        self.record("install_desktop")
    }

    fn enable_services(&mut self, _: &[String]) -> anyhow::Result<()> {
        self.record("enable_services")
    }

    fn run_commands(&mut self, _: &[PostInstallCommand]) -> anyhow::Result<()> {
        self.record("run_commands")
    }

    fn generate_fstab(&mut self) -> anyhow::Result<()> {
        self.record("generate_fstab")
    }
}
