//! The installation engine: the operations that realise a plan on a real disk.

mod arch;
#[cfg(test)]
pub mod recording;

pub use arch::ArchEngine;

use crate::layout::{DeviceInfo, DiskLayout};
use crate::plan::{
    AudioKind, Bootloader, DesktopSpec, EncryptionSpec, InstallPlan, NetworkKind,
    PostInstallCommand, UserSpec,
};
use std::path::Path;

/// Every call blocks until done. The provisioning workflow calls each operation at most
/// once, in a fixed order, and stops at the first error.
pub trait Engine {
    /// `None` when there is no device at `path`
    fn find_device(&mut self, path: &Path) -> anyhow::Result<Option<DeviceInfo>>;

    /// Partitions, encrypts and formats the device. Destroys all data on it.
    fn format(
        &mut self,
        layout: &DiskLayout,
        encryption: Option<&EncryptionSpec>,
    ) -> anyhow::Result<()>;

    fn mount_layout(&mut self, layout: &DiskLayout, target: &Path) -> anyhow::Result<()>;

    fn sanity_check(&mut self, layout: &DiskLayout, bootloader: Bootloader) -> anyhow::Result<()>;

    fn generate_key_files(&mut self, encryption: &EncryptionSpec) -> anyhow::Result<()>;

    /// Bootstraps the base system, hostname, locale and repositories
    fn minimal_installation(&mut self, plan: &InstallPlan) -> anyhow::Result<()>;

    fn setup_swap(&mut self) -> anyhow::Result<()>;

    fn install_bootloader(&mut self, bootloader: Bootloader, kernels: &[String]) -> anyhow::Result<()>;

    fn copy_iso_network_config(&mut self) -> anyhow::Result<()>;

    fn install_network(&mut self, network: NetworkKind) -> anyhow::Result<()>;

    fn create_users(&mut self, users: &[UserSpec]) -> anyhow::Result<()>;

    fn install_audio(&mut self, audio: AudioKind) -> anyhow::Result<()>;

    fn install_packages(&mut self, packages: &[String]) -> anyhow::Result<()>;

    fn set_timezone(&mut self, timezone: &str) -> anyhow::Result<()>;

    fn enable_time_sync(&mut self) -> anyhow::Result<()>;

    fn install_desktop(&mut self, desktop: &DesktopSpec) -> anyhow::Result<()>;

    fn enable_services(&mut self, services: &[String]) -> anyhow::Result<()>;

    fn run_commands(&mut self, commands: &[PostInstallCommand]) -> anyhow::Result<()>;

    fn generate_fstab(&mut self) -> anyhow::Result<()>;
}
