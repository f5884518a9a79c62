//! The provisioning workflow.
//!
//! Everything up to and including [`plan_layout`] is pure planning. The format step is
//! the single commit point; after it the only way out of a failure is to start over.

use crate::engine::Engine;
use crate::error::ErrorKind;
use crate::layout::{DeviceInfo, DiskLayout};
use crate::plan::InstallPlan;
use anyhow::Context;
use log::info;
use std::path::Path;

const STEPS: usize = 18;

/// Runs one numbered step, wrapping its failure with the step name
fn step<T, F>(number: usize, name: &str, operation: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    info!("[{}/{}] {}", number, STEPS, name);
    operation().with_context(|| format!("Step {} ({}) failed", number, name))
}

fn skip(number: usize, name: &str) {
    info!("[{}/{}] {} (skipped)", number, STEPS, name);
}

/// Plans the partitions of `device` and checks the encryption settings against them
pub fn plan_layout(plan: &InstallPlan, device: &DeviceInfo) -> Result<DiskLayout, ErrorKind> {
    let layout = DiskLayout::standard(device, &plan.config.layout)?;
    if let Some(encryption) = &plan.encryption {
        encryption.validate(&layout)?;
    }
    Ok(layout)
}

pub fn provision<E: Engine>(engine: &mut E, plan: &InstallPlan, staging: &Path) -> anyhow::Result<()> {
    let config = &plan.config;

    let device = step(1, "Finding the target device", || {
        engine
            .find_device(&config.device)?
            .ok_or_else(|| ErrorKind::DeviceNotFound(config.device.clone()).into())
    })?;

    let layout = step(2, "Planning the disk layout", || {
        plan_layout(plan, &device).map_err(anyhow::Error::from)
    })?;
    info!("Disk layout:\n{}", layout);

    step(3, "Formatting the device", || {
        engine.format(&layout, plan.encryption.as_ref())
    })?;
    step(4, "Mounting the layout", || {
        engine.mount_layout(&layout, staging)
    })?;
    step(5, "Checking the mounted layout", || {
        engine.sanity_check(&layout, config.bootloader)
    })?;

    match &plan.encryption {
        Some(encryption) => step(6, "Generating key files", || {
            engine.generate_key_files(encryption)
        })?,
        None => skip(6, "Generating key files"),
    }

    step(7, "Installing the base system", || {
        engine.minimal_installation(plan)
    })?;

    if plan.swap {
        step(8, "Setting up swap", || engine.setup_swap())?;
    } else {
        skip(8, "Setting up swap");
    }

    step(9, "Installing the bootloader", || {
        engine.install_bootloader(config.bootloader, &config.kernels)
    })?;
    step(10, "Configuring the network", || {
        engine.copy_iso_network_config()?;
        engine.install_network(config.network)
    })?;
    step(11, "Creating users", || engine.create_users(&plan.users))?;
    step(12, "Installing audio", || engine.install_audio(config.audio))?;
    step(13, "Installing packages", || {
        engine.install_packages(&config.packages)
    })?;
    step(14, "Setting the time", || {
        engine.set_timezone(&config.timezone)?;
        engine.enable_time_sync()
    })?;
    step(15, "Installing the desktop", || {
        engine.install_desktop(&config.desktop)
    })?;
    step(16, "Enabling services", || {
        engine.enable_services(&config.services)
    })?;
    step(17, "Running post-install commands", || {
        engine.run_commands(&config.commands)
    })?;
    step(18, "Generating fstab", || engine.generate_fstab())?;

    info!("Installation complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chassis::ChassisType;
    use crate::engine::recording::Recording;
    use crate::plan::{Password, Secrets};
    use crate::profiles;

    fn plan(profile: &str, encrypt: bool, chassis: ChassisType) -> InstallPlan {
        let mut config = profiles::load(profile).unwrap();
        config.encrypt = encrypt;
        InstallPlan::new(
            config,
            Secrets {
                hostname: "workstation".into(),
                user_password: Password::new("hunter2"),
                disk_password: Some(Password::new("correct horse")),
            },
            chassis,
        )
        .unwrap()
    }

    #[test]
    fn full_run() {
        let mut engine = Recording::with_device(512);
        let plan = plan("gnome-nix", true, ChassisType::Laptop);

        provision(&mut engine, &plan, Path::new("/mnt/staging")).unwrap();

        assert_eq!(
            engine.calls,
            vec![
                "find_device",
                "format",
                "mount_layout",
                "sanity_check",
                "generate_key_files",
                "minimal_installation",
                "setup_swap",
                "install_bootloader",
                "copy_iso_network_config",
                "install_network",
                "create_users",
                "install_audio",
                "install_packages",
                "set_timezone",
                "enable_time_sync",
                "install_desktop",
                "enable_services",
                "run_commands",
                "generate_fstab",
            ]
        );
        assert_eq!(engine.target.as_deref(), Some(Path::new("/mnt/staging")));
        assert_eq!(engine.packages, plan.config.packages);
        assert_eq!(engine.layout.unwrap().partitions.len(), 2);
    }

    #[test]
    fn missing_device_never_formats() {
        let mut engine = Recording::without_device();
        let plan = plan("gnome", true, ChassisType::Desktop);

        let error = provision(&mut engine, &plan, Path::new("/mnt")).unwrap_err();

        assert_eq!(
            error.downcast_ref::<ErrorKind>(),
            Some(&ErrorKind::DeviceNotFound("/dev/nvme0n1".into()))
        );
        assert_eq!(engine.calls, vec!["find_device"]);
    }

    #[test]
    fn small_device_never_formats() {
        let mut engine = Recording::with_device(4);
        let plan = plan("gnome", true, ChassisType::Desktop);

        let error = provision(&mut engine, &plan, Path::new("/mnt")).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<ErrorKind>(),
            Some(ErrorKind::InvalidLayout(_))
        ));
        assert_eq!(engine.calls, vec!["find_device"]);
        assert!(engine.layout.is_none());
    }

    #[test]
    fn swap_skipped_when_disabled() {
        let mut engine = Recording::with_device(512);
        let plan = plan("gnome-nix", true, ChassisType::Desktop);
        assert!(!plan.swap);

        provision(&mut engine, &plan, Path::new("/mnt")).unwrap();

        assert!(!engine.calls.contains(&"setup_swap"));
        assert_eq!(engine.calls.len(), 18);
    }

    #[test]
    fn key_files_only_when_encrypted() {
        let mut engine = Recording::with_device(512);
        let plan = plan("gnome", false, ChassisType::Desktop);

        provision(&mut engine, &plan, Path::new("/mnt")).unwrap();

        assert!(!engine.calls.contains(&"generate_key_files"));
        assert_eq!(engine.calls[4], "minimal_installation");
    }

    #[test]
    fn sanity_failure_stops_the_run() {
        let mut engine = Recording::with_device(512);
        engine.fail_at = Some("sanity_check");
        let plan = plan("gnome-nix-root", true, ChassisType::Laptop);

        let error = provision(&mut engine, &plan, Path::new("/mnt")).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<ErrorKind>(),
            Some(ErrorKind::SanityCheckFailed(_))
        ));
        assert!(error.to_string().contains("Step 5"));
        assert_eq!(engine.calls.last(), Some(&"sanity_check"));
        assert_eq!(engine.calls.len(), 4);
    }

    #[test]
    fn failure_is_not_retried() {
        let mut engine = Recording::with_device(512);
        engine.fail_at = Some("install_packages");
        let plan = plan("gnome", true, ChassisType::Desktop);

        assert!(provision(&mut engine, &plan, Path::new("/mnt")).is_err());
        assert_eq!(
            engine
                .calls
                .iter()
                .filter(|call| **call == "install_packages")
                .count(),
            1
        );
        assert!(!engine.calls.contains(&"generate_fstab"));
    }

    #[test]
    fn layout_planning_is_pure() {
        let plan = plan("gnome-nix-root", true, ChassisType::Desktop);
        let device = DeviceInfo {
            path: "/dev/nvme0n1".into(),
            total_size: crate::layout::Size::from_mib(256 * 1024),
            sector_size: 512,
        };

        let layout = plan_layout(&plan, &device).unwrap();
        assert_eq!(layout, plan_layout(&plan, &device).unwrap());
        assert_eq!(layout.root_subvolume().unwrap().name, "@root");
    }
}
