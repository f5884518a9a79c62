use super::Engine;
use crate::bootloader::{self, RootDevice};
use crate::constants::{
    BASE_PACKAGES, KEY_FILE_DIRECTORY, KEY_FILE_SIZE, ROOT_MAPPER_NAME, WHEEL_SUDOERS,
    ZRAM_GENERATOR_CONF,
};
use crate::error::ErrorKind;
use crate::initcpio::Initcpio;
use crate::layout::{DeviceInfo, DiskLayout, PartitionRole, PartitionSpec};
use crate::pacman;
use crate::plan::{
    AudioKind, Bootloader, DesktopSpec, EncryptionSpec, InstallPlan, NetworkKind,
    PostInstallCommand, UserSpec,
};
use crate::process::CommandExt;
use crate::storage::{
    create_subvolumes, BlockDevice, EncryptedDevice, Filesystem, MountStack, Partition,
    StorageDevice,
};
use crate::tool::{self, Chroot, Tool};
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

struct Tools {
    sgdisk: Tool,
    partprobe: Tool,
    mkfat: Tool,
    mkbtrfs: Tool,
    btrfs: Tool,
    cryptsetup: Tool,
    pacstrap: Tool,
    arch_chroot: Tool,
    genfstab: Tool,
    blkid: Tool,
    mountpoint: Tool,
}

impl Tools {
    fn find() -> anyhow::Result<Self> {
        Ok(Self {
            sgdisk: Tool::find("sgdisk")?,
            partprobe: Tool::find("partprobe")?,
            mkfat: Tool::find("mkfs.fat")?,
            mkbtrfs: Tool::find("mkfs.btrfs")?,
            btrfs: Tool::find("btrfs")?,
            cryptsetup: Tool::find("cryptsetup")?,
            pacstrap: Tool::find("pacstrap")?,
            arch_chroot: Tool::find("arch-chroot")?,
            genfstab: Tool::find("genfstab")?,
            blkid: Tool::find("blkid")?,
            mountpoint: Tool::find("mountpoint")?,
        })
    }
}

/// The mounted target system
struct Installation {
    chroot: Chroot,
    mounts: MountStack,
}

/// Installs Arch Linux with the tools of the live environment.
///
/// Field order matters: the target is unmounted before the LUKS mapping is closed.
pub struct ArchEngine {
    tools: Tools,
    device: Option<StorageDevice>,
    boot: Option<Filesystem>,
    root: Option<Filesystem>,
    partitions: Vec<(PartitionRole, Partition)>,
    root_subvolume: Option<String>,
    installation: Option<Installation>,
    encrypted: Option<EncryptedDevice>,
}

impl ArchEngine {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            tools: Tools::find()?,
            device: None,
            boot: None,
            root: None,
            partitions: Vec::new(),
            root_subvolume: None,
            installation: None,
            encrypted: None,
        })
    }

    /// Unmounts the target and closes the encrypted device, reporting unmount errors
    pub fn finish(mut self) -> anyhow::Result<()> {
        if let Some(installation) = self.installation.take() {
            info!("Unmounting filesystems");
            installation.mounts.umount()?;
        }
        self.encrypted.take();
        Ok(())
    }

    fn installation(&self) -> anyhow::Result<&Installation> {
        self.installation
            .as_ref()
            .ok_or_else(|| anyhow!("The target system is not mounted"))
    }

    fn chroot(&self) -> anyhow::Result<&Chroot> {
        Ok(&self.installation()?.chroot)
    }

    fn target(&self, path: &str) -> anyhow::Result<PathBuf> {
        Ok(tool::target_path(self.chroot()?.root(), Path::new(path)))
    }

    /// Installs packages into the target with its own pacman configuration
    fn pacman<S: AsRef<str>>(&self, packages: &[S], context: ErrorKind) -> anyhow::Result<()> {
        if packages.is_empty() {
            return Ok(());
        }

        let mut command = self
            .chroot()?
            .command(&["pacman", "-S", "--needed", "--noconfirm"]);
        command.args(packages.iter().map(AsRef::as_ref));
        command.run(context)
    }

    fn uuid(&self, device: &Path, context: ErrorKind) -> anyhow::Result<String> {
        let uuid = self
            .tools
            .blkid
            .execute()
            .args(&["-s", "UUID", "-o", "value"])
            .arg(device)
            .run_text_output(context.clone())?;

        let uuid = uuid.trim();
        if uuid.is_empty() {
            return Err(anyhow!("{} has no UUID", device.display())).context(context);
        }
        Ok(uuid.to_string())
    }

    fn partition(&self, role: PartitionRole) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|(partition_role, _)| *partition_role == role)
            .map(|(_, partition)| partition)
    }

    fn root_device(&self) -> anyhow::Result<RootDevice> {
        match (&self.encrypted, self.partition(PartitionRole::Root), &self.root) {
            (Some(encrypted), Some(partition), _) => Ok(RootDevice::Encrypted {
                luks_uuid: self.uuid(partition.path(), ErrorKind::Bootloader)?,
                mapper_name: encrypted.name().to_string(),
            }),
            (None, _, Some(root)) => Ok(RootDevice::Plain {
                fs_uuid: self.uuid(root.device(), ErrorKind::Bootloader)?,
            }),
            _ => Err(anyhow!("The root filesystem was never created")).context(ErrorKind::Bootloader),
        }
    }

    fn install_systemd_boot(&self, kernels: &[String], options: &str) -> anyhow::Result<()> {
        let default_kernel = kernels
            .first()
            .ok_or_else(|| anyhow!("No kernel to boot"))
            .context(ErrorKind::Bootloader)?;

        self.chroot()?
            .run(&["bootctl", "--esp-path=/boot", "install"], ErrorKind::Bootloader)?;

        let entries = self.target("/boot/loader/entries")?;
        fs::create_dir_all(&entries).context(ErrorKind::Bootloader)?;
        fs::write(
            self.target("/boot/loader/loader.conf")?,
            bootloader::loader_conf(default_kernel),
        )
        .context(ErrorKind::Bootloader)?;

        for kernel in kernels {
            fs::write(
                entries.join(bootloader::entry_name(kernel)),
                bootloader::loader_entry(kernel, options),
            )
            .context(ErrorKind::Bootloader)?;
        }

        Ok(())
    }

    fn install_grub(&self, options: &str) -> anyhow::Result<()> {
        self.pacman(&["grub"], ErrorKind::Bootloader)?;

        rewrite_grub_defaults(&self.target("/etc/default/grub")?, options)?;

        let chroot = self.chroot()?;
        chroot.run(
            &[
                "grub-install",
                "--target=x86_64-efi",
                "--efi-directory=/boot",
                "--bootloader-id=GRUB",
            ],
            ErrorKind::Bootloader,
        )?;
        chroot.run(
            &["grub-mkconfig", "-o", "/boot/grub/grub.cfg"],
            ErrorKind::Bootloader,
        )
    }
}

/// sgdisk arguments creating partition `index` at its exact sectors
fn partition_args(index: u8, spec: &PartitionSpec, sector_size: u64, encrypted: bool) -> Vec<String> {
    let first = spec.start.sectors(sector_size);
    let end = spec.end().map_or(first, |end| end.sectors(sector_size));
    let (typecode, name) = match spec.role {
        PartitionRole::Boot => ("EF00", "EFI"),
        PartitionRole::Root if encrypted => ("8309", ROOT_MAPPER_NAME),
        PartitionRole::Root => ("8300", "root"),
    };

    vec![
        format!("--new={}:{}:{}", index, first, end.saturating_sub(1)),
        format!("--typecode={}:{}", index, typecode),
        format!("--change-name={}:{}", index, name),
    ]
}

/// Puts the kernel options into the grub defaults installed by the grub package
fn rewrite_grub_defaults(path: &Path, options: &str) -> anyhow::Result<()> {
    let defaults = fs::read_to_string(path).context(ErrorKind::Bootloader)?;
    fs::write(path, bootloader::grub_defaults(&defaults, options)).context(ErrorKind::Bootloader)
}

/// Encrypted partitions that get a key file. Root never does: it is unlocked with the
/// passphrase at boot and then holds the keys of the others.
fn key_file_roles(encryption: &EncryptionSpec) -> Vec<PartitionRole> {
    encryption
        .partitions
        .iter()
        .copied()
        .filter(|role| *role != PartitionRole::Root)
        .collect()
}

/// Writes `KEY_FILE_SIZE` random bytes readable by root only
fn write_key_file(path: &Path) -> anyhow::Result<()> {
    let mut key = vec![0u8; KEY_FILE_SIZE];
    OsRng.fill_bytes(&mut key);
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o400)
        .open(path)
        .and_then(|mut file| file.write_all(&key))
        .context(ErrorKind::KeyFile)
}

/// Copies the regular files of `source` matching `filter` into `destination`
fn copy_files<F: Fn(&Path) -> bool>(
    source: &Path,
    destination: &Path,
    filter: F,
) -> anyhow::Result<usize> {
    if !source.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in fs::read_dir(source).context(ErrorKind::Network)? {
        let path = entry.context(ErrorKind::Network)?.path();
        if !path.is_file() || !filter(&path) {
            continue;
        }

        if let Some(file_name) = path.file_name() {
            fs::create_dir_all(destination).context(ErrorKind::Network)?;
            fs::copy(&path, destination.join(file_name)).context(ErrorKind::Network)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn hosts(hostname: &str) -> String {
    format!(
        "127.0.0.1 localhost\n::1 localhost\n127.0.1.1 {host}.localdomain {host}\n",
        host = hostname
    )
}

impl Engine for ArchEngine {
    fn find_device(&mut self, path: &Path) -> anyhow::Result<Option<DeviceInfo>> {
        if !path.exists() {
            return Ok(None);
        }

        let device = StorageDevice::from_path(path)?;
        let info = device.info()?;
        self.device = Some(device);
        Ok(Some(info))
    }

    fn format(
        &mut self,
        layout: &DiskLayout,
        encryption: Option<&EncryptionSpec>,
    ) -> anyhow::Result<()> {
        let device = self
            .device
            .clone()
            .ok_or_else(|| ErrorKind::DeviceNotFound(layout.device.clone()))?;

        info!("Partitioning {}", layout.device.display());
        self.tools
            .sgdisk
            .execute()
            .arg("--zap-all")
            .arg(&layout.device)
            .run(ErrorKind::Partitioning)?;

        let mut sgdisk = self.tools.sgdisk.execute();
        sgdisk.arg("--clear");
        for (index, spec) in layout.partitions.iter().enumerate() {
            sgdisk.args(partition_args(
                index as u8 + 1,
                spec,
                layout.sector_size,
                encryption.is_some(),
            ));
        }
        sgdisk.arg(&layout.device).run(ErrorKind::Partitioning)?;

        self.tools
            .partprobe
            .execute()
            .arg(&layout.device)
            .run(ErrorKind::Partitioning)?;

        thread::sleep(Duration::from_millis(1000));

        let (boot_index, boot_spec) = layout
            .partition(PartitionRole::Boot)
            .ok_or_else(|| ErrorKind::InvalidLayout("no boot partition".into()))?;
        let (root_index, root_spec) = layout
            .partition(PartitionRole::Root)
            .ok_or_else(|| ErrorKind::InvalidLayout("no root partition".into()))?;

        info!("Formatting filesystems");
        let boot_partition = device.get_partition(boot_index)?;
        let boot = Filesystem::format(&boot_partition, boot_spec.fs_type, &self.tools.mkfat)?;

        let root_partition = device.get_partition(root_index)?;
        let encrypted = match encryption {
            Some(encryption) => {
                info!("Encrypting the root partition");
                EncryptedDevice::prepare(
                    &self.tools.cryptsetup,
                    &root_partition,
                    &encryption.password,
                )?;
                Some(EncryptedDevice::open(
                    &self.tools.cryptsetup,
                    &root_partition,
                    ROOT_MAPPER_NAME.to_string(),
                    &encryption.password,
                )?)
            }
            None => None,
        };

        let root_block = encrypted
            .as_ref()
            .map_or(&root_partition as &dyn BlockDevice, |e| e as &dyn BlockDevice);
        let root = Filesystem::format(root_block, root_spec.fs_type, &self.tools.mkbtrfs)?;

        create_subvolumes(&self.tools.btrfs, &root, &root_spec.subvolumes)?;

        self.root_subvolume = layout.root_subvolume().map(|s| s.name.clone());
        self.boot = Some(boot);
        self.root = Some(root);
        self.partitions = vec![
            (PartitionRole::Boot, boot_partition),
            (PartitionRole::Root, root_partition),
        ];
        self.encrypted = encrypted;
        Ok(())
    }

    fn mount_layout(&mut self, layout: &DiskLayout, target: &Path) -> anyhow::Result<()> {
        let (boot, root) = match (&self.boot, &self.root) {
            (Some(boot), Some(root)) => (boot, root),
            _ => return Err(anyhow!("The device was not formatted")).context(ErrorKind::Mounting),
        };
        let (_, root_spec) = layout
            .partition(PartitionRole::Root)
            .ok_or_else(|| ErrorKind::InvalidLayout("no root partition".into()))?;

        let mounts = tool::mount(
            target,
            boot,
            root,
            &root_spec.subvolumes,
            &root_spec.mount_options,
        )?;

        self.installation = Some(Installation {
            chroot: Chroot::new(&self.tools.arch_chroot, target),
            mounts,
        });
        Ok(())
    }

    fn sanity_check(&mut self, layout: &DiskLayout, bootloader: Bootloader) -> anyhow::Result<()> {
        let installation = self.installation()?;
        debug!("Mounted: {:?}", installation.mounts.targets());

        for mountpoint in layout.mountpoints() {
            let path = tool::target_path(installation.chroot.root(), &mountpoint);
            let mounted = self
                .tools
                .mountpoint
                .execute()
                .arg("-q")
                .arg(&path)
                .status()
                .map(|status| status.success())
                .unwrap_or(false);

            if !mounted {
                return Err(ErrorKind::SanityCheckFailed(format!(
                    "{} is not mounted",
                    mountpoint.display()
                ))
                .into());
            }
        }

        if !Path::new("/sys/firmware/efi").exists() {
            return Err(ErrorKind::SanityCheckFailed(format!(
                "{:?} needs the live environment to be booted in UEFI mode",
                bootloader
            ))
            .into());
        }

        Ok(())
    }

    fn generate_key_files(&mut self, encryption: &EncryptionSpec) -> anyhow::Result<()> {
        let roles = key_file_roles(encryption);
        if roles.is_empty() {
            info!("The root partition is unlocked with its passphrase, no key files needed");
            return Ok(());
        }

        let directory = self.target(KEY_FILE_DIRECTORY)?;
        DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&directory)
            .context(ErrorKind::KeyFile)?;

        for role in roles {
            let partition = self
                .partition(role)
                .ok_or_else(|| anyhow!("No {:?} partition was created", role))
                .context(ErrorKind::KeyFile)?;

            let key_file = directory.join(format!("{:?}.key", role).to_lowercase());
            info!("Generating key file {}", key_file.display());
            write_key_file(&key_file)?;

            EncryptedDevice::add_key(
                &self.tools.cryptsetup,
                partition,
                &encryption.password,
                &key_file,
            )?;
        }

        Ok(())
    }

    fn minimal_installation(&mut self, plan: &InstallPlan) -> anyhow::Result<()> {
        let config = &plan.config;
        let root = self.chroot()?.root().to_path_buf();

        if !config.mirrors.is_empty() {
            info!("Writing the mirror list");
            fs::write("/etc/pacman.d/mirrorlist", config.mirrors.to_mirrorlist())
                .context(ErrorKind::Pacstrap)?;
        }

        info!("Bootstrapping system");
        self.tools
            .pacstrap
            .execute()
            .arg("-K")
            .arg(&root)
            .args(BASE_PACKAGES.iter())
            .args(config.kernels.iter())
            .run(ErrorKind::Pacstrap)?;

        let repositories = pacman::optional_repositories(config.enable_testing, config.enable_multilib);
        if !repositories.is_empty() {
            info!("Enabling repositories: {}", repositories.join(", "));
            let pacman_conf = self.target("/etc/pacman.conf")?;
            let existing = fs::read_to_string(&pacman_conf).context(ErrorKind::Repositories)?;
            fs::write(
                &pacman_conf,
                pacman::enable_repositories(&existing, &repositories),
            )
            .context(ErrorKind::Repositories)?;
            self.chroot()?
                .run(&["pacman", "-Sy"], ErrorKind::Repositories)?;
        }

        info!("Setting the hostname to {}", plan.hostname);
        fs::write(self.target("/etc/hostname")?, format!("{}\n", plan.hostname))
            .context(ErrorKind::Hostname)?;
        fs::write(self.target("/etc/hosts")?, hosts(&plan.hostname)).context(ErrorKind::Hostname)?;

        info!("Configuring the locale {}", config.locale.lang());
        let locale_gen = self.target("/etc/locale.gen")?;
        let existing = fs::read_to_string(&locale_gen).context(ErrorKind::Locale)?;
        fs::write(&locale_gen, config.locale.enable_in_locale_gen(&existing))
            .context(ErrorKind::Locale)?;
        self.chroot()?.run(&["locale-gen"], ErrorKind::Locale)?;
        fs::write(
            self.target("/etc/locale.conf")?,
            format!("LANG={}\n", config.locale.lang()),
        )
        .context(ErrorKind::Locale)?;
        fs::write(
            self.target("/etc/vconsole.conf")?,
            format!("KEYMAP={}\n", config.locale.keyboard_layout),
        )
        .context(ErrorKind::Locale)?;

        info!("Generating initramfs");
        let initcpio = Initcpio::new(plan.encryption.is_some());
        fs::write(self.target("/etc/mkinitcpio.conf")?, initcpio.to_config())
            .context(ErrorKind::Initramfs)?;
        self.chroot()?.run(&["mkinitcpio", "-P"], ErrorKind::Initramfs)
    }

    fn setup_swap(&mut self) -> anyhow::Result<()> {
        info!("Setting up zram swap");
        self.pacman(&["zram-generator"], ErrorKind::Swap)?;
        fs::write(
            self.target("/etc/systemd/zram-generator.conf")?,
            ZRAM_GENERATOR_CONF,
        )
        .context(ErrorKind::Swap)
    }

    fn install_bootloader(&mut self, bootloader: Bootloader, kernels: &[String]) -> anyhow::Result<()> {
        let subvolume = self
            .root_subvolume
            .clone()
            .ok_or_else(|| anyhow!("No subvolume is mounted at /"))
            .context(ErrorKind::Bootloader)?;
        let options = bootloader::kernel_options(&self.root_device()?, &subvolume);
        debug!("Kernel options: {}", options);

        info!("Installing the bootloader ({:?})", bootloader);
        match bootloader {
            Bootloader::SystemdBoot => self.install_systemd_boot(kernels, &options),
            Bootloader::Grub => self.install_grub(&options),
        }
    }

    fn copy_iso_network_config(&mut self) -> anyhow::Result<()> {
        let wifi = copy_files(
            Path::new("/var/lib/iwd"),
            &self.target("/var/lib/iwd")?,
            |path| path.extension().map_or(false, |e| e == "psk"),
        )?;
        let networks = copy_files(
            Path::new("/etc/systemd/network"),
            &self.target("/etc/systemd/network")?,
            |_| true,
        )?;

        if wifi + networks == 0 {
            warn!("The live environment has no network configuration to copy");
        } else {
            info!("Copied {} network configuration files", wifi + networks);
        }
        Ok(())
    }

    fn install_network(&mut self, network: NetworkKind) -> anyhow::Result<()> {
        info!("Configuring the network with {:?}", network);
        let (packages, services): (&[&str], &[&str]) = match network {
            NetworkKind::NetworkManager => (&["networkmanager"], &["NetworkManager"]),
            NetworkKind::CopyIso => (&["iwd"], &["systemd-networkd", "systemd-resolved", "iwd"]),
        };

        self.pacman(packages, ErrorKind::Network)?;
        self.chroot()?.enable_services(services, ErrorKind::Network)
    }

    fn create_users(&mut self, users: &[UserSpec]) -> anyhow::Result<()> {
        let chroot = self.chroot()?;

        for user in users {
            info!("Creating user {}", user.username);
            let mut useradd = chroot.command(&["useradd", "-m", "-s", "/bin/bash"]);
            if user.admin {
                useradd.args(&["-G", "wheel"]);
            }
            useradd.arg(&user.username).run(ErrorKind::Users)?;

            chroot.command(&["chpasswd"]).run_with_input(
                format!("{}:{}\n", user.username, user.password.expose()).as_bytes(),
                ErrorKind::Users,
            )?;
        }

        if users.iter().any(|user| user.admin) {
            let sudoers = self.target("/etc/sudoers.d/00_wheel")?;
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o440)
                .open(&sudoers)
                .and_then(|mut file| file.write_all(WHEEL_SUDOERS.as_bytes()))
                .context(ErrorKind::Users)?;
        }

        Ok(())
    }

    fn install_audio(&mut self, audio: AudioKind) -> anyhow::Result<()> {
        info!("Installing audio: {:?}", audio);
        self.pacman(audio.packages(), ErrorKind::Packages)
    }

    fn install_packages(&mut self, packages: &[String]) -> anyhow::Result<()> {
        info!("Installing {} additional packages", packages.len());
        self.pacman(packages, ErrorKind::Packages)
    }

    fn set_timezone(&mut self, timezone: &str) -> anyhow::Result<()> {
        let zoneinfo = Path::new("/usr/share/zoneinfo").join(timezone);
        if !tool::target_path(self.chroot()?.root(), &zoneinfo).exists() {
            return Err(anyhow!("Unknown timezone {}", timezone)).context(ErrorKind::Timezone);
        }

        info!("Setting the timezone to {}", timezone);
        let zoneinfo = zoneinfo.to_string_lossy().into_owned();
        let chroot = self.chroot()?;
        chroot.run(
            &["ln", "-sf", zoneinfo.as_str(), "/etc/localtime"],
            ErrorKind::Timezone,
        )?;
        chroot.run(&["hwclock", "--systohc"], ErrorKind::Timezone)
    }

    fn enable_time_sync(&mut self) -> anyhow::Result<()> {
        self.chroot()?
            .enable_services(&["systemd-timesyncd"], ErrorKind::Services)
    }

    fn install_desktop(&mut self, desktop: &DesktopSpec) -> anyhow::Result<()> {
        info!(
            "Installing {:?} with {:?} drivers",
            desktop.desktop, desktop.gfx_driver
        );
        let mut packages: Vec<&str> = Vec::new();
        packages.extend(desktop.desktop.packages());
        packages.extend(desktop.gfx_driver.packages());
        packages.push(desktop.greeter.package());

        self.pacman(&packages, ErrorKind::Packages)?;
        self.chroot()?
            .enable_services(&[desktop.greeter.service()], ErrorKind::Services)
    }

    fn enable_services(&mut self, services: &[String]) -> anyhow::Result<()> {
        info!("Enabling services: {}", services.join(", "));
        self.chroot()?.enable_services(services, ErrorKind::Services)
    }

    fn run_commands(&mut self, commands: &[PostInstallCommand]) -> anyhow::Result<()> {
        let chroot = self.chroot()?;
        for command in commands {
            info!(
                "Running as {}: {}",
                command.user.as_deref().unwrap_or("root"),
                command.command
            );
            chroot.shell(
                command.user.as_deref(),
                &command.command,
                ErrorKind::PostInstallation,
            )?;
        }
        Ok(())
    }

    fn generate_fstab(&mut self) -> anyhow::Result<()> {
        info!("Generating fstab");
        let fstab = self
            .tools
            .genfstab
            .execute()
            .arg("-U")
            .arg(self.chroot()?.root())
            .run_text_output(ErrorKind::Fstab)?;
        debug!("fstab:\n{}", fstab);

        OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.target("/etc/fstab")?)
            .and_then(|mut file| file.write_all(fstab.as_bytes()))
            .context(ErrorKind::Fstab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hosts_file() {
        assert_eq!(
            hosts("p14s"),
            "127.0.0.1 localhost\n::1 localhost\n127.0.1.1 p14s.localdomain p14s\n"
        );
    }

    #[test]
    fn partition_sectors() {
        let device = DeviceInfo {
            path: "/dev/nvme0n1".into(),
            total_size: crate::layout::Size::from_mib(64 * 1024),
            sector_size: 512,
        };
        let layout = DiskLayout::standard(&device, &crate::profiles::load("gnome").unwrap().layout)
            .unwrap();
        let (index, boot) = layout.partition(PartitionRole::Boot).unwrap();
        let (_, root) = layout.partition(PartitionRole::Root).unwrap();

        assert_eq!(
            partition_args(index, boot, 512, true),
            vec!["--new=1:2048:2099199", "--typecode=1:EF00", "--change-name=1:EFI"]
        );
        assert_eq!(
            partition_args(2, root, 512, true)[1..],
            ["--typecode=2:8309", "--change-name=2:cryptroot"]
        );
        assert_eq!(partition_args(2, root, 512, false)[1], "--typecode=2:8300");
    }

    #[test]
    fn root_never_gets_a_key_file() {
        let encryption = EncryptionSpec::luks_root(crate::plan::Password::new("secret"));
        assert!(key_file_roles(&encryption).is_empty());

        let both = EncryptionSpec {
            partitions: vec![PartitionRole::Root, PartitionRole::Boot],
            ..encryption
        };
        assert_eq!(key_file_roles(&both), vec![PartitionRole::Boot]);
    }

    #[test]
    fn encrypted_root_unlocks_with_passphrase_only() {
        let config = crate::initcpio::Initcpio::new(true).to_config();
        assert!(config.contains("FILES=()\n"));
        assert!(config.contains(" encrypt "));

        let root = RootDevice::Encrypted {
            luks_uuid: "1234".into(),
            mapper_name: ROOT_MAPPER_NAME.into(),
        };
        let entry = bootloader::loader_entry("linux", &bootloader::kernel_options(&root, "@root"));
        assert!(entry.contains("cryptdevice=UUID=1234:cryptroot"));
        assert!(!entry.contains("cryptkey="));
        assert!(!entry.contains(KEY_FILE_DIRECTORY));
    }

    #[test]
    fn grub_defaults_must_exist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grub");

        let error = rewrite_grub_defaults(&path, "rw").unwrap_err();
        assert_eq!(error.downcast_ref::<ErrorKind>(), Some(&ErrorKind::Bootloader));
        assert!(!path.exists());

        fs::write(&path, "GRUB_TIMEOUT=5\nGRUB_CMDLINE_LINUX=\"\"\n").unwrap();
        rewrite_grub_defaults(&path, "root=UUID=abcd rw").unwrap();
        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("GRUB_TIMEOUT=5"));
        assert!(rewritten.contains("root=UUID=abcd rw"));
    }

    #[test]
    fn key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("boot.key");
        write_key_file(&path).unwrap();

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), KEY_FILE_SIZE as u64);
        assert_eq!(metadata.permissions().mode() & 0o777, 0o400);

        let error = write_key_file(&path).unwrap_err();
        assert_eq!(error.downcast_ref::<ErrorKind>(), Some(&ErrorKind::KeyFile));
    }

    #[test]
    fn copies_matching_files() {
        let source = tempdir().unwrap();
        let destination = tempdir().unwrap();
        fs::write(source.path().join("home.psk"), "[Security]").unwrap();
        fs::write(source.path().join("README"), "ignored").unwrap();

        let copied = copy_files(source.path(), &destination.path().join("iwd"), |path| {
            path.extension().map_or(false, |e| e == "psk")
        })
        .unwrap();

        assert_eq!(copied, 1);
        assert!(destination.path().join("iwd/home.psk").exists());
        assert!(!destination.path().join("iwd/README").exists());
    }

    #[test]
    fn missing_source_copies_nothing() {
        let destination = tempdir().unwrap();
        assert_eq!(
            copy_files(Path::new("/nonexistent"), destination.path(), |_| true).unwrap(),
            0
        );
    }
}
