//! The named installation profiles.
//!
//! Each profile is one complete, self-consistent configuration. They differ only where
//! the machines they were written for differ.

use crate::aur::AurHelper;
use crate::constants::{BOOT_SIZE_MIB, BOOT_START_MIB, DEFAULT_DEVICE};
use crate::error::ErrorKind;
use crate::layout::{LayoutConfig, SubvolumeSpec};
use crate::pacman::MirrorConfig;
use crate::plan::{
    AudioKind, Bootloader, Desktop, DesktopSpec, GfxDriver, Greeter, InstallConfig,
    LocaleConfig, NetworkKind, PostInstallCommand, SwapPolicy,
};

pub const DEFAULT_PROFILE: &str = "gnome-nix-root";

pub const PROFILES: [(&str, &str); 3] = [
    ("gnome", "GNOME desktop on encrypted Btrfs with @ subvolumes and /.snapshots"),
    ("gnome-nix", "gnome plus the Nix package manager, a /nix subvolume and swap on laptops"),
    ("gnome-nix-root", "gnome-nix with an @root subvolume and snapshots at /snapshots"),
];

pub const DEFAULT_USERNAME: &str = "rawkode";

const KERNELS: [&str; 4] = ["linux", "linux-hardened", "linux-lts", "linux-zen"];

const UK_MIRRORS: [&str; 7] = [
    "http://mirror.bytemark.co.uk/archlinux/$repo/os/$arch",
    "https://mirror.bytemark.co.uk/archlinux/$repo/os/$arch",
    "https://london.mirror.pkgbuild.com/$repo/os/$arch",
    "http://lon.mirror.rackspace.com/archlinux/$repo/os/$arch",
    "https://lon.mirror.rackspace.com/archlinux/$repo/os/$arch",
    "http://mirrors.ukfast.co.uk/sites/archlinux.org/$repo/os/$arch",
    "https://mirrors.ukfast.co.uk/sites/archlinux.org/$repo/os/$arch",
];

const DESKTOP_PACKAGES: [&str; 38] = [
    "alacritty",
    "base-devel",
    "bat",
    "bluez",
    "bluez-cups",
    "bluez-tools",
    "bluez-utils",
    "brightnessctl",
    "code",
    "dialog",
    "distrobox",
    "docker",
    "docker-compose",
    "fd",
    "ffmpeg",
    "ffmpegthumbnailer",
    "ffmpegthumbs",
    "firefox",
    "git",
    "github-cli",
    "htop",
    "lxappearance",
    "man-db",
    "man-pages",
    "networkmanager",
    "noise-suppression-for-voice",
    "playerctl",
    "ripgrep",
    "starship",
    "ttf-dejavu",
    "ttf-fira-code",
    "ttf-hack-nerd",
    "vivaldi",
    "vivaldi-ffmpeg-codecs",
    "zsh",
    "zsh-autosuggestions",
    "zsh-completions",
    "zsh-syntax-highlighting",
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn subvolumes(values: &[(&str, &str)]) -> Vec<SubvolumeSpec> {
    values
        .iter()
        .map(|(name, mountpoint)| SubvolumeSpec::new(name, mountpoint))
        .collect()
}

fn commands(user: &str, aur_helper: &AurHelper, groups: &[&str]) -> Vec<PostInstallCommand> {
    let mut commands = aur_helper.bootstrap_commands(user);
    commands.push(PostInstallCommand::root(format!(
        "usermod -aG {} {}",
        groups.join(","),
        user
    )));
    commands
}

fn gnome(username: &str, aur_helper: &AurHelper) -> InstallConfig {
    let mut mirrors = MirrorConfig::default();
    mirrors
        .regions
        .insert("United Kingdom".into(), strings(&UK_MIRRORS));

    InstallConfig {
        device: DEFAULT_DEVICE.into(),
        username: username.into(),
        encrypt: true,
        layout: LayoutConfig {
            boot_start_mib: BOOT_START_MIB,
            boot_size_mib: BOOT_SIZE_MIB,
            mount_options: strings(&["compress=zstd"]),
            subvolumes: subvolumes(&[
                ("@", "/"),
                ("@home", "/home"),
                ("@log", "/var/log"),
                ("@pkg", "/var/cache/pacman/pkg"),
                ("@.snapshots", "/.snapshots"),
            ]),
        },
        bootloader: Bootloader::SystemdBoot,
        kernels: strings(&KERNELS),
        locale: LocaleConfig {
            keyboard_layout: "uk".into(),
            language: "en_GB".into(),
            encoding: "UTF-8".into(),
        },
        timezone: "Europe/London".into(),
        mirrors,
        enable_testing: true,
        enable_multilib: true,
        swap: SwapPolicy::Never,
        network: NetworkKind::NetworkManager,
        audio: AudioKind::Pulseaudio,
        desktop: DesktopSpec {
            desktop: Desktop::Gnome,
            gfx_driver: GfxDriver::AmdOpenSource,
            greeter: Greeter::Gdm,
        },
        packages: strings(&DESKTOP_PACKAGES),
        services: strings(&["bluetooth", "docker"]),
        commands: commands(username, aur_helper, &["docker"]),
    }
}

fn gnome_nix(username: &str, aur_helper: &AurHelper) -> InstallConfig {
    let mut config = gnome(username, aur_helper);
    config.layout.subvolumes = subvolumes(&[
        ("@", "/"),
        ("@home", "/home"),
        ("@log", "/var/log"),
        ("@pkg", "/var/cache/pacman/pkg"),
        ("@nix", "/nix"),
        ("@.snapshots", "/.snapshots"),
    ]);
    config.swap = SwapPolicy::Laptop;
    config.add_packages(strings(&["nix"]));
    config.add_services(strings(&["nix-daemon"]));
    config.commands = commands(username, aur_helper, &["docker", "nix-users"]);
    config
}

fn gnome_nix_root(username: &str, aur_helper: &AurHelper) -> InstallConfig {
    let mut config = gnome_nix(username, aur_helper);
    config.layout.subvolumes = subvolumes(&[
        ("@root", "/"),
        ("@home", "/home"),
        ("@log", "/var/log"),
        ("@pkg", "/var/cache/pacman/pkg"),
        ("@nix", "/nix"),
        ("@snapshots", "/snapshots"),
    ]);
    config
}

pub fn load(name: &str) -> Result<InstallConfig, ErrorKind> {
    load_for(name, DEFAULT_USERNAME, &AurHelper::yay())
}

/// Loads a profile with `username` as the administrator account, bootstrapping
/// `aur_helper` for them
pub fn load_for(name: &str, username: &str, aur_helper: &AurHelper) -> Result<InstallConfig, ErrorKind> {
    match name {
        "gnome" => Ok(gnome(username, aur_helper)),
        "gnome-nix" => Ok(gnome_nix(username, aur_helper)),
        "gnome-nix-root" => Ok(gnome_nix_root(username, aur_helper)),
        _ => Err(ErrorKind::UnknownProfile(name.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn mountpoints(config: &InstallConfig) -> HashSet<PathBuf> {
        config
            .layout
            .subvolumes
            .iter()
            .map(|s| s.mountpoint.clone())
            .collect()
    }

    fn expected(paths: &[&str]) -> HashSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn every_profile_loads() {
        for (name, _) in PROFILES.iter() {
            load(name).unwrap();
        }
        load(DEFAULT_PROFILE).unwrap();
    }

    #[test]
    fn unknown_profile() {
        assert_eq!(
            load("kde").unwrap_err(),
            ErrorKind::UnknownProfile("kde".into())
        );
    }

    #[test]
    fn subvolume_sets() {
        let gnome = load("gnome").unwrap();
        assert_eq!(
            mountpoints(&gnome),
            expected(&["/", "/home", "/var/log", "/var/cache/pacman/pkg", "/.snapshots"])
        );

        let root = load("gnome-nix-root").unwrap();
        assert_eq!(
            mountpoints(&root),
            expected(&["/", "/home", "/var/log", "/var/cache/pacman/pkg", "/nix", "/snapshots"])
        );
        assert_eq!(root.layout.subvolumes[0].name, "@root");
    }

    #[test]
    fn no_duplicates() {
        for (name, _) in PROFILES.iter() {
            let config = load(name).unwrap();
            let packages: HashSet<_> = config.packages.iter().collect();
            assert_eq!(packages.len(), config.packages.len(), "{}", name);

            let subvolumes = mountpoints(&config);
            assert_eq!(subvolumes.len(), config.layout.subvolumes.len(), "{}", name);
        }
    }

    #[test]
    fn nix_profiles() {
        let config = load("gnome-nix").unwrap();
        assert!(config.packages.contains(&"nix".to_string()));
        assert_eq!(config.services, vec!["bluetooth", "docker", "nix-daemon"]);
        assert!(config
            .commands
            .iter()
            .any(|c| c.command == "usermod -aG docker,nix-users rawkode"));
    }

    #[test]
    fn custom_username() {
        let config = load_for("gnome", "alice", &AurHelper::paru()).unwrap();
        assert_eq!(config.username, "alice");
        assert!(config
            .commands
            .iter()
            .any(|c| c.user.as_deref() == Some("alice")));
        assert!(!config
            .commands
            .iter()
            .any(|c| c.command.contains(DEFAULT_USERNAME)));
        assert!(config.commands.iter().any(|c| c.command == "paru --version"));
    }
}
