//! The install plan: everything one provisioning run needs to know.
//!
//! [`InstallConfig`] is the part a profile or preset can describe and that is safe to
//! print. [`InstallPlan`] adds the hostname, the credentials and the swap decision for
//! this particular machine.

use crate::chassis::ChassisType;
use crate::error::ErrorKind;
use crate::layout::{DiskLayout, LayoutConfig, PartitionRole};
use crate::pacman::MirrorConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A secret string that never shows up in logs
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    Luks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSpec {
    pub password: Password,
    pub encryption_type: EncryptionType,
    pub partitions: Vec<PartitionRole>,
}

impl EncryptionSpec {
    pub fn luks_root(password: Password) -> Self {
        Self {
            password,
            encryption_type: EncryptionType::Luks,
            partitions: vec![PartitionRole::Root],
        }
    }

    /// Exactly one partition is encrypted and it is the root partition of `layout`
    pub fn validate(&self, layout: &DiskLayout) -> Result<(), ErrorKind> {
        if self.password.is_empty() {
            return Err(ErrorKind::EmptyPassword);
        }
        if self.partitions != [PartitionRole::Root] {
            return Err(ErrorKind::InvalidLayout(
                "exactly the root partition must be encrypted".into(),
            ));
        }
        if layout.partition(PartitionRole::Root).is_none() {
            return Err(ErrorKind::InvalidLayout(
                "the encrypted root partition is missing".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub username: String,
    pub password: Password,
    pub admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bootloader {
    SystemdBoot,
    Grub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkKind {
    NetworkManager,
    /// systemd-networkd with the live environment's configuration
    CopyIso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioKind {
    Pulseaudio,
    Pipewire,
    None,
}

impl AudioKind {
    pub fn packages(self) -> &'static [&'static str] {
        match self {
            AudioKind::Pulseaudio => &["pulseaudio", "pulseaudio-alsa", "pulseaudio-bluetooth"],
            AudioKind::Pipewire => &[
                "pipewire",
                "pipewire-alsa",
                "pipewire-jack",
                "pipewire-pulse",
                "gst-plugin-pipewire",
                "libpulse",
                "wireplumber",
            ],
            AudioKind::None => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GfxDriver {
    AmdOpenSource,
    IntelOpenSource,
    NvidiaOpenKernel,
}

impl GfxDriver {
    pub fn packages(self) -> &'static [&'static str] {
        match self {
            GfxDriver::AmdOpenSource => &[
                "mesa",
                "xf86-video-amdgpu",
                "vulkan-radeon",
                "libva-mesa-driver",
            ],
            GfxDriver::IntelOpenSource => &["mesa", "vulkan-intel", "intel-media-driver"],
            GfxDriver::NvidiaOpenKernel => &["dkms", "nvidia-open-dkms", "nvidia-utils"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Desktop {
    Gnome,
    Plasma,
}

impl Desktop {
    pub fn packages(self) -> &'static [&'static str] {
        match self {
            Desktop::Gnome => &["gnome", "gnome-tweaks"],
            Desktop::Plasma => &["plasma-meta", "konsole", "dolphin"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Greeter {
    Gdm,
    Sddm,
}

impl Greeter {
    pub fn package(self) -> &'static str {
        match self {
            Greeter::Gdm => "gdm",
            Greeter::Sddm => "sddm",
        }
    }

    pub fn service(self) -> &'static str {
        self.package()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopSpec {
    pub desktop: Desktop,
    pub gfx_driver: GfxDriver,
    pub greeter: Greeter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub keyboard_layout: String,
    pub language: String,
    pub encoding: String,
}

impl LocaleConfig {
    /// e.g. `en_GB.UTF-8`
    pub fn lang(&self) -> String {
        format!("{}.{}", self.language, self.encoding)
    }

    /// The line to enable in /etc/locale.gen
    pub fn locale_gen_line(&self) -> String {
        format!("{} {}", self.lang(), self.encoding)
    }

    /// Uncomments our locale in /etc/locale.gen, appending it when the line is missing
    pub fn enable_in_locale_gen(&self, locale_gen: &str) -> String {
        let wanted = self.locale_gen_line();
        let mut found = false;
        let mut output = String::with_capacity(locale_gen.len() + wanted.len());

        for line in locale_gen.lines() {
            if line.trim_start_matches('#').trim() == wanted {
                output.push_str(&wanted);
                found = true;
            } else {
                output.push_str(line);
            }
            output.push('\n');
        }

        if !found {
            output.push_str(&wanted);
            output.push('\n');
        }

        output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapPolicy {
    Never,
    Always,
    Laptop,
}

impl SwapPolicy {
    pub fn enabled(self, chassis: ChassisType) -> bool {
        match self {
            SwapPolicy::Never => false,
            SwapPolicy::Always => true,
            SwapPolicy::Laptop => chassis == ChassisType::Laptop,
        }
    }
}

/// A shell snippet run inside the installed system once everything else is in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInstallCommand {
    pub command: String,
    /// Runs as root when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl PostInstallCommand {
    pub fn root(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            user: None,
        }
    }

    pub fn user(user: &str, command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            user: Some(user.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    pub device: PathBuf,
    pub username: String,
    pub encrypt: bool,
    pub layout: LayoutConfig,
    pub bootloader: Bootloader,
    pub kernels: Vec<String>,
    pub locale: LocaleConfig,
    pub timezone: String,
    pub mirrors: MirrorConfig,
    pub enable_testing: bool,
    pub enable_multilib: bool,
    pub swap: SwapPolicy,
    pub network: NetworkKind,
    pub audio: AudioKind,
    pub desktop: DesktopSpec,
    pub packages: Vec<String>,
    pub services: Vec<String>,
    pub commands: Vec<PostInstallCommand>,
}

impl InstallConfig {
    pub fn add_packages<I: IntoIterator<Item = String>>(&mut self, packages: I) {
        extend_unique(&mut self.packages, packages);
    }

    pub fn add_services<I: IntoIterator<Item = String>>(&mut self, services: I) {
        extend_unique(&mut self.services, services);
    }
}

fn extend_unique<I: IntoIterator<Item = String>>(list: &mut Vec<String>, items: I) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

/// Answers only the operator can give
#[derive(Debug, Clone)]
pub struct Secrets {
    pub hostname: String,
    pub user_password: Password,
    pub disk_password: Option<Password>,
}

#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub hostname: String,
    pub config: InstallConfig,
    pub users: Vec<UserSpec>,
    pub encryption: Option<EncryptionSpec>,
    pub swap: bool,
}

impl InstallPlan {
    pub fn new(config: InstallConfig, secrets: Secrets, chassis: ChassisType) -> Result<Self, ErrorKind> {
        validate_hostname(&secrets.hostname)?;

        if secrets.user_password.is_empty() {
            return Err(ErrorKind::EmptyPassword);
        }

        let encryption = match (config.encrypt, secrets.disk_password) {
            (true, Some(password)) if !password.is_empty() => Some(EncryptionSpec::luks_root(password)),
            (true, _) => return Err(ErrorKind::EmptyPassword),
            (false, _) => None,
        };

        let users = vec![UserSpec {
            username: config.username.clone(),
            password: secrets.user_password,
            admin: true,
        }];

        Ok(Self {
            hostname: secrets.hostname,
            swap: config.swap.enabled(chassis),
            config,
            users,
            encryption,
        })
    }
}

pub fn validate_hostname(hostname: &str) -> Result<(), ErrorKind> {
    let valid = !hostname.is_empty()
        && hostname.len() <= 63
        && !hostname.starts_with('-')
        && !hostname.ends_with('-')
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ErrorKind::InvalidHostname(hostname.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles;

    fn secrets() -> Secrets {
        Secrets {
            hostname: "workstation".into(),
            user_password: Password::new("hunter2"),
            disk_password: Some(Password::new("correct horse")),
        }
    }

    #[test]
    fn hostnames() {
        assert!(validate_hostname("p14s").is_ok());
        assert!(validate_hostname("my-laptop").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("-laptop").is_err());
        assert!(validate_hostname("my_laptop").is_err());
        assert!(validate_hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn password_is_redacted() {
        let password = Password::new("hunter2");
        assert!(!format!("{:?}", password).contains("hunter2"));
    }

    #[test]
    fn encrypted_plan() {
        let config = profiles::load("gnome").unwrap();
        let plan = InstallPlan::new(config, secrets(), ChassisType::Desktop).unwrap();

        let encryption = plan.encryption.unwrap();
        assert_eq!(encryption.partitions, vec![PartitionRole::Root]);
        assert_eq!(plan.users[0].username, "rawkode");
        assert!(plan.users[0].admin);
    }

    #[test]
    fn missing_disk_password() {
        let config = profiles::load("gnome").unwrap();
        let secrets = Secrets {
            disk_password: None,
            ..secrets()
        };
        assert_eq!(
            InstallPlan::new(config, secrets, ChassisType::Desktop).unwrap_err(),
            ErrorKind::EmptyPassword
        );
    }

    #[test]
    fn unencrypted_plan() {
        let mut config = profiles::load("gnome").unwrap();
        config.encrypt = false;
        let plan = InstallPlan::new(config, secrets(), ChassisType::Desktop).unwrap();
        assert!(plan.encryption.is_none());
    }

    #[test]
    fn swap_follows_chassis() {
        let config = profiles::load("gnome-nix").unwrap();
        let laptop = InstallPlan::new(config.clone(), secrets(), ChassisType::Laptop).unwrap();
        let desktop = InstallPlan::new(config, secrets(), ChassisType::Desktop).unwrap();
        assert!(laptop.swap);
        assert!(!desktop.swap);
    }

    #[test]
    fn locale_lines() {
        let locale = LocaleConfig {
            keyboard_layout: "uk".into(),
            language: "en_GB".into(),
            encoding: "UTF-8".into(),
        };
        assert_eq!(locale.lang(), "en_GB.UTF-8");
        assert_eq!(locale.locale_gen_line(), "en_GB.UTF-8 UTF-8");

        let locale_gen = "#en_DK.UTF-8 UTF-8\n#en_GB.UTF-8 UTF-8\n#en_GB ISO-8859-1\n";
        assert_eq!(
            locale.enable_in_locale_gen(locale_gen),
            "#en_DK.UTF-8 UTF-8\nen_GB.UTF-8 UTF-8\n#en_GB ISO-8859-1\n"
        );
        assert_eq!(locale.enable_in_locale_gen(""), "en_GB.UTF-8 UTF-8\n");
    }

    #[test]
    fn packages_are_not_duplicated() {
        let mut config = profiles::load("gnome").unwrap();
        let before = config.packages.len();
        config.add_packages(vec!["git".to_string(), "git".to_string()]);
        assert_eq!(config.packages.len(), before);
    }
}
