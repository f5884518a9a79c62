use crate::aur::AurHelper;
use crate::profiles::{DEFAULT_PROFILE, DEFAULT_USERNAME};
use byte_unit::Byte;
use std::path::PathBuf;
use structopt::StructOpt;

fn parse_bytes(src: &str) -> Result<Byte, &'static str> {
    Byte::from_str(src).map_err(|_| "Invalid device size")
}

#[derive(StructOpt)]
#[structopt(
    name = "arch-provision",
    about = "Provision an encrypted Arch Linux workstation"
)]
pub struct App {
    /// Verbose output
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    #[structopt(name = "install", about = "Wipe the target disk and install Arch Linux")]
    Install(InstallCommand),

    #[structopt(name = "plan", about = "Print the configuration and disk layout of a profile")]
    Plan(PlanCommand),

    #[structopt(name = "profiles", about = "List the available profiles")]
    Profiles,
}

#[derive(StructOpt)]
pub struct InstallCommand {
    /// Profile to install
    #[structopt(long = "profile", default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Target block device, overriding the profile's
    #[structopt(long = "device", parse(from_os_str))]
    pub device: Option<PathBuf>,

    /// Hostname of the installed system. Prompted for when missing
    #[structopt(long = "hostname")]
    pub hostname: Option<String>,

    /// Name of the administrator account
    #[structopt(long = "username", default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// AUR helper to bootstrap for the administrator account
    #[structopt(long = "aur-helper", default_value = "yay")]
    pub aur_helper: AurHelper,

    /// Password of the administrator account. Prompted for when missing
    #[structopt(long = "user-password", env = "ARCH_PROVISION_USER_PASSWORD", hide_env_values = true)]
    pub user_password: Option<String>,

    /// Disk encryption password. Prompted for when missing
    #[structopt(long = "disk-password", env = "ARCH_PROVISION_DISK_PASSWORD", hide_env_values = true)]
    pub disk_password: Option<String>,

    /// Do not encrypt the root partition
    #[structopt(long = "no-encryption")]
    pub no_encryption: bool,

    /// Path to preset files
    #[structopt(long = "presets", value_name = "preset", parse(from_os_str))]
    pub presets: Vec<PathBuf>,

    /// Additional packages to install
    #[structopt(short = "p", long = "extra-packages", value_name = "package")]
    pub extra_packages: Vec<String>,
}

#[derive(StructOpt)]
pub struct PlanCommand {
    /// Profile to print
    #[structopt(long = "profile", default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Device size to plan the layout for
    #[structopt(
        long = "device-size",
        parse(try_from_str = parse_bytes),
        default_value = "512 GiB",
        value_name = "size"
    )]
    pub device_size: Byte,

    /// Path to preset files
    #[structopt(long = "presets", value_name = "preset", parse(from_os_str))]
    pub presets: Vec<PathBuf>,
}
