use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ErrorKind {
    #[error("No device found for {}", .0.display())]
    DeviceNotFound(PathBuf),

    #[error("Error querying information about the block device")]
    DeviceQuery,

    #[error("Partition {0} does not exist")]
    NoSuchPartition(u8),

    #[error("The passwords do not match")]
    PasswordMismatch,

    #[error("The password is empty")]
    EmptyPassword,

    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    #[error("Invalid disk layout: {0}")]
    InvalidLayout(String),

    #[error("Sanity check failed: {0}")]
    SanityCheckFailed(String),

    #[error("Unknown profile {0}")]
    UnknownProfile(String),

    #[error("Unsupported AUR helper {0}")]
    AurHelper(String),

    #[error("Error loading preset {0}")]
    Preset(String),

    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingEnvironmentVariables(Vec<String>),

    #[error("Could not find {0}")]
    NoTool(&'static str),

    #[error("Error creating a temporary directory")]
    TmpDirError,

    #[error("Partitioning error")]
    Partitioning,

    #[error("Error formatting filesystems")]
    Formatting,

    #[error("Error setting up an encrypted device")]
    LuksSetup,

    #[error("Error opening the encrypted device")]
    LuksOpen,

    #[error("Error closing the encrypted device")]
    LuksClose,

    #[error("Error creating btrfs subvolumes")]
    Subvolumes,

    #[error("Error mounting filesystems")]
    Mounting,

    #[error("Failed unmounting filesystems")]
    UmountFailure,

    #[error("Error generating the disk key file")]
    KeyFile,

    #[error("Pacstrap error")]
    Pacstrap,

    #[error("Error configuring package repositories")]
    Repositories,

    #[error("Error installing packages")]
    Packages,

    #[error("Error setting the hostname")]
    Hostname,

    #[error("Error configuring the locale")]
    Locale,

    #[error("Initramfs error")]
    Initramfs,

    #[error("Error configuring swap")]
    Swap,

    #[error("Bootloader error")]
    Bootloader,

    #[error("Error configuring the network")]
    Network,

    #[error("Error creating users")]
    Users,

    #[error("Error setting the timezone")]
    Timezone,

    #[error("Error enabling services")]
    Services,

    #[error("Post installation configuration error")]
    PostInstallation,

    #[error("fstab error")]
    Fstab,

    #[error("Error caused by the interactive mode")]
    Interactive,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn package_failures_are_not_bootstrap_failures() {
        let error = Err::<(), _>(anyhow::anyhow!("pacman exited with 1"))
            .context(ErrorKind::Packages)
            .unwrap_err();

        assert_eq!(error.downcast_ref::<ErrorKind>(), Some(&ErrorKind::Packages));
        assert_eq!(error.to_string(), "Error installing packages");
        assert_ne!(ErrorKind::Packages.to_string(), ErrorKind::Pacstrap.to_string());
    }
}
