use super::markers::BlockDevice;
use crate::error::ErrorKind;
use crate::{process::CommandExt, tool::Tool};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemType {
    Fat32,
    Btrfs,
}

impl FilesystemType {
    pub fn to_mount_type(self) -> &'static str {
        match self {
            FilesystemType::Fat32 => "vfat",
            FilesystemType::Btrfs => "btrfs",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filesystem {
    fs_type: FilesystemType,
    device: PathBuf,
}

impl Filesystem {
    pub fn format(block: &dyn BlockDevice, fs_type: FilesystemType, mkfs: &Tool) -> anyhow::Result<Self> {
        let mut command = mkfs.execute();
        match fs_type {
            FilesystemType::Fat32 => command.arg("-F32").arg(block.path()),
            FilesystemType::Btrfs => command.arg("-f").arg(block.path()),
        };

        command.run(ErrorKind::Formatting)?;

        Ok(Self::from_partition(block, fs_type))
    }

    pub fn from_partition(block: &dyn BlockDevice, fs_type: FilesystemType) -> Self {
        Self {
            fs_type,
            device: block.path().to_path_buf(),
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn fs_type(&self) -> FilesystemType {
        self.fs_type
    }
}
