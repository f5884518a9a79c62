use super::markers::BlockDevice;
use super::partition::Partition;
use crate::error::ErrorKind;
use crate::layout::{DeviceInfo, Size};
use anyhow::Context;
use log::debug;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

/// The kernel always reports block device sizes in 512 byte units
const SYSFS_SECTOR_SIZE: u64 = 512;

#[derive(Debug, Clone)]
pub struct StorageDevice {
    name: String,
    path: PathBuf,
    sys_block: PathBuf,
}

impl StorageDevice {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        Self::with_sysfs(path, Path::new("/sys/block"))
    }

    fn with_sysfs(path: &Path, sysfs: &Path) -> anyhow::Result<Self> {
        debug!("path: {:?}", path);
        if !path.exists() {
            return Err(ErrorKind::DeviceNotFound(path.to_path_buf()).into());
        }

        let path = path.canonicalize().context(ErrorKind::DeviceQuery)?;
        let device_name = path
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .map(String::from)
            .ok_or_else(|| ErrorKind::DeviceNotFound(path.clone()))?;

        debug!("real path: {:?}, device name: {:?}", path, device_name);

        let sys_block = sysfs.join(&device_name);
        if !sys_block.exists() {
            // Partitions and plain files have no entry of their own
            return Err(ErrorKind::DeviceNotFound(path).into());
        }

        Ok(Self {
            name: device_name,
            path,
            sys_block,
        })
    }

    fn read_number(&self, relative: &str) -> anyhow::Result<u64> {
        let path = self.sys_block.join(relative);
        debug!("Reading: {:?}", path);
        let result = read_to_string(&path).context(ErrorKind::DeviceQuery)?;
        debug!("{:?} -> {}", path, result.trim_end());

        Ok(result.trim().parse::<u64>().context(ErrorKind::DeviceQuery)?)
    }

    pub fn info(&self) -> anyhow::Result<DeviceInfo> {
        let sectors = self.read_number("size")?;
        let sector_size = self
            .read_number("queue/logical_block_size")
            .unwrap_or(SYSFS_SECTOR_SIZE);

        Ok(DeviceInfo {
            path: self.path.clone(),
            total_size: Size::from_bytes(sectors * SYSFS_SECTOR_SIZE),
            sector_size,
        })
    }

    /// Device path of the partition with the given number, which must already exist
    pub fn get_partition(&self, index: u8) -> anyhow::Result<Partition> {
        let path = self.partition_path(index);

        debug!("Partition {} for {} is in {:?}", index, self.name, path);
        if !path.exists() {
            return Err(ErrorKind::NoSuchPartition(index).into());
        }
        Ok(Partition::new(path))
    }

    fn partition_path(&self, index: u8) -> PathBuf {
        let name = if self
            .name
            .chars()
            .last()
            .map_or(false, |c| c.is_ascii_digit())
        {
            format!("{}p{}", self.name, index)
        } else {
            format!("{}{}", self.name, index)
        };
        let mut path = PathBuf::from("/dev");
        path.push(name);
        path
    }
}

impl BlockDevice for StorageDevice {
    fn path(&self) -> &Path {
        &self.path
    }
}
