//! Disk layout planning.
//!
//! A [`DiskLayout`] is the full, validated description of what the formatting step
//! will write to the device. Building one never touches the disk.

use crate::constants::{GPT_RESERVED_MIB, MIN_ROOT_SIZE_MIB};
use crate::error::ErrorKind;
use crate::storage::FilesystemType;
use byte_unit::Byte;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Size(u64);

impl Size {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn from_mib(mib: u64) -> Self {
        Self(mib * MIB)
    }

    pub const fn bytes(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Size) -> Option<Size> {
        self.0.checked_add(other.0).map(Size)
    }

    pub fn saturating_sub(self, other: Size) -> Size {
        Size(self.0.saturating_sub(other.0))
    }

    pub fn align_down(self, alignment: Size) -> Size {
        Size(self.0 - self.0 % alignment.0)
    }

    pub fn sectors(self, sector_size: u64) -> u64 {
        self.0 / sector_size
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            Byte::from_bytes(u128::from(self.0)).get_appropriate_unit(true)
        )
    }
}

/// What the planner knows about the target device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub total_size: Size,
    pub sector_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionRole {
    Boot,
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationStatus {
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionType {
    Primary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionFlag {
    Boot,
    Esp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubvolumeSpec {
    pub name: String,
    pub mountpoint: PathBuf,
}

impl SubvolumeSpec {
    pub fn new(name: &str, mountpoint: &str) -> Self {
        Self {
            name: name.into(),
            mountpoint: mountpoint.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    pub role: PartitionRole,
    pub status: ModificationStatus,
    pub partition_type: PartitionType,
    pub start: Size,
    pub length: Size,
    pub mountpoint: Option<PathBuf>,
    pub fs_type: FilesystemType,
    pub flags: Vec<PartitionFlag>,
    pub mount_options: Vec<String>,
    pub subvolumes: Vec<SubvolumeSpec>,
}

impl PartitionSpec {
    pub fn end(&self) -> Option<Size> {
        self.start.checked_add(self.length)
    }

    pub fn is_esp(&self) -> bool {
        self.flags.contains(&PartitionFlag::Esp)
    }
}

/// The sizes and subvolumes a profile asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub boot_start_mib: u64,
    pub boot_size_mib: u64,
    pub mount_options: Vec<String>,
    pub subvolumes: Vec<SubvolumeSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskLayout {
    pub device: PathBuf,
    pub total_size: Size,
    pub sector_size: u64,
    pub fs_type: FilesystemType,
    pub partitions: Vec<PartitionSpec>,
}

impl DiskLayout {
    /// An ESP mounted at `/boot` followed by a Btrfs root filling the rest of the device
    pub fn standard(device: &DeviceInfo, config: &LayoutConfig) -> Result<Self, ErrorKind> {
        let boot_start = Size::from_mib(config.boot_start_mib);
        let boot_length = Size::from_mib(config.boot_size_mib);
        let root_start = boot_start
            .checked_add(boot_length)
            .ok_or_else(|| ErrorKind::InvalidLayout("boot partition is too large".into()))?;

        let usable_end = device
            .total_size
            .saturating_sub(Size::from_mib(GPT_RESERVED_MIB))
            .align_down(Size::from_mib(1));
        let root_length = usable_end.saturating_sub(root_start);

        if root_length < Size::from_mib(MIN_ROOT_SIZE_MIB) {
            return Err(ErrorKind::InvalidLayout(format!(
                "{} is too small, the root partition needs at least {}",
                device.path.display(),
                Size::from_mib(MIN_ROOT_SIZE_MIB)
            )));
        }

        let boot = PartitionSpec {
            role: PartitionRole::Boot,
            status: ModificationStatus::Create,
            partition_type: PartitionType::Primary,
            start: boot_start,
            length: boot_length,
            mountpoint: Some(PathBuf::from("/boot")),
            fs_type: FilesystemType::Fat32,
            flags: vec![PartitionFlag::Boot, PartitionFlag::Esp],
            mount_options: Vec::new(),
            subvolumes: Vec::new(),
        };

        let root = PartitionSpec {
            role: PartitionRole::Root,
            status: ModificationStatus::Create,
            partition_type: PartitionType::Primary,
            start: root_start,
            length: root_length,
            mountpoint: None,
            fs_type: FilesystemType::Btrfs,
            flags: Vec::new(),
            mount_options: config.mount_options.clone(),
            subvolumes: config.subvolumes.clone(),
        };

        let layout = Self {
            device: device.path.clone(),
            total_size: device.total_size,
            sector_size: device.sector_size,
            fs_type: FilesystemType::Btrfs,
            partitions: vec![boot, root],
        };
        layout.validate()?;

        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), ErrorKind> {
        let invalid = |reason: String| Err(ErrorKind::InvalidLayout(reason));

        if self.sector_size == 0 {
            return invalid("sector size is zero".into());
        }

        let first_usable = Size::from_mib(GPT_RESERVED_MIB);
        let last_usable = self
            .total_size
            .saturating_sub(Size::from_mib(GPT_RESERVED_MIB));

        let mut previous_end = first_usable;
        for (index, partition) in self.partitions.iter().enumerate() {
            let number = index + 1;
            if partition.length.bytes() == 0 {
                return invalid(format!("partition {} is empty", number));
            }
            if partition.start.bytes() % self.sector_size != 0
                || partition.length.bytes() % self.sector_size != 0
            {
                return invalid(format!("partition {} is not sector aligned", number));
            }
            if partition.start < previous_end {
                return invalid(format!("partition {} overlaps its predecessor", number));
            }

            let end = match partition.end() {
                Some(end) if end <= last_usable => end,
                _ => {
                    return invalid(format!(
                        "partition {} does not fit on a {} device",
                        number, self.total_size
                    ))
                }
            };
            previous_end = end;
        }

        let boot = self.find(PartitionRole::Boot)?;
        let root = self.find(PartitionRole::Root)?;
        if boot.0 > root.0 {
            return invalid("the boot partition must precede the root partition".into());
        }
        if !boot.1.is_esp() || boot.1.fs_type != FilesystemType::Fat32 {
            return invalid("the boot partition must be a FAT32 ESP".into());
        }

        validate_subvolumes(&root.1.subvolumes)
    }

    fn find(&self, role: PartitionRole) -> Result<(u8, &PartitionSpec), ErrorKind> {
        let mut found = self
            .partitions
            .iter()
            .enumerate()
            .filter(|(_, partition)| partition.role == role);

        match (found.next(), found.next()) {
            (Some((index, partition)), None) => Ok((index as u8 + 1, partition)),
            (None, _) => Err(ErrorKind::InvalidLayout(format!("no {:?} partition", role))),
            (Some(_), Some(_)) => Err(ErrorKind::InvalidLayout(format!(
                "more than one {:?} partition",
                role
            ))),
        }
    }

    /// The 1-based partition number and spec for a role
    pub fn partition(&self, role: PartitionRole) -> Option<(u8, &PartitionSpec)> {
        self.find(role).ok()
    }

    /// The subvolume mounted at `/`
    pub fn root_subvolume(&self) -> Option<&SubvolumeSpec> {
        self.partition(PartitionRole::Root).and_then(|(_, root)| {
            root.subvolumes
                .iter()
                .find(|subvolume| subvolume.mountpoint == Path::new("/"))
        })
    }

    /// Every mountpoint of the layout, in mount order
    pub fn mountpoints(&self) -> Vec<PathBuf> {
        let mut result = Vec::new();
        if let Some((_, root)) = self.partition(PartitionRole::Root) {
            result.extend(root.subvolumes.iter().map(|s| s.mountpoint.clone()));
            result.sort_by_key(|path| path.components().count());
        }
        if let Some((_, boot)) = self.partition(PartitionRole::Boot) {
            result.extend(boot.mountpoint.clone());
        }
        result
    }
}

impl fmt::Display for DiskLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} ({})", self.device.display(), self.total_size)?;
        for (index, partition) in self.partitions.iter().enumerate() {
            writeln!(
                f,
                "  {}: {:?} {:?} start {} length {}{}",
                index + 1,
                partition.role,
                partition.fs_type,
                partition.start,
                partition.length,
                partition
                    .mountpoint
                    .as_ref()
                    .map(|m| format!(" at {}", m.display()))
                    .unwrap_or_default()
            )?;
            for subvolume in &partition.subvolumes {
                writeln!(
                    f,
                    "     {} at {}",
                    subvolume.name,
                    subvolume.mountpoint.display()
                )?;
            }
        }
        Ok(())
    }
}

fn validate_subvolumes(subvolumes: &[SubvolumeSpec]) -> Result<(), ErrorKind> {
    let mut names = HashSet::new();
    let mut mountpoints = HashSet::new();

    for subvolume in subvolumes {
        if !subvolume.mountpoint.is_absolute() {
            return Err(ErrorKind::InvalidLayout(format!(
                "subvolume {} has a relative mountpoint",
                subvolume.name
            )));
        }
        if !names.insert(&subvolume.name) {
            return Err(ErrorKind::InvalidLayout(format!(
                "duplicate subvolume {}",
                subvolume.name
            )));
        }
        if !mountpoints.insert(&subvolume.mountpoint) {
            return Err(ErrorKind::InvalidLayout(format!(
                "duplicate mountpoint {}",
                subvolume.mountpoint.display()
            )));
        }
    }

    if !mountpoints.contains(&PathBuf::from("/")) {
        return Err(ErrorKind::InvalidLayout(
            "no subvolume is mounted at /".into(),
        ));
    }

    Ok(())
}
