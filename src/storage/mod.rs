mod btrfs;
mod crypt;
mod filesystem;
mod markers;
mod mount_stack;
mod partition;
mod storage_device;

pub use btrfs::create_subvolumes;
pub use crypt::EncryptedDevice;
pub use filesystem::{Filesystem, FilesystemType};
pub use markers::BlockDevice;
pub use mount_stack::MountStack;
pub use partition::Partition;
pub use storage_device::StorageDevice;
