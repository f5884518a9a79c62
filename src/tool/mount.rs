use crate::error::ErrorKind;
use crate::layout::SubvolumeSpec;
use crate::storage::{Filesystem, MountStack};
use anyhow::Context;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Joins an absolute mountpoint of the installed system onto the staging directory
pub fn target_path(mount_path: &Path, mountpoint: &Path) -> PathBuf {
    mount_path.join(mountpoint.strip_prefix("/").unwrap_or(mountpoint))
}

/// Mounts every subvolume of the root filesystem below mount_path, shallowest first,
/// then the boot filesystem at mount_path/boot.
/// Note we mount with noatime to reduce disk writes by not recording file access times
pub fn mount(
    mount_path: &Path,
    boot_filesystem: &Filesystem,
    root_filesystem: &Filesystem,
    subvolumes: &[SubvolumeSpec],
    mount_options: &[String],
) -> anyhow::Result<MountStack> {
    let mut mount_stack = MountStack::new();
    debug!("Root partition: {}", root_filesystem.device().display());

    let mut ordered: Vec<&SubvolumeSpec> = subvolumes.iter().collect();
    ordered.sort_by_key(|subvolume| subvolume.mountpoint.components().count());

    info!("Mounting filesystems to {}", mount_path.display());
    for subvolume in ordered {
        let target = target_path(mount_path, &subvolume.mountpoint);
        if !target.exists() {
            fs::create_dir_all(&target).context(ErrorKind::Mounting)?;
        }

        let options = subvolume_options(&subvolume.name, mount_options);
        mount_stack
            .mount(root_filesystem, target, Some(&options))
            .context(ErrorKind::Mounting)?;
    }

    let boot_point = mount_path.join("boot");
    if !boot_point.exists() {
        fs::create_dir(&boot_point).context(ErrorKind::Mounting)?;
    }

    mount_stack
        .mount(boot_filesystem, boot_point, None)
        .context(ErrorKind::Mounting)?;

    Ok(mount_stack)
}

fn subvolume_options(name: &str, mount_options: &[String]) -> String {
    let mut options = vec![format!("subvol={}", name)];
    options.extend(mount_options.iter().cloned());
    options.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options() {
        assert_eq!(
            subvolume_options("@home", &["compress=zstd".into()]),
            "subvol=@home,compress=zstd"
        );
    }

    #[test]
    fn target_paths() {
        let staging = Path::new("/tmp/staging");
        assert_eq!(target_path(staging, Path::new("/")), staging);
        assert_eq!(
            target_path(staging, Path::new("/var/log")),
            PathBuf::from("/tmp/staging/var/log")
        );
    }
}
