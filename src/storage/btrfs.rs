use super::{Filesystem, MountStack};
use crate::error::ErrorKind;
use crate::layout::SubvolumeSpec;
use crate::process::CommandExt;
use crate::tool::Tool;
use anyhow::Context;
use log::info;
use tempfile::tempdir;

/// Creates `subvolumes` at the top level of a freshly formatted Btrfs filesystem
pub fn create_subvolumes(
    btrfs: &Tool,
    filesystem: &Filesystem,
    subvolumes: &[SubvolumeSpec],
) -> anyhow::Result<()> {
    let top_level = tempdir().context(ErrorKind::TmpDirError)?;
    let mut mount_stack = MountStack::new();
    mount_stack
        .mount(filesystem, top_level.path().to_path_buf(), None)
        .context(ErrorKind::Mounting)?;

    for subvolume in subvolumes {
        info!(
            "Creating subvolume {} for {}",
            subvolume.name,
            subvolume.mountpoint.display()
        );
        btrfs
            .execute()
            .args(&["subvolume", "create"])
            .arg(top_level.path().join(&subvolume.name))
            .run(ErrorKind::Subvolumes)?;
    }

    mount_stack.umount()?;
    Ok(())
}
