//! Boot loader configuration files.

/// How the kernel finds the root filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootDevice {
    Encrypted {
        /// UUID of the LUKS partition
        luks_uuid: String,
        mapper_name: String,
    },
    Plain {
        /// UUID of the Btrfs filesystem
        fs_uuid: String,
    },
}

pub fn kernel_options(root: &RootDevice, subvolume: &str) -> String {
    let mut options = Vec::new();
    match root {
        RootDevice::Encrypted {
            luks_uuid,
            mapper_name,
        } => {
            options.push(format!("cryptdevice=UUID={}:{}", luks_uuid, mapper_name));
            options.push(format!("root=/dev/mapper/{}", mapper_name));
        }
        RootDevice::Plain { fs_uuid } => options.push(format!("root=UUID={}", fs_uuid)),
    }
    options.push(format!("rootflags=subvol={}", subvolume));
    options.push("rw".into());
    options.join(" ")
}

/// The systemd-boot entry file name for a kernel package
pub fn entry_name(kernel: &str) -> String {
    format!("{}.conf", kernel)
}

pub fn loader_conf(default_kernel: &str) -> String {
    format!(
        "default {}\ntimeout 3\nconsole-mode max\neditor no\n",
        entry_name(default_kernel)
    )
}

pub fn loader_entry(kernel: &str, options: &str) -> String {
    format!(
        "title   Arch Linux ({kernel})\nlinux   /vmlinuz-{kernel}\ninitrd  /initramfs-{kernel}.img\noptions {options}\n",
        kernel = kernel,
        options = options
    )
}

/// Replaces GRUB_CMDLINE_LINUX in /etc/default/grub, appending it when absent
pub fn grub_defaults(existing: &str, options: &str) -> String {
    let setting = format!("GRUB_CMDLINE_LINUX=\"{}\"", options);
    let mut replaced = false;
    let mut output = String::with_capacity(existing.len() + setting.len());

    for line in existing.lines() {
        if line.starts_with("GRUB_CMDLINE_LINUX=") {
            output.push_str(&setting);
            replaced = true;
        } else {
            output.push_str(line);
        }
        output.push('\n');
    }

    if !replaced {
        output.push_str(&setting);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypted_options() {
        let root = RootDevice::Encrypted {
            luks_uuid: "1234".into(),
            mapper_name: "cryptroot".into(),
        };
        assert_eq!(
            kernel_options(&root, "@root"),
            "cryptdevice=UUID=1234:cryptroot root=/dev/mapper/cryptroot rootflags=subvol=@root rw"
        );
    }

    #[test]
    fn plain_options() {
        let root = RootDevice::Plain {
            fs_uuid: "abcd".into(),
        };
        let options = kernel_options(&root, "@");
        assert_eq!(options, "root=UUID=abcd rootflags=subvol=@ rw");
        assert!(!options.contains("cryptdevice"));
    }

    #[test]
    fn entries() {
        assert!(loader_conf("linux-zen").starts_with("default linux-zen.conf\n"));

        let entry = loader_entry("linux-lts", "rw");
        assert!(entry.contains("linux   /vmlinuz-linux-lts\n"));
        assert!(entry.contains("initrd  /initramfs-linux-lts.img\n"));
        assert!(entry.ends_with("options rw\n"));
    }

    #[test]
    fn grub_cmdline() {
        let defaults = "GRUB_DEFAULT=0\nGRUB_CMDLINE_LINUX=\"\"\nGRUB_TIMEOUT=5\n";
        assert_eq!(
            grub_defaults(defaults, "rw"),
            "GRUB_DEFAULT=0\nGRUB_CMDLINE_LINUX=\"rw\"\nGRUB_TIMEOUT=5\n"
        );
        assert_eq!(grub_defaults("", "rw"), "GRUB_CMDLINE_LINUX=\"rw\"\n");
    }
}
