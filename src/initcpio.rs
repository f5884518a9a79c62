/// mkinitcpio.conf of the installed system. The image lives on the unencrypted ESP, so it
/// never carries key material.
pub struct Initcpio {
    encrypted: bool,
}

impl Initcpio {
    pub fn new(encrypted: bool) -> Self {
        Self { encrypted }
    }

    pub fn to_config(&self) -> String {
        let mut output = String::from("MODULES=(btrfs)\nBINARIES=()\nFILES=()\n");

        output.push_str("HOOKS=(base udev autodetect microcode modconf kms keyboard keymap consolefont block ");

        if self.encrypted {
            output.push_str("encrypt ");
        }

        output.push_str("filesystems fsck)\n");

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain() {
        let config = Initcpio::new(false).to_config();
        assert!(config.contains("FILES=()\n"));
        assert!(config.contains("block filesystems fsck)"));
        assert!(!config.contains("encrypt"));
    }

    #[test]
    fn encrypted_without_embedded_files() {
        let config = Initcpio::new(true).to_config();
        assert!(config.contains("FILES=()\n"));
        assert!(!config.contains(".key"));
        assert!(config.contains("block encrypt filesystems fsck)"));
    }
}
