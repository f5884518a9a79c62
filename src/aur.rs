use crate::error::ErrorKind;
use crate::plan::PostInstallCommand;
use std::str::FromStr;

/// An AUR helper that gets bootstrapped from its prebuilt AUR package
pub struct AurHelper {
    pub name: String,
    pub package: String,
}

impl AurHelper {
    pub fn yay() -> Self {
        AurHelper {
            name: String::from("yay"),
            package: String::from("yay-bin"),
        }
    }

    pub fn paru() -> Self {
        AurHelper {
            name: String::from("paru"),
            package: String::from("paru-bin"),
        }
    }

    fn checkout(&self) -> String {
        format!("/opt/{}", self.package)
    }

    /// Clones, builds and installs the helper.
    ///
    /// makepkg refuses to run as root, so the build runs as `user` and the resulting
    /// package is installed by root.
    pub fn bootstrap_commands(&self, user: &str) -> Vec<PostInstallCommand> {
        let checkout = self.checkout();
        vec![
            PostInstallCommand::root(format!(
                "git clone https://aur.archlinux.org/{}.git {} && chown -R {}: {}",
                self.package, checkout, user, checkout
            )),
            PostInstallCommand::user(
                user,
                format!("cd {} && makepkg --noconfirm", checkout),
            ),
            PostInstallCommand::root(format!(
                "pacman -U --noconfirm {}/{}-*.pkg.tar.zst",
                checkout, self.package
            )),
            PostInstallCommand::user(user, format!("{} --version", self.name)),
        ]
    }
}

impl FromStr for AurHelper {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yay" => Ok(AurHelper::yay()),
            "paru" => Ok(AurHelper::paru()),
            _ => Err(ErrorKind::AurHelper(s.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yay_bootstrap() {
        let yay: AurHelper = "yay".parse().unwrap();
        let commands = yay.bootstrap_commands("rawkode");

        assert_eq!(commands.len(), 4);
        assert!(commands[0].command.contains("https://aur.archlinux.org/yay-bin.git /opt/yay-bin"));
        assert_eq!(commands[0].user, None);
        assert_eq!(commands[1].user.as_deref(), Some("rawkode"));
        assert!(commands[2].command.starts_with("pacman -U"));
        assert_eq!(commands[3].command, "yay --version");
    }

    #[test]
    fn unknown_helper() {
        assert!("trizen".parse::<AurHelper>().is_err());
    }
}
