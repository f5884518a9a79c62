use log::debug;
use std::fs;
use std::path::Path;

const DMI_CHASSIS_TYPE: &str = "/sys/class/dmi/id/chassis_type";

/// SMBIOS chassis codes for portable machines: portable, laptop, notebook, sub notebook,
/// tablet, convertible and detachable
const LAPTOP_CODES: [u8; 7] = [8, 9, 10, 14, 30, 31, 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChassisType {
    Laptop,
    Desktop,
    Unknown,
}

impl ChassisType {
    pub fn detect() -> Self {
        Self::from_file(Path::new(DMI_CHASSIS_TYPE))
    }

    fn from_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let chassis = Self::from_dmi_code(&contents);
                debug!("{} -> {:?}", contents.trim_end(), chassis);
                chassis
            }
            Err(e) => {
                debug!("Unable to read {}: {}", path.display(), e);
                ChassisType::Unknown
            }
        }
    }

    pub fn from_dmi_code(code: &str) -> Self {
        match code.trim().parse::<u8>() {
            Ok(code) if LAPTOP_CODES.contains(&code) => ChassisType::Laptop,
            Ok(_) => ChassisType::Desktop,
            Err(_) => ChassisType::Unknown,
        }
    }
}
