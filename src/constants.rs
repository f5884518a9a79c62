/// Space left untouched at either end of the disk for the GPT headers
pub const GPT_RESERVED_MIB: u64 = 1;
pub const BOOT_START_MIB: u64 = 1;
pub const BOOT_SIZE_MIB: u64 = 1024;
pub const MIN_ROOT_SIZE_MIB: u64 = 8192;

pub const DEFAULT_DEVICE: &str = "/dev/nvme0n1";
pub const ROOT_MAPPER_NAME: &str = "cryptroot";
pub const KEY_FILE_DIRECTORY: &str = "/etc/cryptsetup-keys.d";
pub const KEY_FILE_SIZE: usize = 2048;

pub const BASE_PACKAGES: [&str; 5] = ["base", "linux-firmware", "btrfs-progs", "sudo", "efibootmgr"];

pub static ZRAM_GENERATOR_CONF: &str = "[zram0]
zram-size = min(ram / 2, 4096)
compression-algorithm = zstd
";

pub static WHEEL_SUDOERS: &str = "%wheel ALL=(ALL:ALL) ALL\n";
