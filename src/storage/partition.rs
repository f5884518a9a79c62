use super::markers::BlockDevice;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Partition {
    path: PathBuf,
}

impl Partition {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl BlockDevice for Partition {
    fn path(&self) -> &Path {
        &self.path
    }
}
