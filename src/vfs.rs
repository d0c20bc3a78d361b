use std::collections::HashMap;

use log::debug;

use crate::error::{AdapterError, Result};

/// Makes input bytes visible to a decoder engine before it is initialized.
pub trait FileRegistry {
    fn register_file(&mut self, dir: &str, filename: &str, data: &[u8]) -> Result<()>;
}

/// Joins a directory and file name the way engines build their open path:
/// plain concatenation, with a separator added when the directory lacks one.
pub fn join_path(dir: &str, filename: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        format!("{}{}", dir, filename)
    } else {
        format!("{}/{}", dir, filename)
    }
}

#[derive(Default)]
pub struct MemoryFs {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|data| data.as_slice())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileRegistry for MemoryFs {
    fn register_file(&mut self, dir: &str, filename: &str, data: &[u8]) -> Result<()> {
        if filename.is_empty() {
            return Err(AdapterError::Registration(join_path(dir, filename)));
        }
        let path = join_path(dir, filename);
        debug!("registering {} ({} bytes)", path, data.len());
        self.files.insert(path, data.to_vec());
        Ok(())
    }
}
