//! Stored-profile directory access.
//!
//! Profiles live as plain files, one per profile, named after the profile.
//! The store never interprets file contents; parsing belongs to the codec.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};

const APP_DIR: &str = "randrprof";
const PROFILES_DIR: &str = "profiles";

pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default store location under the user config directory.
    pub fn default_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(PROFILES_DIR);
        path
    }

    /// Names of stored profiles, sorted. A missing or unreadable directory
    /// simply lists nothing.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            debug!(dir = %self.dir.display(), "profile directory unreadable");
            return Vec::new();
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        names
    }

    /// Raw document text of the named profile.
    pub fn load(&self, name: &str) -> Result<String> {
        for entry in self.list() {
            if entry == name {
                return Ok(fs::read_to_string(self.dir.join(entry))?);
            }
        }
        Err(Error::NotFound(name.to_string()))
    }
}
