//! Watermarks persisted as a JSON file.
//!
//! Saves write `<path>.tmp` with owner-only permissions, sync it and rename it
//! over the target, so a crash mid-save leaves the previous file intact.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use slackwatch_core::{StoreError, WatermarkMap, WatermarkStore};

/// JSON file implementation of [`WatermarkStore`].
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store backed by `path`. Nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_temp(&self, temp: &Path, data: &[u8]) -> Result<(), StoreError> {
        let mut options = OpenOptions::new();
        let _ = options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let _ = options.mode(0o600);
        }

        let mut file = options.open(temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }
}

impl WatermarkStore for FileStore {
    fn load(&self) -> Result<WatermarkMap, StoreError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no existing state file found, creating new state");
            return Ok(WatermarkMap::new());
        }

        let data = fs::read_to_string(&self.path)?;
        let map: WatermarkMap = serde_json::from_str(&data)?;
        info!(tracked = map.len(), "state loaded");
        Ok(map)
    }

    fn save(&self, map: &WatermarkMap) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_private_dir(dir)?;
        }

        let data = serde_json::to_vec_pretty(map)?;
        let temp = self.temp_path();

        if let Err(e) = self.write_temp(&temp, &data) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(tracked = map.len(), path = %self.path.display(), "state saved");
        Ok(())
    }
}

/// Create `dir` (and parents) readable only by the owner.
fn create_private_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    let _ = builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        let _ = builder.mode(0o700);
    }
    builder.create(dir)?;
    Ok(())
}
