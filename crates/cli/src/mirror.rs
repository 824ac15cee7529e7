//! Profile mirror kept as JSON files on disk.
//!
//! One file per user, `{dir}/{user_id}.json`. Writes go to a temp file in the
//! same directory and are renamed into place so a crash never leaves a
//! half-written profile behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use tuckbox_client::flows::{LocalMirror, MirrorError};
use tuckbox_core::{UserId, UserProfile};

/// [`LocalMirror`] backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileMirror {
    dir: PathBuf,
}

impl JsonFileMirror {
    /// Open (creating if needed) the mirror directory.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, MirrorError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &UserId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(user_id)))
    }
}

/// User ids are opaque; anything outside `[A-Za-z0-9_-]` is replaced.
fn file_stem(user_id: &UserId) -> String {
    user_id
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl LocalMirror for JsonFileMirror {
    async fn save_profile(&self, profile: &UserProfile) -> Result<(), MirrorError> {
        let path = self.path_for(&profile.user_id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(profile)?;

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "profile mirrored");
        Ok(())
    }

    async fn load_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, MirrorError> {
        match tokio::fs::read(self.path_for(user_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
