use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::CredentialError;

/// On-disk shape of the credential file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// User-scoped credential file, `{"api_key": "login:password"}`.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Missing file is `Ok(None)`; unreadable or unparsable is an error.
    pub fn read_api_key(&self) -> Result<Option<String>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let unreadable = |message: String| CredentialError::Unreadable {
            path: self.path.display().to_string(),
            message,
        };

        let content = fs::read_to_string(&self.path).map_err(|e| unreadable(e.to_string()))?;
        let stored: StoredCredential =
            serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;

        Ok(stored.api_key)
    }

    /// Writes the key with owner-only permissions, replacing any existing file.
    pub fn write_api_key(&self, api_key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let stored = StoredCredential {
            api_key: Some(api_key.to_string()),
            created_by: Some(format!("keyscout {}", env!("CARGO_PKG_VERSION"))),
        };
        let content = serde_json::to_string_pretty(&stored)?;

        let tmp_path = self.path.with_extension(format!("tmp.{}", std::process::id()));
        let written = write_private(&tmp_path, content.as_bytes()).and_then(|()| {
            fs::rename(&tmp_path, &self.path)
                .with_context(|| format!("Failed to write {}", self.path.display()))
        });
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written?;

        info!("Credential file written to: {}", self.path.display());
        Ok(())
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    restrict_permissions(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
