use crate::errors::{RecapError, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Write `content` so that only the owner can read it, replacing `path`
/// atomically. On Unix the file is created with mode 0600; it is never
/// readable by others, not even briefly.
pub(crate) async fn write_private(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RecapError::credentials(path, format!("failed to create directory: {}", e))
            })?;
        }
    }

    let temp_path = temp_path_for(path);
    let result = write_new_private(&temp_path, content).await;
    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(RecapError::credentials(path, format!("failed to write: {}", e)));
    }

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        RecapError::credentials(path, format!("failed to replace: {}", e))
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_new_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;

    // A stale temp file from an interrupted run keeps its old mode
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }

    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}
