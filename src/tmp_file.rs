use std::{
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use uuid::Uuid;

pub(crate) type ArcTmpDir = Arc<TmpDir>;

/// A per-process directory that owns every transient file created while handling uploads
#[derive(Debug)]
pub(crate) struct TmpDir {
    path: Option<PathBuf>,
}

impl TmpDir {
    pub(crate) async fn init<P: AsRef<Path>>(path: P) -> std::io::Result<Arc<Self>> {
        let path = path.as_ref().join(Uuid::now_v7().to_string());
        tokio::fs::create_dir_all(&path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700)).await?;
        }

        Ok(Arc::new(TmpDir { path: Some(path) }))
    }

    pub(crate) fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Reserve a uniquely named path inside the directory
    ///
    /// Nothing is created on disk until the caller opens the path, but the returned guard removes
    /// whatever ends up there once it is dropped or cleaned up.
    pub(crate) fn tmp_file(&self, ext: Option<&str>) -> TmpFile {
        let name = match ext {
            Some(ext) => format!("{}{ext}", Uuid::now_v7()),
            None => Uuid::now_v7().to_string(),
        };

        TmpFile(Some(self.path().join(name)))
    }

    pub(crate) async fn cleanup(self: Arc<Self>) -> std::io::Result<()> {
        if let Some(path) = Arc::into_inner(self).and_then(|mut this| this.path.take()) {
            tokio::fs::remove_dir_all(path).await?;
        }

        Ok(())
    }
}

impl Drop for TmpDir {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!("Failed to remove temporary directory {path:?}: {e}");
            }
        }
    }
}

/// Owned path to a transient file, removed on every exit path
#[must_use]
#[derive(Debug)]
pub(crate) struct TmpFile(Option<PathBuf>);

impl TmpFile {
    /// The sibling path `<self>.processing` used for derived artifacts
    pub(crate) fn processing(&self) -> TmpFile {
        let mut path = self.as_os_str().to_owned();
        path.push(".processing");

        TmpFile(Some(PathBuf::from(path)))
    }

    pub(crate) async fn cleanup(mut self) -> std::io::Result<()> {
        if let Some(path) = self.0.take() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => (),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Clean up, logging rather than returning failures
    pub(crate) async fn release(self) {
        let path = self.to_path_buf();

        if let Err(e) = self.cleanup().await {
            tracing::warn!("Failed to remove temporary file {path:?}: {e}");
        }
    }
}

impl AsRef<Path> for TmpFile {
    fn as_ref(&self) -> &Path {
        self
    }
}

impl Deref for TmpFile {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.0.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TmpFile {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
