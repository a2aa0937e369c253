use std::path::PathBuf;
use thiserror::Error;

/// Classified failures raised while resolving and retrieving a release archive.
///
/// They travel inside `anyhow::Error`; use `downcast_ref::<GrabError>()` to
/// tell them apart from plain filesystem or transport errors.
#[derive(Debug, Error)]
pub enum GrabError {
    #[error("version matching \"{spec}\" not found")]
    VersionNotFound { spec: String },

    #[error("no suitable archive found for {version}")]
    NoSuitableArchive { version: String },

    #[error("GET \"{url}\" failed: {status} {reason}")]
    HttpStatus {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("empty archive: {}", .path.display())]
    EmptyArchive { path: PathBuf },

    #[error("directory \"{entry}\" in archive: {}", .path.display())]
    DirectoryInArchive { path: PathBuf, entry: String },

    #[error("archive {file} is neither cached nor downloadable")]
    MissingDownloadUrl { file: String },

    #[error("invalid repository \"{repository}\", expected \"owner/name\"")]
    InvalidRepository { repository: String },
}

impl GrabError {
    /// True for the errors saying that nothing satisfies the request.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GrabError::VersionNotFound { .. } | GrabError::NoSuitableArchive { .. }
        )
    }
}
