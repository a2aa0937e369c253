use crate::logging::Diagnostics;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Give an unpacked file `rwxr-xr-x` permissions (no-op on Windows)
#[cfg(unix)]
pub fn make_executable(path: &Path, log: &Diagnostics) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    log.emit(format_args!("make \"{}\" executable", path.display()));
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to make executable: {}", path.display()))
}

#[cfg(not(unix))]
pub fn make_executable(path: &Path, _log: &Diagnostics) -> Result<()> {
    fs::metadata(path).with_context(|| format!("Unpacked file is missing: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("tool");
        fs::write(&file_path, "#!/bin/sh\necho hello").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        make_executable(&file_path, &Diagnostics::default()).unwrap();
        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_make_executable_nonexistent() {
        let temp = TempDir::new().unwrap();
        let result = make_executable(&temp.path().join("missing"), &Diagnostics::default());
        assert!(result.is_err());
    }
}
