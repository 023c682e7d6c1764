use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Replaces `path` with `contents` so readers never see a partial write.
///
/// The staging file lives beside the target, so the final rename stays on one
/// filesystem.
pub(super) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("'{}' has no parent directory", path.display()),
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(".conduitd-").suffix(".tmp");
    #[cfg(unix)]
    builder.permissions(std::fs::Permissions::from_mode(0o600));

    let mut staged = builder.tempfile_in(directory)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn replaces_existing_contents() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("conduitd.health");
        fs::write(&target, b"old contents that are longer").expect("seed file");

        atomic_write(&target, b"new").expect("atomic write");

        assert_eq!(fs::read(&target).expect("read back"), b"new");
        let leftovers = fs::read_dir(dir.path())
            .expect("list dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0, "staging file should be renamed away");
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_private() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("conduitd.health");
        atomic_write(&target, b"{}").expect("atomic write");
        let mode = fs::metadata(&target).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
