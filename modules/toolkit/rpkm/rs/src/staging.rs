use std::ffi::OsStr;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

/// Create a hidden `<prefix>*.partial` file in `dir` that is persisted over the final output
/// once complete. The file gets the permissions of a regularly created file (0666 minus the
/// process umask) instead of the owner-only default of temporary files.
pub fn staging_file(dir: &Path, prefix: &OsStr) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix).suffix(".partial");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}
