use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use eyre::Result;

use crate::PipelineError;

/// External executable resolved to an absolute location before anything is launched.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExternalTool {
    name: String,
    path: PathBuf,
}

impl ExternalTool {
    /// Resolve a program either as an explicit path (anything with a directory component) or by
    /// searching `PATH`. Failing to find it is a configuration error.
    pub fn resolve(program: impl AsRef<OsStr>) -> Result<Self> {
        let program = Path::new(program.as_ref());
        let name = program
            .file_name()
            .unwrap_or(program.as_os_str())
            .to_string_lossy()
            .into_owned();

        match which(program) {
            Some(path) => {
                log::debug!("Resolved {name} to {}", path.display());
                Ok(Self { name, path })
            }
            None => Err(PipelineError::MissingTool {
                tool: program.display().to_string(),
            }
            .into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn command(&self) -> Command {
        Command::new(&self.path)
    }
}

fn which(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_path_buf());
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
