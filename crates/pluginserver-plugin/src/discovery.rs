//! Plugin discovery: lists module files in the plugins directory.

use std::fs::ReadDir;
use std::path::{Path, PathBuf};

use tracing::warn;

use pluginserver_core::{AppError, AppResult, ErrorKind};

/// File extension of plugin modules.
pub const MODULE_EXTENSION: &str = "so";

/// Lists plugin names in `directory`, lazily, in filesystem order.
///
/// Every call rescans the directory.
pub fn discover(directory: &Path) -> AppResult<PluginNames> {
    let entries = std::fs::read_dir(directory).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("can't read plugins directory '{}': {}", directory.display(), e),
            e,
        )
    })?;

    Ok(PluginNames {
        directory: directory.to_path_buf(),
        entries,
    })
}

/// Path of the module file for `name` inside `directory`.
pub fn module_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{name}.{MODULE_EXTENSION}"))
}

/// Plugin name of a module file, or `None` if the path is not a module.
pub fn plugin_name(path: &Path) -> Option<&str> {
    if path.extension()? != MODULE_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str().filter(|stem| !stem.is_empty())
}

/// Lazy sequence of plugin names found in a directory.
#[derive(Debug)]
pub struct PluginNames {
    /// Directory being scanned.
    directory: PathBuf,
    /// Remaining directory entries.
    entries: ReadDir,
}

impl Iterator for PluginNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(directory = %self.directory.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = plugin_name(&path) {
                return Some(name.to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_only_module_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("rate-limit.so"), b"").expect("write");
        std::fs::write(dir.path().join("auth.so"), b"").expect("write");
        std::fs::write(dir.path().join("README.md"), b"").expect("write");
        std::fs::create_dir(dir.path().join("nested.so")).expect("mkdir");

        let mut names: Vec<String> = discover(dir.path()).expect("discover").collect();
        names.sort();
        assert_eq!(names, vec!["auth".to_string(), "rate-limit".to_string()]);
    }

    #[test]
    fn test_rescans_on_every_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(discover(dir.path()).expect("discover").count(), 0);

        std::fs::write(dir.path().join("auth.so"), b"").expect("write");
        assert_eq!(discover(dir.path()).expect("discover").count(), 1);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = discover(&dir.path().join("absent")).expect_err("missing");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_plugin_name() {
        assert_eq!(plugin_name(Path::new("/p/auth.so")), Some("auth"));
        assert_eq!(plugin_name(Path::new("/p/auth.dll")), None);
        assert_eq!(plugin_name(Path::new("/p/.so")), None);
        assert_eq!(
            module_path(Path::new("/p"), "rate-limit"),
            PathBuf::from("/p/rate-limit.so")
        );
    }
}
