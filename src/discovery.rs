use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories searched when the target is neither a Solidity file nor a
/// directory.
const PROJECT_SOURCE_DIRS: &[&str] = &["src", "contracts"];

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub recursive: bool,
    pub exclude_dirs: Vec<String>,
}

/// Collect the Solidity files to audit, sorted by path.
pub fn find_sol_files(path: &Path, options: &DiscoveryOptions, cwd: &Path) -> Vec<PathBuf> {
    let mut files = if path.is_file() && is_solidity(path) {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        if options.recursive {
            walk(path, &options.exclude_dirs)
        } else {
            list_dir(path)
        }
    } else {
        warn!(
            "{} is not a Solidity file or directory, scanning the project in {}",
            path.display(),
            cwd.display()
        );
        project_fallback(cwd, &options.exclude_dirs)
    };

    files.sort();
    debug!("Discovered {} Solidity files", files.len());
    files
}

fn is_solidity(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "sol")
}

fn walk(root: &Path, exclude_dirs: &[String]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e, exclude_dirs))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                None
            }
        })
        // `path().is_file()` follows symlinks, so linked contracts are kept.
        .filter(|e| e.path().is_file() && is_solidity(e.path()))
        .map(DirEntry::into_path)
        .collect()
}

fn is_excluded(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| exclude_dirs.iter().any(|d| d == name))
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_solidity(p))
            .collect(),
        Err(err) => {
            warn!("Cannot read {}: {}", dir.display(), err);
            Vec::new()
        }
    }
}

/// Paths come back relative to `cwd`, e.g. `src/Vault.sol`.
fn project_fallback(cwd: &Path, exclude_dirs: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = PROJECT_SOURCE_DIRS
        .iter()
        .map(|name| cwd.join(name))
        .filter(|dir| dir.is_dir())
        .flat_map(|dir| walk(&dir, exclude_dirs))
        .collect();

    if files.is_empty() {
        files = list_dir(cwd);
    }

    files
        .into_iter()
        .map(|file| match file.strip_prefix(cwd) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => file,
        })
        .collect()
}
