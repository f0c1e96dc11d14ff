//! Option-file discovery: turn a list of search locations into the concrete
//! ini files to layer onto a [`Config`](crate::Config).
//!
//! Locations are listed in priority-ascending order: the last entry is the
//! highest priority. [`find_option_files`] returns existing file paths in
//! that same order, so the caller can read, parse, and
//! [`add_source`](crate::Config::add_source) each one in sequence and the
//! Config's append-order precedence does the rest.
//!
//! `Ancestors(boundary)` expands into multiple directories by walking from
//! the working directory up toward the filesystem root, emitted shallowest
//! first so the directory closest to the caller wins. The [`Boundary`]
//! controls how far the walk goes: `Root` continues to the filesystem root,
//! `Marker(".git")` stops at the first directory containing the marker.
//!
//! Missing files are silently skipped; listing a location is a suggestion,
//! not a requirement. Only real I/O errors are propagated.

use std::path::{Path, PathBuf};

use crate::error::OptfigError;

/// Where to look for option files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, `~/Library/Application
    /// Support` on macOS), derived from the application name.
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".tool")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
    /// Walk from CWD up toward the filesystem root.
    Ancestors(Boundary),
}

/// How far an [`SearchPath::Ancestors`] walk goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// Continue to the filesystem root.
    Root,
    /// Stop (inclusive) at the first directory containing a file or
    /// subdirectory with this name. Falls back to root if never found.
    Marker(&'static str),
}

/// Resolve a single-directory [`SearchPath`] to a concrete path. Returns
/// `None` when the path cannot be resolved (e.g. no home directory).
///
/// # Panics
///
/// Panics on [`SearchPath::Ancestors`]; that variant expands to multiple
/// directories and goes through [`expand_ancestors_from`].
fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
        SearchPath::Ancestors(_) => {
            panic!("resolve_search_path called with Ancestors; use expand_ancestors_from")
        }
    }
}

/// Expand an ancestors walk starting from an explicit directory, shallowest
/// first (root end first, start last).
pub fn expand_ancestors_from(start: PathBuf, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = start.as_path();

    loop {
        dirs.push(current.to_path_buf());

        if let Boundary::Marker(name) = boundary
            && current.join(name).exists()
        {
            break;
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    dirs.reverse();
    dirs
}

/// Expand all search paths into a flat, priority-ascending directory list.
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: &str) -> Vec<PathBuf> {
    expand_search_paths_from(search_paths, app_name, None)
}

/// Like [`expand_search_paths`] but with an explicit start directory for
/// `Ancestors` expansion instead of CWD. Used in tests.
pub fn expand_search_paths_from(
    search_paths: &[SearchPath],
    app_name: &str,
    ancestors_start: Option<&Path>,
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for sp in search_paths {
        match sp {
            SearchPath::Ancestors(boundary) => {
                let start = match ancestors_start {
                    Some(start) => Some(start.to_path_buf()),
                    None => std::env::current_dir().ok(),
                };
                if let Some(start) = start {
                    dirs.extend(expand_ancestors_from(start, boundary));
                }
            }
            other => {
                if let Some(dir) = resolve_search_path(other, app_name) {
                    dirs.push(dir);
                }
            }
        }
    }
    dirs
}

/// Find existing `{dir}/{file_name}` option files across the expanded
/// directories, returned in priority-ascending order.
pub fn find_option_files(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Result<Vec<PathBuf>, OptfigError> {
    let dirs = expand_search_paths(search_paths, app_name);
    let mut found = Vec::new();
    for dir in dirs {
        let path = dir.join(file_name);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => found.push(path),
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(OptfigError::IoError {
                    path,
                    source: e,
                });
            }
        }
    }
    tracing::debug!(files = found.len(), file_name, "discovered option files");
    Ok(found)
}
