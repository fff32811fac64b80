//! Collect the local content set from disk.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use sitesync_core::ContentUnit;

use crate::error::{io_err, SyncError};

/// Read every content file under `root` into a [`ContentUnit`].
///
/// Hidden files and directories are skipped. When `extensions` is non-empty
/// only files with one of those extensions (case-insensitive, no dot) are
/// kept. Paths are `/`-separated and relative to `root`; output is sorted by
/// path.
pub fn collect_units(root: &Path, extensions: &[String]) -> Result<Vec<ContentUnit>, SyncError> {
    if !root.is_dir() {
        return Err(io_err(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "content directory not found"),
        ));
    }

    let mut units = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let raw = std::fs::read(entry.path()).map_err(|e| io_err(entry.path(), e))?;
        units.push(ContentUnit::new(key, raw));
    }

    units.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("collected {} content unit(s) from {}", units.len(), root.display());
    Ok(units)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn md() -> Vec<String> {
        vec!["md".to_string()]
    }

    #[test]
    fn collects_nested_files_with_slash_keys_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("journal/2024")).unwrap();
        fs::write(tmp.path().join("zeta.md"), "z").unwrap();
        fs::write(tmp.path().join("journal/2024/day.md"), "d").unwrap();

        let units = collect_units(tmp.path(), &md()).unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["journal/2024/day.md", "zeta.md"]);
        assert_eq!(units[1].raw, b"z");
    }

    #[test]
    fn skips_hidden_entries_and_other_extensions() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".obsidian")).unwrap();
        fs::write(tmp.path().join(".obsidian/workspace.md"), "x").unwrap();
        fs::write(tmp.path().join(".draft.md"), "x").unwrap();
        fs::write(tmp.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(tmp.path().join("Note.MD"), "n").unwrap();

        let units = collect_units(tmp.path(), &md()).unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["Note.MD"]);
    }

    #[test]
    fn empty_extension_list_keeps_everything() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.md"), "a").unwrap();
        fs::write(tmp.path().join("b.png"), [9u8]).unwrap();

        let units = collect_units(tmp.path(), &[]).unwrap();
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = collect_units(&tmp.path().join("nope"), &md()).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "got: {err}");
    }
}
