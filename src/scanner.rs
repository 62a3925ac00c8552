//! Documentation file discovery.

use glob::Pattern;
use log::warn;
use std::path::{Path, PathBuf};

use crate::config::InputSection;
use crate::error::{Phase, WeaveError};

/// Find documentation files under the configured directories.
///
/// Include patterns match the file name, exclude patterns match either the
/// file name or the path relative to the scanned directory. Unreadable
/// directories are skipped with a warning; the result is sorted.
pub fn scan(input: &InputSection) -> Result<Vec<PathBuf>, WeaveError> {
    let include = compile(&input.include, "include")?;
    let exclude = compile(&input.exclude, "exclude")?;
    let recursive = input.recursive.unwrap_or(true);

    let mut files = Vec::new();
    for dir in &input.directories {
        let root = Path::new(dir);
        if !root.is_dir() {
            warn!("skipping missing input directory {}", root.display());
            continue;
        }
        walk(root, root, recursive, &include, &exclude, &mut files);
    }

    files.sort();
    Ok(files)
}

fn compile(patterns: &[String], which: &str) -> Result<Vec<Pattern>, WeaveError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| {
                WeaveError::new(Phase::Scan, "", 0, format!("invalid {which} pattern {p:?}"))
                    .with_cause(e)
            })
        })
        .collect()
}

fn walk(
    root: &Path,
    dir: &Path,
    recursive: bool,
    include: &[Pattern],
    exclude: &[Pattern],
    files: &mut Vec<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("skipping unreadable directory {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if matches_any(exclude, &path, relative) {
            continue;
        }
        if path.is_dir() {
            if recursive {
                walk(root, &path, recursive, include, exclude, files);
            }
        } else if matches_any(include, &path, relative) {
            files.push(path);
        }
    }
}

fn matches_any(patterns: &[Pattern], path: &Path, relative: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy());
    patterns.iter().any(|p| {
        p.matches_path(relative)
            || name.as_deref().is_some_and(|n| p.matches(n))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn input(dir: &Path) -> InputSection {
        InputSection {
            directories: vec![dir.to_string_lossy().into_owned()],
            ..InputSection::default()
        }
    }

    #[test]
    fn finds_included_files_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("b.md"));
        touch(&tmp.path().join("a.md"));
        touch(&tmp.path().join("notes.rst"));

        let files = scan(&input(tmp.path())).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[test]
    fn recurses_into_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("deep/nested/guide.adoc"));

        let files = scan(&input(tmp.path())).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("deep/nested/guide.adoc"));
    }

    #[test]
    fn recursive_false_stays_shallow() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("top.md"));
        touch(&tmp.path().join("sub/below.md"));

        let mut cfg = input(tmp.path());
        cfg.recursive = Some(false);
        let files = scan(&cfg).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("top.md"));
    }

    #[test]
    fn exclude_patterns_prune_directories() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("docs.md"));
        touch(&tmp.path().join("vendor/third_party.md"));
        touch(&tmp.path().join("node_modules/pkg/readme.md"));

        let files = scan(&input(tmp.path())).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("docs.md"));
    }

    #[test]
    fn missing_directory_is_skipped() {
        let mut cfg = InputSection::default();
        cfg.directories = vec!["/no/such/dir/anywhere".to_string()];
        let files = scan(&cfg).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn invalid_pattern_is_a_scan_error() {
        let mut cfg = InputSection::default();
        cfg.include = vec!["[broken".to_string()];
        let err = scan(&cfg).unwrap_err();
        assert!(err.to_string().starts_with("[scan]"));
        assert!(err.to_string().contains("include"));
    }
}
