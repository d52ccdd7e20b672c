//! Verbatim copying of static assets.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(thiserror::Error, Debug)]
pub enum PassthroughError {
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Copy each input-relative entry (file or directory) to the same relative
/// location under `output_dir`.
///
/// Entries that do not exist are skipped. Returns the number of files copied.
pub fn copy_passthrough(
    input_dir: &Path,
    output_dir: &Path,
    entries: &[PathBuf],
) -> Result<usize, PassthroughError> {
    let mut copied = 0;

    for entry in entries {
        let source = input_dir.join(entry);
        if !source.exists() {
            tracing::debug!("passthrough path {} does not exist, skipping", entry.display());
            continue;
        }

        for item in WalkDir::new(&source).sort_by_file_name() {
            let item = item.map_err(|e| PassthroughError::Walk {
                path: source.clone(),
                source: e,
            })?;
            if !item.file_type().is_file() {
                continue;
            }

            let relative = item.path().strip_prefix(input_dir).unwrap_or(item.path());
            let dest = output_dir.join(relative);
            copy_file(item.path(), &dest)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), PassthroughError> {
    let map_err = |e| PassthroughError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(map_err)?;
    }
    std::fs::copy(from, to).map_err(map_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, path: &str, content: &[u8]) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    #[test]
    fn test_copies_files_and_directories_byte_for_byte() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let png = [0x89u8, b'P', b'N', b'G', 0, 1, 2, 255];
        write(input.path(), "img/logo.png", &png);
        write(input.path(), "img/icons/a.svg", b"<svg/>");
        write(input.path(), "robots.txt", b"User-agent: *\n");

        let entries = vec![PathBuf::from("img"), PathBuf::from("robots.txt")];
        let copied = copy_passthrough(input.path(), output.path(), &entries).unwrap();

        assert_eq!(copied, 3);
        assert_eq!(std::fs::read(output.path().join("img/logo.png")).unwrap(), png);
        assert_eq!(
            std::fs::read(output.path().join("img/icons/a.svg")).unwrap(),
            b"<svg/>"
        );
        assert_eq!(
            std::fs::read(output.path().join("robots.txt")).unwrap(),
            b"User-agent: *\n"
        );
    }

    #[test]
    fn test_missing_entries_are_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let entries = vec![PathBuf::from("font"), PathBuf::from("css")];
        let copied = copy_passthrough(input.path(), output.path(), &entries).unwrap();
        assert_eq!(copied, 0);
    }
}
