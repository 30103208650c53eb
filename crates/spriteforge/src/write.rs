//! All-or-nothing file output.
//!
//! Every file of a sprite is first staged as a temp file inside the
//! output directory. Any file about to be replaced or retired is moved
//! aside to a backup, then the staged files are renamed into place. If any
//! step fails, the new files are removed and the backups are moved back,
//! so the directory holds either the complete new set or the previous
//! one. Backups are deleted once every file is in place. Temp files that
//! were never committed are deleted when they drop.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use spriteforge_export::EncodedFile;
use tempfile::{NamedTempFile, TempPath};

/// Errors from writing a sprite's files.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// A temp file could not be created or filled.
    #[error("cannot stage {file}: {source}")]
    Stage {
        /// Destination file name.
        file: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A file could not be moved aside or into place.
    #[error("cannot write {file}: {source}")]
    Commit {
        /// Destination file name.
        file: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// One path touched by a commit.
struct Slot {
    target: PathBuf,
    /// The file previously at `target`, moved aside.
    backup: Option<TempPath>,
    /// Whether a new file now sits at `target`.
    placed: bool,
}

/// Write `files` into `dir` and delete `retired` (names from a previous
/// set that the new set no longer has), either all of it or none.
///
/// Existing files with the same names are replaced. Missing retired files
/// are ignored.
///
/// # Errors
///
/// Returns [`WriteError::Stage`] if staging fails (nothing is touched)
/// and [`WriteError::Commit`] if moving a file fails (the previous files
/// are restored).
pub fn write_all_or_nothing(
    dir: &Path,
    files: &[EncodedFile],
    retired: &[String],
) -> Result<Vec<PathBuf>, WriteError> {
    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        let stage_error = |source| WriteError::Stage {
            file: file.file_name.clone(),
            source,
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(stage_error)?;
        temp.write_all(&file.bytes).map_err(stage_error)?;
        temp.flush().map_err(stage_error)?;
        staged.push((temp, file));
    }

    let mut slots: Vec<Slot> = Vec::with_capacity(files.len() + retired.len());
    for (temp, file) in staged {
        let target = dir.join(&file.file_name);
        let backup = match back_up(dir, &target) {
            Ok(backup) => backup,
            Err(source) => {
                roll_back(slots);
                return Err(WriteError::Commit {
                    file: file.file_name.clone(),
                    source,
                });
            }
        };
        let persisted = temp.persist(&target);
        slots.push(Slot {
            target,
            backup,
            placed: persisted.is_ok(),
        });
        if let Err(e) = persisted {
            roll_back(slots);
            return Err(WriteError::Commit {
                file: file.file_name.clone(),
                source: e.error,
            });
        }
    }

    for name in retired {
        let target = dir.join(name);
        match back_up(dir, &target) {
            Ok(backup) => slots.push(Slot {
                target,
                backup,
                placed: false,
            }),
            Err(source) => {
                roll_back(slots);
                return Err(WriteError::Commit {
                    file: name.clone(),
                    source,
                });
            }
        }
    }

    let mut written = Vec::with_capacity(files.len());
    for slot in slots {
        if let Some(backup) = slot.backup {
            let path = backup.to_path_buf();
            if let Err(e) = backup.close() {
                log::warn!("could not remove backup {}: {e}", path.display());
            }
        }
        if slot.placed {
            written.push(slot.target);
        }
    }
    Ok(written)
}

/// Move the file at `target` to a fresh backup path in `dir`.
///
/// Returns `None` when there is no file to move. A directory at `target`
/// is left alone; committing over it fails later.
fn back_up(dir: &Path, target: &Path) -> std::io::Result<Option<TempPath>> {
    match std::fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    }
    let backup = tempfile::Builder::new()
        .prefix(".spriteforge-")
        .suffix(".bak")
        .tempfile_in(dir)?
        .into_temp_path();
    std::fs::rename(target, &backup)?;
    Ok(Some(backup))
}

/// Undo a partial commit, newest first.
fn roll_back(slots: Vec<Slot>) {
    for slot in slots.into_iter().rev() {
        if slot.placed
            && let Err(e) = std::fs::remove_file(&slot.target)
        {
            log::warn!("could not remove {} after failed write: {e}", slot.target.display());
        }
        let Some(backup) = slot.backup else {
            continue;
        };
        match backup.keep() {
            Ok(path) => {
                if let Err(e) = std::fs::rename(&path, &slot.target) {
                    log::error!(
                        "could not restore {} from {}: {e}",
                        slot.target.display(),
                        path.display(),
                    );
                }
            }
            Err(e) => log::error!("could not keep backup of {}: {e}", slot.target.display()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn file(name: &str, bytes: &[u8]) -> EncodedFile {
        EncodedFile {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn read(dir: &Path, name: &str) -> Vec<u8> {
        std::fs::read(dir.join(name)).unwrap()
    }

    #[test]
    fn writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths =
            write_all_or_nothing(dir.path(), &[file("a.png", b"one"), file("b.png", b"two")], &[])
                .unwrap();
        assert_eq!(paths, [dir.path().join("a.png"), dir.path().join("b.png")]);
        assert_eq!(read(dir.path(), "b.png"), b"two");
        assert_eq!(entries(dir.path()), ["a.png", "b.png"]);
    }

    #[test]
    fn replaces_existing_files_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"old").unwrap();
        write_all_or_nothing(dir.path(), &[file("a.png", b"new")], &[]).unwrap();
        assert_eq!(read(dir.path(), "a.png"), b"new");
        assert_eq!(entries(dir.path()), ["a.png"]);
    }

    #[test]
    fn failed_commit_restores_previous_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"old a").unwrap();
        std::fs::write(dir.path().join("c.png"), b"old c").unwrap();
        // A directory in the way makes the second rename fail.
        std::fs::create_dir(dir.path().join("b.png")).unwrap();

        let result = write_all_or_nothing(
            dir.path(),
            &[file("a.png", b"one"), file("b.png", b"two"), file("c.png", b"three")],
            &[],
        );
        assert!(matches!(result, Err(WriteError::Commit { ref file, .. }) if file == "b.png"));
        assert_eq!(entries(dir.path()), ["a.png", "b.png", "c.png"]);
        assert_eq!(read(dir.path(), "a.png"), b"old a");
        assert_eq!(read(dir.path(), "c.png"), b"old c");
    }

    #[test]
    fn retired_files_are_removed_on_success() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s_frame0.png", "s_frame1.png", "s_frame2.png"] {
            std::fs::write(dir.path().join(name), b"old").unwrap();
        }
        let retired = ["s_frame1.png".to_string(), "s_frame2.png".to_string()];
        let paths =
            write_all_or_nothing(dir.path(), &[file("s_frame0.png", b"new")], &retired).unwrap();
        assert_eq!(paths, [dir.path().join("s_frame0.png")]);
        assert_eq!(entries(dir.path()), ["s_frame0.png"]);
    }

    #[test]
    fn retired_files_survive_a_failed_commit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s.png"), b"old still").unwrap();
        std::fs::write(dir.path().join("s_frame1.png"), b"old frame").unwrap();
        std::fs::create_dir(dir.path().join("s_frame0.png")).unwrap();

        let result = write_all_or_nothing(
            dir.path(),
            &[file("s_frame0.png", b"new")],
            &["s.png".to_string(), "s_frame1.png".to_string()],
        );
        assert!(matches!(result, Err(WriteError::Commit { .. })));
        assert_eq!(entries(dir.path()), ["s.png", "s_frame0.png", "s_frame1.png"]);
        assert_eq!(read(dir.path(), "s.png"), b"old still");
        assert_eq!(read(dir.path(), "s_frame1.png"), b"old frame");
    }

    #[test]
    fn missing_directory_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let result = write_all_or_nothing(&missing, &[file("a.png", b"one")], &[]);
        assert!(matches!(result, Err(WriteError::Stage { .. })));
        assert!(!missing.exists());
    }
}
