//! Reading and writing project files

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Lang, Project};

#[derive(Debug, Error)]
pub enum ProjectFileError {
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{} is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to read standard input: {0}")]
    Stdin(io::Error),

    #[error("Standard input is not valid UTF-8")]
    StdinEncoding,
}

/// A project file on disk
#[derive(Debug, Clone)]
pub struct ProjectFile {
    path: PathBuf,
}

impl ProjectFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file as UTF-8 text
    pub fn read(&self) -> Result<String, ProjectFileError> {
        let bytes = fs::read(&self.path).map_err(|source| ProjectFileError::Read {
            path: self.path.clone(),
            source,
        })?;

        String::from_utf8(bytes).map_err(|_| ProjectFileError::Encoding {
            path: self.path.clone(),
        })
    }

    /// Reads and parses the file
    pub fn load(&self, today: NaiveDate, default_lang: Lang) -> Result<Project, ProjectFileError> {
        let text = self.read()?;
        debug!(path = %self.path.display(), bytes = text.len(), "loaded project file");
        Ok(Project::parse(&text, today, default_lang).with_path(&self.path))
    }

    /// Replaces the file contents atomically
    ///
    /// Nothing is written when the content is unchanged.
    pub fn save(&self, text: &str) -> Result<bool, ProjectFileError> {
        if fs::read(&self.path).is_ok_and(|old| old == text.as_bytes()) {
            debug!(path = %self.path.display(), "project file unchanged");
            return Ok(false);
        }

        write_atomic(&self.path, text.as_bytes()).map_err(|source| ProjectFileError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "rewrote project file");
        Ok(true)
    }
}

/// Reads a whole project from a reader, typically stdin
pub fn read_text(mut reader: impl Read) -> Result<String, ProjectFileError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(ProjectFileError::Stdin)?;
    String::from_utf8(bytes).map_err(|_| ProjectFileError::StdinEncoding)
}

/// Writes to a temp file next to `path`, then renames it over `path`
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = dir.join(format!(".{}.tmp", file_name));

    if let Err(e) = fs::write(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    // Keep the permissions of the file being replaced
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&temp_path, meta.permissions());
    }

    fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ENGLISH;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 3, 16).unwrap()
    }

    #[test]
    fn load_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.egt");
        fs::write(&path, "2016\n15 march: 9:00-10:00\n").unwrap();

        let file = ProjectFile::new(&path);
        let project = file.load(today(), ENGLISH).unwrap();
        assert_eq!(project.name(), "site");

        assert!(!file.save(&project.render()).unwrap());
        assert!(file.save("2016\n").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "2016\n");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = ProjectFile::new(dir.path().join("missing"));
        assert!(matches!(file.read(), Err(ProjectFileError::Read { .. })));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad");
        fs::write(&path, [0x66, 0xff, 0x0a]).unwrap();

        let file = ProjectFile::new(&path);
        assert!(matches!(file.read(), Err(ProjectFileError::Encoding { .. })));
        assert!(matches!(read_text(&[0xffu8][..]), Err(ProjectFileError::StdinEncoding)));
    }

    #[test]
    fn unwritable_destination_leaves_original() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be
        fs::create_dir_all(dir.path().join("x")).unwrap();
        let file = ProjectFile::new(dir.path().join("x"));

        assert!(matches!(file.save("text"), Err(ProjectFileError::Write { .. })));
        assert!(dir.path().join("x").is_dir());
        assert!(!dir.path().join(".x.tmp").exists());
    }
}
