//! Source registry and change detection
//!
//! One source unit per file in the behavior directory; the unit name is the
//! file stem. The registry keeps the snapshot that was last compiled
//! successfully and compares the directory against it on every scan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{BehaviorError, Result};

/// One named piece of behavior source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Unit name (file stem)
    pub name: String,
    /// Backing file
    pub path: PathBuf,
    /// Source text
    pub text: String,
    /// Modification time of the backing file when the text was read
    pub last_modified: SystemTime,
}

/// Modification stamp of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub len: u64,
}

impl FileStamp {
    fn of_unit(unit: &SourceUnit) -> Self {
        Self {
            modified: unit.last_modified,
            len: unit.text.len() as u64,
        }
    }
}

/// Stamps of every unit in a directory, keyed by unit name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFingerprint(BTreeMap<String, FileStamp>);

impl SourceFingerprint {
    /// Fingerprint of a set of units
    pub fn of_units(units: &[SourceUnit]) -> Self {
        Self(
            units
                .iter()
                .map(|unit| (unit.name.clone(), FileStamp::of_unit(unit)))
                .collect(),
        )
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no unit is present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Units that differ between the recorded snapshot and the directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Total number of changed units
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Whether a unit appears in any category
    pub fn contains(&self, name: &str) -> bool {
        [&self.added, &self.modified, &self.removed]
            .iter()
            .any(|names| names.iter().any(|n| n == name))
    }
}

impl std::fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "+{} ~{} -{}",
            self.added.len(),
            self.modified.len(),
            self.removed.len()
        )
    }
}

/// Tracks source units of one directory
pub struct SourceRegistry {
    directory: PathBuf,
    extension: String,
    /// Snapshot of the last successful compilation
    units: BTreeMap<String, SourceUnit>,
}

impl SourceRegistry {
    /// Create a registry over a directory
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
            units: BTreeMap::new(),
        }
    }

    /// The watched directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the directory when missing
    pub fn ensure_directory(&self) -> Result<()> {
        fs::create_dir_all(&self.directory).map_err(|e| BehaviorError::io(&self.directory, e))
    }

    /// Compare the directory against the recorded snapshot
    ///
    /// Only reads file metadata; never touches recorded state.
    pub fn scan(&self) -> Result<ChangeSet> {
        let on_disk = self.disk_fingerprint()?;
        let mut changes = ChangeSet::default();

        for (name, stamp) in &on_disk.0 {
            match self.units.get(name) {
                None => changes.added.push(name.clone()),
                Some(unit) if FileStamp::of_unit(unit) != *stamp => {
                    changes.modified.push(name.clone())
                }
                Some(_) => {}
            }
        }
        for name in self.units.keys() {
            if !on_disk.0.contains_key(name) {
                changes.removed.push(name.clone());
            }
        }

        Ok(changes)
    }

    /// Stamps of the units currently on disk
    pub fn disk_fingerprint(&self) -> Result<SourceFingerprint> {
        let mut stamps = BTreeMap::new();
        for (name, path) in self.list_files()? {
            let metadata = fs::metadata(&path).map_err(|e| BehaviorError::io(&path, e))?;
            let modified = metadata.modified().map_err(|e| BehaviorError::io(&path, e))?;
            stamps.insert(
                name,
                FileStamp {
                    modified,
                    len: metadata.len(),
                },
            );
        }
        Ok(SourceFingerprint(stamps))
    }

    /// Read every unit currently on disk, ordered by name
    pub fn read_all(&self) -> Result<Vec<SourceUnit>> {
        self.list_files()?
            .into_iter()
            .map(|(name, path)| read_unit(name, path))
            .collect()
    }

    /// Make `units` the new baseline for future scans
    pub fn record_all(&mut self, units: &[SourceUnit]) {
        self.units = units
            .iter()
            .map(|unit| (unit.name.clone(), unit.clone()))
            .collect();
        log::debug!("Recorded {} source unit(s)", self.units.len());
    }

    /// Recorded unit by name
    pub fn get(&self, name: &str) -> Option<&SourceUnit> {
        self.units.get(name)
    }

    /// Names of recorded units
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Number of recorded units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// File backing a unit name
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.directory.join(format!("{}.{}", name, self.extension)))
    }

    /// Current on-disk text of a unit
    pub fn read_source(&self, name: &str) -> Result<String> {
        let path = self.path_for(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BehaviorError::SourceNotFound(name.to_string()))
            }
            Err(e) => Err(BehaviorError::io(path, e)),
        }
    }

    /// Write a unit's text, creating the file if needed
    pub fn write_source(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        self.ensure_directory()?;
        fs::write(&path, text).map_err(|e| BehaviorError::io(&path, e))?;
        log::debug!("Wrote source '{}' ({} bytes)", name, text.len());
        Ok(path)
    }

    /// Delete a unit's file; false when it did not exist
    pub fn delete_source(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Deleted source '{}'", name);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BehaviorError::io(path, e)),
        }
    }

    /// Source files in the directory, ordered by unit name
    fn list_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BehaviorError::io(&self.directory, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BehaviorError::io(&self.directory, e))?;
            let path = entry.path();
            if !path.is_file() || !self.is_source_file(&path) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(name).is_ok() {
                    files.push((name.to_string(), path.clone()));
                } else {
                    log::warn!("Ignoring source file with unusable name: {}", path.display());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }
}

fn read_unit(name: String, path: PathBuf) -> Result<SourceUnit> {
    let last_modified = fs::metadata(&path)
        .and_then(|m| m.modified())
        .map_err(|e| BehaviorError::io(&path, e))?;
    let text = fs::read_to_string(&path).map_err(|e| BehaviorError::io(&path, e))?;

    Ok(SourceUnit {
        name,
        path,
        text,
        last_modified,
    })
}

/// Unit names are identifiers plus `-`
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(BehaviorError::InvalidSourceName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn bump(path: &Path, secs: u64) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_scan_detects_added_modified_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SourceRegistry::new(dir.path(), "vs");

        registry.write_source("a", "behavior A {}").unwrap();
        registry.write_source("b", "behavior B {}").unwrap();

        let changes = registry.scan().unwrap();
        assert_eq!(changes.added, vec!["a", "b"]);
        assert!(changes.modified.is_empty());

        let units = registry.read_all().unwrap();
        registry.record_all(&units);
        assert!(registry.scan().unwrap().is_empty());

        let a = registry.write_source("a", "behavior A { let x = 1; }").unwrap();
        bump(&a, 5);
        registry.delete_source("b").unwrap();

        let changes = registry.scan().unwrap();
        assert_eq!(changes.modified, vec!["a"]);
        assert_eq!(changes.removed, vec!["b"]);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SourceRegistry::new(dir.path(), "vs");
        registry.write_source("a", "behavior A {}").unwrap();
        let units = registry.read_all().unwrap();
        registry.record_all(&units);

        assert!(registry.scan().unwrap().is_empty());
        assert!(registry.scan().unwrap().is_empty());
    }

    #[test]
    fn test_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("nested.vs")).unwrap();
        fs::write(dir.path().join("good.vs"), "").unwrap();

        let registry = SourceRegistry::new(dir.path(), "vs");
        let units = registry.read_all().unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "good");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SourceRegistry::new(dir.path().join("absent"), "vs");
        assert!(registry.scan().unwrap().is_empty());
        assert!(registry.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_source_names() {
        assert!(validate_name("Player_Controller-2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("a.b").is_err());
    }

    #[test]
    fn test_read_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SourceRegistry::new(dir.path(), "vs");

        registry.write_source("foo", "use core;").unwrap();
        assert_eq!(registry.read_source("foo").unwrap(), "use core;");

        assert!(registry.delete_source("foo").unwrap());
        assert!(!registry.delete_source("foo").unwrap());
        assert!(matches!(
            registry.read_source("foo"),
            Err(BehaviorError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_fingerprint_matches_read_units() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SourceRegistry::new(dir.path(), "vs");
        registry.write_source("a", "behavior A {}").unwrap();

        let units = registry.read_all().unwrap();
        assert_eq!(
            SourceFingerprint::of_units(&units),
            registry.disk_fingerprint().unwrap()
        );
    }
}
