//! Vocabulary snapshot persistence.
//!
//! The domain vocabulary lives in memory inside one process. The CLI runs
//! one process per command, so `vocab rebuild` writes the snapshot to the
//! JSON file named by `[vocabulary].path` and later commands load it.
//!
//! ```json
//! {
//!   "terms": ["tenant", "vpc"],
//!   "generated_at": "2026-10-16T09:30:00Z",
//!   "stage": "cleaned_json",
//!   "fell_back": false
//! }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use docroute_core::terms::{ParseStage, RebuildReport};
use docroute_core::vocabulary::DomainVocabulary;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyFile {
    pub terms: Vec<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub fell_back: bool,
}

impl VocabularyFile {
    pub fn from_report(report: &RebuildReport) -> Self {
        Self {
            terms: report.terms.clone(),
            generated_at: Utc::now(),
            stage: report.stage.map(stage_name),
            fell_back: report.fell_back,
        }
    }

    pub fn seed() -> Self {
        Self {
            terms: DomainVocabulary::seed().terms().to_vec(),
            generated_at: Utc::now(),
            stage: None,
            fell_back: true,
        }
    }

    pub fn to_vocabulary(&self) -> DomainVocabulary {
        DomainVocabulary::from_terms(&self.terms)
    }
}

fn stage_name(stage: ParseStage) -> String {
    serde_json::to_value(stage)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| stage.to_string())
}

/// Read a snapshot. A missing file yields `None`.
pub fn load(path: &Path) -> Result<Option<VocabularyFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vocabulary file: {}", path.display()))?;
    let file: VocabularyFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse vocabulary file: {}", path.display()))?;
    Ok(Some(file))
}

/// Write a snapshot, creating parent directories as needed.
///
/// The JSON goes to a temporary file in the same directory which is then
/// renamed over `path`, so readers see either the old or the new snapshot.
pub fn save(path: &Path, file: &VocabularyFile) -> Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            parent
        }
        None => Path::new("."),
    };

    let json = serde_json::to_string_pretty(file)?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in: {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .with_context(|| format!("Failed to write vocabulary file: {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write vocabulary file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/vocabulary.json");
        let report = RebuildReport {
            terms: vec!["tenant".to_string(), "vpc".to_string()],
            stage: Some(ParseStage::BracketedSpan),
            fell_back: false,
        };

        save(&path, &VocabularyFile::from_report(&report)).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        assert_eq!(loaded.terms, vec!["tenant", "vpc"]);
        assert_eq!(loaded.stage.as_deref(), Some("bracketed_span"));
        assert!(!loaded.fell_back);
        assert_eq!(loaded.to_vocabulary().terms(), &["tenant", "vpc"]);
    }

    #[test]
    fn test_save_replaces_existing_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vocabulary.json");
        std::fs::write(&path, r#"{"terms": ["stale"#).unwrap();

        let file = VocabularyFile {
            terms: vec!["helm".to_string()],
            ..VocabularyFile::seed()
        };
        save(&path, &file).unwrap();

        assert_eq!(load(&path).unwrap().unwrap().terms, vec!["helm"]);
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temporary file left behind");
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load(&tmp.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vocabulary.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_seed_file() {
        let seed = VocabularyFile::seed();
        assert!(seed.fell_back);
        assert!(seed.to_vocabulary().is_seed());
    }
}
