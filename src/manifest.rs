use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::measure::LengthMetric;

pub const MANIFEST_FILE: &str = "manifest.json";

/// The split/merge contract, written next to the part files. The merger
/// needs `parts` (ordering) and `chunk_overlap`; everything else is
/// informational or consumed by the transformation step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub original_file: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub length_metric: LengthMetric,
    pub parts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Manifest {
    /// Load and validate `manifest.json` from `dir`. Missing or malformed
    /// manifests and an empty part list are hard failures: without chunk
    /// ordering there is nothing to process or merge.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read manifest {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&raw)
            .with_context(|| format!("parse manifest {}", path.display()))?;
        if manifest.parts.is_empty() {
            bail!("manifest {} lists no parts", path.display());
        }
        Ok(manifest)
    }

    /// Write `manifest.json` into `dir`, pretty-printed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let raw = serde_json::to_string_pretty(self).context("serialize manifest")?;
        fs::write(&path, raw).with_context(|| format!("write manifest {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            original_file: "book.txt".into(),
            chunk_size: 1_000_000,
            chunk_overlap: 20_000,
            length_metric: LengthMetric::Chars,
            parts: vec!["part_1.txt".into(), "part_2.txt".into()],
            created_at: Some(Utc::now()),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        sample().save(dir.path()).unwrap();
        let loaded = Manifest::load(dir.path()).unwrap();
        assert_eq!(loaded.original_file, "book.txt");
        assert_eq!(loaded.chunk_overlap, 20_000);
        assert_eq!(loaded.length_metric, LengthMetric::Chars);
        assert_eq!(loaded.parts, vec!["part_1.txt", "part_2.txt"]);
    }

    #[test]
    fn load_accepts_manifest_without_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let raw = r#"{
            "original_file": "a.txt",
            "chunk_size": 100,
            "chunk_overlap": 10,
            "length_metric": "tokens",
            "parts": ["part_1.txt"]
        }"#;
        fs::write(dir.path().join(MANIFEST_FILE), raw).unwrap();
        let loaded = Manifest::load(dir.path()).unwrap();
        assert_eq!(loaded.length_metric, LengthMetric::Tokens);
        assert!(loaded.created_at.is_none());
    }

    #[test]
    fn load_fails_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::load(dir.path()).is_err());
    }

    #[test]
    fn load_rejects_empty_parts() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = sample();
        manifest.parts.clear();
        manifest.save(dir.path()).unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no parts"));
    }
}
