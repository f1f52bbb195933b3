use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use tsgrid_core::{MasterOperation, Operation, ResultMatrix, TimeSeries};

use crate::bundle::{Bundle, FORMAT_VERSION};
use crate::error::StorageError;

/// On-disk encoding, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Json,
    MessagePack,
}

impl BundleFormat {
    pub fn from_path(path: &Path) -> Result<Self, StorageError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("msgpack") | Some("mpk") => Ok(Self::MessagePack),
            _ => Err(StorageError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Borrowed view used for writing, so a checkpoint can persist the
/// matrix while a run still holds it mutably.
#[derive(Serialize)]
struct BundleRef<'a> {
    format_version: u32,
    modified_at: DateTime<Utc>,
    series: &'a [TimeSeries],
    operations: &'a [Operation],
    masters: &'a [MasterOperation],
    results: &'a ResultMatrix,
}

/// File-backed bundle persistence.
#[derive(Debug, Clone)]
pub struct BundleStore {
    path: PathBuf,
    format: BundleFormat,
}

impl BundleStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let format = BundleFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> BundleFormat {
        self.format
    }

    /// Read and validate the bundle.
    pub fn load(&self) -> Result<Bundle, StorageError> {
        let bytes = fs::read(&self.path)?;
        let bundle: Bundle = match self.format {
            BundleFormat::Json => serde_json::from_slice(&bytes)?,
            BundleFormat::MessagePack => rmp_serde::from_slice(&bytes)?,
        };
        bundle.validate()?;
        info!(
            path = %self.path.display(),
            series = bundle.series.len(),
            operations = bundle.operations.len(),
            masters = bundle.masters.len(),
            "Loaded bundle"
        );
        Ok(bundle)
    }

    /// Save the whole bundle.
    pub fn save(&self, bundle: &Bundle) -> Result<(), StorageError> {
        self.save_parts(&bundle.series, &bundle.operations, &bundle.masters, &bundle.results)
    }

    /// Save from separately borrowed parts, stamping the current time.
    ///
    /// Writes to a `.tmp` sibling first, then renames over the target so a
    /// crash never leaves a truncated bundle behind.
    pub fn save_parts(
        &self,
        series: &[TimeSeries],
        operations: &[Operation],
        masters: &[MasterOperation],
        results: &ResultMatrix,
    ) -> Result<(), StorageError> {
        let view = BundleRef {
            format_version: FORMAT_VERSION,
            modified_at: Utc::now(),
            series,
            operations,
            masters,
            results,
        };
        let bytes = match self.format {
            BundleFormat::Json => serde_json::to_vec_pretty(&view)?,
            BundleFormat::MessagePack => rmp_serde::to_vec_named(&view)?,
        };

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Saved bundle");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }
}

#[cfg(test)]
mod tests {
    use tsgrid_core::{CellWrite, Quality, SeriesData};

    use super::*;

    fn bundle() -> Bundle {
        let mut series = vec![
            TimeSeries::new(1, "flat", vec![1.0, 2.0, 3.0]),
            TimeSeries::new(2, "nested", vec![]),
        ];
        series[1].data = SeriesData::Nested(vec![vec![1.0], vec![2.0]]);
        series[1].keywords = vec!["sensor".into()];
        let masters = vec![MasterOperation {
            id: 5,
            label: "DN".into(),
            code: "distribution(x)".into(),
        }];
        let operations = vec![Operation {
            id: 9,
            name: "mean".into(),
            keywords: vec!["location".into()],
            master_id: 5,
            code: "DN.mean".into(),
        }];
        let mut b = Bundle::new(series, operations, masters);
        b.results
            .write_row(
                0,
                &[CellWrite {
                    col: 0,
                    value: 2.0,
                    calc_time: 0.25,
                    quality: Quality::Good,
                }],
            )
            .unwrap();
        b
    }

    fn roundtrip(file: &str) {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join(file)).unwrap();
        let original = bundle();

        store.save(&original).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.series, original.series);
        assert_eq!(loaded.operations, original.operations);
        assert_eq!(loaded.masters, original.masters);
        assert_eq!(loaded.results, original.results);
        assert_eq!(loaded.results.quality.get(1, 0), Some(&None));
        assert_eq!(loaded.results.quality.get(0, 0), Some(&Some(Quality::Good)));
    }

    #[test]
    fn json_keeps_never_computed_cells() {
        roundtrip("bundle.json");
    }

    #[test]
    fn msgpack_keeps_never_computed_cells() {
        roundtrip("bundle.msgpack");
        roundtrip("bundle.MPK");
    }

    #[test]
    fn quality_is_stored_as_integer_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.json");
        let store = BundleStore::new(&path).unwrap();
        store.save(&bundle()).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["results"]["quality"]["data"], serde_json::json!([0, null]));
        assert_eq!(raw["format_version"], serde_json::json!(FORMAT_VERSION));
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("b.json")).unwrap();
        store.save(&bundle()).unwrap();
        store.save(&bundle()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.json".to_string()]);
    }

    #[test]
    fn load_rejects_inconsistent_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("b.json")).unwrap();
        let mut b = bundle();
        b.results = ResultMatrix::new(3, 1);
        store.save(&b).unwrap();

        assert!(matches!(store.load(), Err(StorageError::Core(_))));
    }

    #[test]
    fn unknown_extension_and_missing_file() {
        assert!(matches!(
            BundleStore::new("bundle.csv"),
            Err(StorageError::UnsupportedFormat(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("absent.json")).unwrap();
        assert!(matches!(store.load(), Err(StorageError::Io(_))));
    }
}
