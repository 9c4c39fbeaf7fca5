use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::info;

use crate::errors::{Error, Result};
use crate::model::{LogRow, SensorGroup, TIMESTAMP_FORMAT};

/// Append-only per-sensor-group time series. Append failures are reported to
/// the caller; they must never take down ingestion.
pub trait LogStore: Send + Sync {
    fn append(&self, group: SensorGroup, row: &LogRow) -> Result<()>;

    /// Full row set of one group's table, in insertion order. Callers are
    /// responsible for sorting and merging.
    fn read_all(&self, group: SensorGroup) -> Result<Vec<LogRow>>;
}

/// One CSV file per sensor group under a data directory. Header row matches
/// the group's fixed column set; missing values are blank cells.
pub struct CsvLogStore {
    dir: PathBuf,
}

impl CsvLogStore {
    /// Open (or create) the data directory and seed each group's table with
    /// its header row if the file does not exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        for group in SensorGroup::ALL {
            let path = table_path(&dir, group);
            if !path.exists() {
                let mut writer = csv::Writer::from_path(&path)?;
                let mut header = vec!["Timestamp".to_string()];
                header.extend(group.columns().iter().map(|c| c.header().to_string()));
                writer.write_record(&header)?;
                writer.flush()?;
                info!("Created log table {}", path.display());
            }
        }

        Ok(Self { dir })
    }

    fn path(&self, group: SensorGroup) -> PathBuf {
        table_path(&self.dir, group)
    }
}

fn table_path(dir: &Path, group: SensorGroup) -> PathBuf {
    dir.join(format!("{}.csv", group.as_str()))
}

impl LogStore for CsvLogStore {
    fn append(&self, group: SensorGroup, row: &LogRow) -> Result<()> {
        let file = OpenOptions::new().append(true).open(self.path(group))?;
        let mut writer = csv::Writer::from_writer(file);

        let mut record = vec![row.timestamp.format(TIMESTAMP_FORMAT).to_string()];
        for value in &row.values {
            record.push(match value {
                Some(v) => v.to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
        writer.flush()?;
        Ok(())
    }

    fn read_all(&self, group: SensorGroup) -> Result<Vec<LogRow>> {
        let mut reader = csv::Reader::from_path(self.path(group))?;
        let width = group.columns().len();
        let mut rows = Vec::new();

        for record in reader.records() {
            let record = record?;
            let ts_field = record
                .get(0)
                .ok_or_else(|| Error::LogFormat("row without timestamp".to_string()))?;
            let timestamp = NaiveDateTime::parse_from_str(ts_field, TIMESTAMP_FORMAT)
                .map_err(|e| Error::LogFormat(format!("bad timestamp {:?}: {}", ts_field, e)))?;

            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let field = record.get(i + 1).unwrap_or("");
                if field.is_empty() {
                    values.push(None);
                } else {
                    let v = field.parse::<f64>().map_err(|e| {
                        Error::LogFormat(format!("bad value {:?}: {}", field, e))
                    })?;
                    values.push(Some(v));
                }
            }
            rows.push(LogRow { timestamp, values });
        }

        Ok(rows)
    }
}

/// In-memory log tables, used by tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryLogStore {
    tables: parking_lot::Mutex<std::collections::HashMap<SensorGroup, Vec<LogRow>>>,
}

#[cfg(test)]
impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl LogStore for MemoryLogStore {
    fn append(&self, group: SensorGroup, row: &LogRow) -> Result<()> {
        self.tables
            .lock()
            .entry(group)
            .or_default()
            .push(row.clone());
        Ok(())
    }

    fn read_all(&self, group: SensorGroup) -> Result<Vec<LogRow>> {
        Ok(self
            .tables
            .lock()
            .get(&group)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::Rng;

    fn temp_dir() -> PathBuf {
        let mut rng = rand::thread_rng();
        std::env::temp_dir().join(format!("monitor-logstore-{}", rng.gen::<u64>()))
    }

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_append_then_read_all_preserves_order_and_gaps() {
        let dir = temp_dir();
        let store = CsvLogStore::new(&dir).unwrap();

        let rows = vec![
            LogRow { timestamp: ts(10, 0, 0), values: vec![Some(612.0), Some(21.4), Some(48.2)] },
            LogRow { timestamp: ts(10, 0, 5), values: vec![Some(620.0), None, Some(48.0)] },
        ];
        for row in &rows {
            store.append(SensorGroup::Scd41, row).unwrap();
        }

        let read = store.read_all(SensorGroup::Scd41).unwrap();
        assert_eq!(read, rows);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_new_table_is_empty_not_an_error() {
        let dir = temp_dir();
        let store = CsvLogStore::new(&dir).unwrap();
        assert!(store.read_all(SensorGroup::Sps30).unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let dir = temp_dir();
        let store = CsvLogStore::new(&dir).unwrap();
        std::fs::remove_file(dir.join("ccs811.csv")).unwrap();
        assert!(store.read_all(SensorGroup::Ccs811).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tables_are_independent() {
        let dir = temp_dir();
        let store = CsvLogStore::new(&dir).unwrap();
        store
            .append(
                SensorGroup::Ccs811,
                &LogRow { timestamp: ts(9, 0, 0), values: vec![Some(400.0), Some(10.0)] },
            )
            .unwrap();
        assert_eq!(store.read_all(SensorGroup::Ccs811).unwrap().len(), 1);
        assert!(store.read_all(SensorGroup::Scd41).unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reopening_does_not_truncate() {
        let dir = temp_dir();
        {
            let store = CsvLogStore::new(&dir).unwrap();
            store
                .append(
                    SensorGroup::Sps30,
                    &LogRow { timestamp: ts(8, 30, 0), values: vec![Some(1.0), Some(2.0), Some(3.0)] },
                )
                .unwrap();
        }
        let store = CsvLogStore::new(&dir).unwrap();
        assert_eq!(store.read_all(SensorGroup::Sps30).unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
