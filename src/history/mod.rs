//! Append-only CSV history store.
//!
//! This module owns one series file per tracked entity. Each invocation
//! appends a single `date,count,delta` row, computing the delta against
//! the previously persisted count. Files are never rewritten: a series
//! only grows.

use crate::models::{sanitize_name, Sample, DATE_FORMAT};
use chrono::NaiveDate;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Header line written to every new series file.
pub const SERIES_HEADER: &str = "Date,Count,Delta";

/// Errors returned by the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The series file could not be read, created, or appended.
    #[error("I/O error on series file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted record could not be interpreted as `date,count[,delta]`.
    #[error("Malformed record in {path}: '{line}'")]
    Parse { path: PathBuf, line: String },

    /// No series exists yet for the entity.
    #[error("No series found for entity '{entity}'")]
    NotFound { entity: String },

    /// The entity name was empty.
    #[error("Entity name must not be empty")]
    EmptyEntity,
}

impl HistoryError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Store of append-only per-entity series files under one data directory.
pub struct HistoryStore {
    data_dir: PathBuf,
}

impl HistoryStore {
    /// Open a store rooted at `data_dir`, creating the directory if absent.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| HistoryError::io(&data_dir, e))?;
        Ok(Self { data_dir })
    }

    /// Path of the series file for an entity. Path separator characters in
    /// the entity name are replaced with underscores.
    pub fn series_path(&self, entity: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", sanitize_name(entity)))
    }

    /// Append one sample for `entity`, computing the delta against the last
    /// persisted count.
    ///
    /// A fresh series is created (header included) on the first observation;
    /// its first delta is 0. The row is formatted in memory and written with
    /// a single call, so either the full row lands or nothing does.
    ///
    /// A malformed trailing record is surfaced as a warning and treated as
    /// "no prior data" (delta 0) rather than aborting the append; genuine
    /// I/O failures are returned as [`HistoryError::Io`].
    pub fn append_sample(
        &self,
        entity: &str,
        count: u64,
        date: NaiveDate,
    ) -> Result<Sample, HistoryError> {
        if entity.trim().is_empty() {
            return Err(HistoryError::EmptyEntity);
        }

        let path = self.series_path(entity);
        let is_new = !path.exists();

        let previous = if is_new {
            None
        } else {
            match self.last_count(&path) {
                Ok(previous) => previous,
                Err(e @ HistoryError::Parse { .. }) => {
                    warn!("{}; treating series as having no prior data", e);
                    None
                }
                Err(e) => return Err(e),
            }
        };

        let delta = match previous {
            Some(previous) => count as i64 - previous as i64,
            None => 0,
        };

        let sample = Sample { date, count, delta };

        let mut buf = String::new();
        if is_new {
            buf.push_str(SERIES_HEADER);
            buf.push('\n');
        }
        buf.push_str(&sample.to_string());
        buf.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HistoryError::io(&path, e))?;
        file.write_all(buf.as_bytes())
            .map_err(|e| HistoryError::io(&path, e))?;
        file.flush().map_err(|e| HistoryError::io(&path, e))?;

        debug!("Appended sample '{}' for entity '{}'", sample, entity);
        Ok(sample)
    }

    /// Read the full persisted series for `entity`, in append order.
    ///
    /// Returns [`HistoryError::NotFound`] if no series file exists and
    /// [`HistoryError::Parse`] on the first malformed data row.
    pub fn read_series(&self, entity: &str) -> Result<Vec<Sample>, HistoryError> {
        let path = self.series_path(entity);
        if !path.exists() {
            return Err(HistoryError::NotFound {
                entity: entity.to_string(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| HistoryError::io(&path, e))?;

        let mut samples = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line == SERIES_HEADER {
                continue;
            }
            samples.push(parse_record(&path, line)?);
        }

        Ok(samples)
    }

    /// The most recent sample for `entity`, or `None` for an absent or
    /// empty series ("no history yet" is a normal state, not an error).
    pub fn latest(&self, entity: &str) -> Result<Option<Sample>, HistoryError> {
        let path = self.series_path(entity);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| HistoryError::io(&path, e))?;

        match last_data_line(&content) {
            Some(line) => Ok(Some(parse_record(&path, line)?)),
            None => Ok(None),
        }
    }

    /// Count field of the last persisted record, or `None` for a series
    /// that only holds its header.
    fn last_count(&self, path: &Path) -> Result<Option<u64>, HistoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| HistoryError::io(path, e))?;

        match last_data_line(&content) {
            Some(line) => {
                let count = line
                    .split(',')
                    .nth(1)
                    .and_then(|field| field.trim().parse::<u64>().ok())
                    .ok_or_else(|| HistoryError::Parse {
                        path: path.to_path_buf(),
                        line: line.to_string(),
                    })?;
                Ok(Some(count))
            }
            None => Ok(None),
        }
    }
}

/// The last non-empty, non-header line of a series file, if any.
fn last_data_line(content: &str) -> Option<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != SERIES_HEADER)
        .next_back()
}

/// Parse one `date,count[,delta]` record. A missing delta field reads as 0.
fn parse_record(path: &Path, line: &str) -> Result<Sample, HistoryError> {
    let malformed = || HistoryError::Parse {
        path: path.to_path_buf(),
        line: line.to_string(),
    };

    let mut fields = line.split(',');

    let date = fields
        .next()
        .and_then(|f| NaiveDate::parse_from_str(f.trim(), DATE_FORMAT).ok())
        .ok_or_else(malformed)?;
    let count = fields
        .next()
        .and_then(|f| f.trim().parse::<u64>().ok())
        .ok_or_else(malformed)?;
    let delta = match fields.next() {
        Some(f) => f.trim().parse::<i64>().map_err(|_| malformed())?,
        None => 0,
    };

    Ok(Sample { date, count, delta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_store() -> (TempDir, HistoryStore) {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_first_append_creates_series_with_header() {
        let (_dir, store) = make_store();

        let sample = store
            .append_sample("x", 100, date(2025, 1, 1))
            .unwrap();
        assert_eq!(sample.delta, 0);

        let content = std::fs::read_to_string(store.series_path("x")).unwrap();
        assert_eq!(content, "Date,Count,Delta\n2025/01/01,100,0\n");
    }

    #[test]
    fn test_second_append_computes_delta() {
        let (_dir, store) = make_store();

        store.append_sample("x", 100, date(2025, 1, 1)).unwrap();
        let sample = store.append_sample("x", 130, date(2025, 1, 2)).unwrap();
        assert_eq!(sample.delta, 30);

        let content = std::fs::read_to_string(store.series_path("x")).unwrap();
        assert_eq!(
            content,
            "Date,Count,Delta\n2025/01/01,100,0\n2025/01/02,130,30\n"
        );
    }

    #[test]
    fn test_decreasing_count_yields_negative_delta() {
        let (_dir, store) = make_store();

        store.append_sample("x", 100, date(2025, 1, 1)).unwrap();
        let sample = store.append_sample("x", 80, date(2025, 1, 2)).unwrap();
        assert_eq!(sample.delta, -20);
    }

    #[test]
    fn test_deltas_across_sequence() {
        let (_dir, store) = make_store();
        let counts = [10u64, 25, 25, 40, 30];

        for (i, &count) in counts.iter().enumerate() {
            store
                .append_sample("seq", count, date(2025, 1, i as u32 + 1))
                .unwrap();
        }

        let series = store.read_series("seq").unwrap();
        assert_eq!(series.len(), counts.len());
        assert_eq!(series[0].delta, 0);
        for i in 1..counts.len() {
            assert_eq!(
                series[i].delta,
                counts[i] as i64 - counts[i - 1] as i64
            );
        }
    }

    #[test]
    fn test_same_day_appends_are_not_deduplicated() {
        let (_dir, store) = make_store();

        store.append_sample("x", 100, date(2025, 1, 1)).unwrap();
        store.append_sample("x", 110, date(2025, 1, 1)).unwrap();

        let series = store.read_series("x").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].delta, 10);
    }

    #[test]
    fn test_read_series_returns_last_appended_sample() {
        let (_dir, store) = make_store();

        store.append_sample("x", 100, date(2025, 1, 1)).unwrap();
        let appended = store.append_sample("x", 150, date(2025, 1, 2)).unwrap();

        let series = store.read_series("x").unwrap();
        assert_eq!(*series.last().unwrap(), appended);
    }

    #[test]
    fn test_read_series_missing_is_not_found() {
        let (_dir, store) = make_store();
        assert!(matches!(
            store.read_series("missing"),
            Err(HistoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_latest_missing_is_none() {
        let (_dir, store) = make_store();
        assert!(store.latest("missing").unwrap().is_none());
    }

    #[test]
    fn test_latest_returns_last_sample() {
        let (_dir, store) = make_store();

        store.append_sample("x", 100, date(2025, 1, 1)).unwrap();
        store.append_sample("x", 120, date(2025, 1, 2)).unwrap();

        let latest = store.latest("x").unwrap().unwrap();
        assert_eq!(latest.count, 120);
        assert_eq!(latest.delta, 20);
    }

    #[test]
    fn test_corrupt_trailing_record_degrades_to_no_prior_data() {
        let (_dir, store) = make_store();

        let path = store.series_path("x");
        std::fs::write(&path, "Date,Count,Delta\n2025/01/01,not-a-number,0\n").unwrap();

        // The append still succeeds, with a delta of 0 rather than a
        // fabricated value.
        let sample = store.append_sample("x", 200, date(2025, 1, 2)).unwrap();
        assert_eq!(sample.delta, 0);

        // Reading the full series reports the corruption.
        assert!(matches!(
            store.read_series("x"),
            Err(HistoryError::Parse { .. })
        ));
    }

    #[test]
    fn test_record_without_delta_field_parses() {
        let (_dir, store) = make_store();

        let path = store.series_path("x");
        std::fs::write(&path, "Date,Count,Delta\n2025/01/01,100\n").unwrap();

        let series = store.read_series("x").unwrap();
        assert_eq!(series[0].count, 100);
        assert_eq!(series[0].delta, 0);

        let sample = store.append_sample("x", 130, date(2025, 1, 2)).unwrap();
        assert_eq!(sample.delta, 30);
    }

    #[test]
    fn test_empty_entity_name_rejected() {
        let (_dir, store) = make_store();
        assert!(matches!(
            store.append_sample("", 1, date(2025, 1, 1)),
            Err(HistoryError::EmptyEntity)
        ));
    }

    #[test]
    fn test_series_path_sanitizes_name() {
        let (_dir, store) = make_store();
        let path = store.series_path("falcosecurity/falco");
        assert!(path.ends_with("falcosecurity_falco.csv"));
    }
}
