//! Source file staleness detection

use crate::error::{DataMcpError, DataMcpResult};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;

/// Size and modification time of a file at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStat {
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

impl SourceStat {
    /// Stat a file
    pub async fn read(path: &Path) -> DataMcpResult<Self> {
        let meta = fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DataMcpError::PathNotFound(path.to_path_buf())
            } else {
                DataMcpError::io(format!("reading metadata of {}", path.display()), e)
            }
        })?;

        let modified = meta
            .modified()
            .map_err(|e| DataMcpError::io(format!("reading mtime of {}", path.display()), e))?;

        Ok(Self {
            size: meta.len(),
            modified: DateTime::<Utc>::from(modified),
        })
    }

    /// Whether this file differs from a recorded snapshot
    ///
    /// Any mtime difference counts, including a rollback to an earlier time.
    pub fn differs_from(&self, recorded_size: u64, recorded_modified: DateTime<Utc>) -> bool {
        if self.size != recorded_size {
            return true;
        }
        self.modified != recorded_modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn read_reports_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let stat = SourceStat::read(&path).await.unwrap();
        assert_eq!(stat.size, 8);
    }

    #[tokio::test]
    async fn read_missing_file_is_path_not_found() {
        let dir = TempDir::new().unwrap();
        let err = SourceStat::read(&dir.path().join("gone.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, DataMcpError::PathNotFound(_)));
    }

    #[test]
    fn unchanged_snapshot() {
        let now = Utc::now();
        let stat = SourceStat {
            size: 10,
            modified: now,
        };
        assert!(!stat.differs_from(10, now));
    }

    #[test]
    fn size_change_is_detected() {
        let now = Utc::now();
        let stat = SourceStat {
            size: 11,
            modified: now,
        };
        assert!(stat.differs_from(10, now));
    }

    #[test]
    fn mtime_change_in_either_direction_is_detected() {
        let now = Utc::now();
        let newer = SourceStat {
            size: 10,
            modified: now + Duration::seconds(5),
        };
        let older = SourceStat {
            size: 10,
            modified: now - Duration::seconds(5),
        };
        assert!(newer.differs_from(10, now));
        assert!(older.differs_from(10, now));
    }
}
