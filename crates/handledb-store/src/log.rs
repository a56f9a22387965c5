//! Single-file append-only binding log.
//!
//! The durable layout is one file: a fixed header followed by
//! length-prefixed bincode records of `(token, table)`. Rebinding a
//! token appends a fresh record; replay applies records in order so the
//! last write wins. A truncated trailing record (crash mid-append) is
//! tolerated on replay.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use handledb_core::Table;

use crate::error::{StoreError, StoreResult};

/// File magic: "HDLG".
const MAGIC: [u8; 4] = *b"HDLG";
/// Current format version.
const VERSION: u32 = 1;
/// Header size: magic + version.
const HEADER_LEN: u64 = 8;

/// Append-only log of handle→table bindings.
pub struct StoreLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl StoreLog {
    /// Opens the log at `path`, creating it if absent, and replays all
    /// records into a token→table map (last write wins).
    pub fn open(path: impl AsRef<Path>) -> StoreResult<(Self, HashMap<String, Table>)> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let len = file.metadata()?.len();
        let bindings = if len == 0 {
            file.write_all(&MAGIC)?;
            file.write_all(&VERSION.to_le_bytes())?;
            file.sync_all()?;
            HashMap::new()
        } else {
            Self::replay(&mut file, len)?
        };

        file.seek(SeekFrom::End(0))?;
        debug!(path = %path.display(), bindings = bindings.len(), "opened store log");

        Ok((
            Self {
                path,
                file: Mutex::new(file),
            },
            bindings,
        ))
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a binding record and syncs it to disk.
    pub fn append(&self, token: &str, table: &Table) -> StoreResult<()> {
        let payload = bincode::serialize(&(token, table))
            .map_err(|e| StoreError::serialization(token, e.to_string()))?;

        let mut file = self.file.lock();
        file.write_all(&(payload.len() as u32).to_le_bytes())?;
        file.write_all(&payload)?;
        file.sync_data()?;
        Ok(())
    }

    /// Rewrites the log to hold exactly the given live bindings. Drops
    /// superseded records accumulated by rebinds.
    pub fn compact(&self, bindings: &HashMap<String, Table>) -> StoreResult<()> {
        let mut file = self.file.lock();

        let tmp_path = self.path.with_extension("compact");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&MAGIC)?;
        tmp.write_all(&VERSION.to_le_bytes())?;
        for (token, table) in bindings {
            let payload = bincode::serialize(&(token, table))
                .map_err(|e| StoreError::serialization(token.clone(), e.to_string()))?;
            tmp.write_all(&(payload.len() as u32).to_le_bytes())?;
            tmp.write_all(&payload)?;
        }
        tmp.sync_all()?;
        drop(tmp);

        std::fs::rename(&tmp_path, &self.path)?;

        let mut reopened = OpenOptions::new().read(true).write(true).open(&self.path)?;
        reopened.seek(SeekFrom::End(0))?;
        *file = reopened;
        Ok(())
    }

    fn replay(file: &mut File, len: u64) -> StoreResult<HashMap<String, Table>> {
        file.seek(SeekFrom::Start(0))?;

        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)?;
        if header[..4] != MAGIC {
            return Err(StoreError::corrupt(0, "bad magic"));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != VERSION {
            return Err(StoreError::corrupt(
                4,
                format!("unsupported version {}", version),
            ));
        }

        let mut bindings = HashMap::new();
        let mut offset = HEADER_LEN;
        while offset < len {
            // Truncated length prefix or payload: stop replay at the last
            // complete record rather than failing the open.
            if len - offset < 4 {
                warn!(offset, "truncated record length at log tail, ignoring");
                break;
            }
            let mut len_buf = [0u8; 4];
            file.read_exact(&mut len_buf)?;
            let payload_len = u32::from_le_bytes(len_buf) as u64;
            if len - offset - 4 < payload_len {
                warn!(offset, "truncated record payload at log tail, ignoring");
                break;
            }

            let mut payload = vec![0u8; payload_len as usize];
            file.read_exact(&mut payload)?;
            let (token, table): (String, Table) = bincode::deserialize(&payload)
                .map_err(|e| StoreError::corrupt(offset, e.to_string()))?;
            bindings.insert(token, table);

            offset += 4 + payload_len;
        }

        // Drop anything past the last complete record so appends continue
        // from a clean tail.
        file.set_len(offset)?;
        Ok(bindings)
    }
}

impl std::fmt::Debug for StoreLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handledb_core::Value;
    use tempfile::TempDir;

    fn sample_table(marker: i64) -> Table {
        Table::from_columns(vec![(
            "x".to_string(),
            vec![Value::int(marker), Value::int(marker + 1)],
        )])
        .unwrap()
    }

    #[test]
    fn test_log_create_and_replay() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handles.log");

        {
            let (log, bindings) = StoreLog::open(&path).unwrap();
            assert!(bindings.is_empty());
            log.append("aaa", &sample_table(1)).unwrap();
            log.append("bbb", &sample_table(10)).unwrap();
        }

        let (_, bindings) = StoreLog::open(&path).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings["aaa"], sample_table(1));
        assert_eq!(bindings["bbb"], sample_table(10));
    }

    #[test]
    fn test_log_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handles.log");

        {
            let (log, _) = StoreLog::open(&path).unwrap();
            log.append("aaa", &sample_table(1)).unwrap();
            log.append("aaa", &sample_table(99)).unwrap();
        }

        let (_, bindings) = StoreLog::open(&path).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings["aaa"], sample_table(99));
    }

    #[test]
    fn test_log_tolerates_truncated_tail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handles.log");

        {
            let (log, _) = StoreLog::open(&path).unwrap();
            log.append("aaa", &sample_table(1)).unwrap();
        }

        // Simulate a crash mid-append: garbage partial record at the tail.
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&(1024u32).to_le_bytes()).unwrap();
            file.write_all(b"partial").unwrap();
        }

        let (log, bindings) = StoreLog::open(&path).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings["aaa"], sample_table(1));

        // Appends continue cleanly after recovery.
        log.append("bbb", &sample_table(5)).unwrap();
        let (_, bindings) = StoreLog::open(&path).unwrap();
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_log_rejects_bad_magic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handles.log");
        std::fs::write(&path, b"NOPExxxx").unwrap();

        let result = StoreLog::open(&path);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_log_compact() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handles.log");

        let (log, _) = StoreLog::open(&path).unwrap();
        for i in 0..10 {
            log.append("aaa", &sample_table(i)).unwrap();
        }
        let size_before = std::fs::metadata(&path).unwrap().len();

        let mut live = HashMap::new();
        live.insert("aaa".to_string(), sample_table(9));
        log.compact(&live).unwrap();

        let size_after = std::fs::metadata(&path).unwrap().len();
        assert!(size_after < size_before);

        log.append("bbb", &sample_table(42)).unwrap();
        drop(log);

        let (_, bindings) = StoreLog::open(&path).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings["aaa"], sample_table(9));
        assert_eq!(bindings["bbb"], sample_table(42));
    }
}
