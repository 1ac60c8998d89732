// src/output/writer.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::fs::FileSystem;

/// `chrono` format of the timestamp embedded in result file names.
///
/// Year first so that names sort chronologically; no `:` so that the name is
/// valid on every filesystem.
pub const RESULT_TIMESTAMP_FORMAT: &str = "D%Y-%m-%dT%H-%M-%S";

/// `{output_dir}/{connector}-{timestamp}.json`
pub fn result_file_path<Tz>(output_dir: &Path, connector: &str, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    output_dir.join(format!(
        "{connector}-{}.json",
        at.format(RESULT_TIMESTAMP_FORMAT)
    ))
}

/// Writes outcome values as indented JSON files.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    fs: Arc<dyn FileSystem>,
}

impl ResultWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Serialize `value` with four-space indentation and write it to exactly
    /// `path`, replacing any previous file.
    pub fn write(&self, path: &Path, value: &Value) -> Result<()> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        value
            .serialize(&mut ser)
            .with_context(|| format!("serializing result for {:?}", path))?;

        self.fs.write(path, &buf)?;
        debug!(path = %path.display(), bytes = buf.len(), "result file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use chrono::{Local, NaiveDate, Utc};
    use serde_json::json;

    #[test]
    fn file_name_is_sortable_and_filesystem_safe() {
        let at = NaiveDate::from_ymd_opt(2021, 10, 26)
            .unwrap()
            .and_hms_opt(14, 35, 40)
            .unwrap()
            .and_utc();

        let path = result_file_path(Path::new("out/A_output"), "A", &at);
        assert_eq!(path, PathBuf::from("out/A_output/A-D2021-10-26T14-35-40.json"));
        assert!(!path.to_string_lossy().contains(':'));
    }

    #[test]
    fn later_timestamps_sort_later() {
        let dir = Path::new("out");
        let early = Utc.with_ymd_and_hms(2021, 12, 31, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();

        assert!(result_file_path(dir, "A", &early) < result_file_path(dir, "A", &late));
        // Local time zone formatting works the same way.
        let _ = result_file_path(dir, "A", &Local::now());
    }

    #[test]
    fn writes_indented_json() {
        let fs = Arc::new(MockFileSystem::new());
        let writer = ResultWriter::new(fs.clone());
        let path = Path::new("out/A-D2021-10-26T14-35-40.json");

        writer.write(path, &json!({"x": true})).unwrap();

        let text = fs.read_to_string(path).unwrap();
        assert_eq!(text, "{\n    \"x\": true\n}");
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"x": true}));
    }

    #[test]
    fn write_failure_is_reported() {
        let fs = Arc::new(MockFileSystem::new());
        fs.fail_writes_under("locked");
        let writer = ResultWriter::new(fs);

        let err = writer
            .write(Path::new("locked/A.json"), &Value::String("msg".into()))
            .unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
    }
}
