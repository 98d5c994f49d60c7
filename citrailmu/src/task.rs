use std::fmt;

use chrono::Local;
use uuid::Uuid;

/// Identifier correlating every log line and temp file of one pipeline run.
///
/// Format: `YYYYMMDD_HHMMSS_xxxxxxxx`, the local wall clock at second
/// resolution followed by the first 8 hex characters of a v4 UUID.
/// Sorts lexicographically by creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let uuid = Uuid::new_v4().simple().to_string();
        TaskId(format!("{timestamp}_{}", &uuid[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
