mod history;

pub use history::{RunRecord, list_runs, open_db, record_run};

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{ReplayError, Result};

/// Writes `value` as pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut raw = serde_json::to_string_pretty(value)?;
    raw.push('\n');
    fs::write(path, raw).map_err(|err| ReplayError::io(path, err))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| ReplayError::io(parent, err))
        }
        _ => Ok(()),
    }
}
