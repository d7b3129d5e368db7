//! Core PlanStore implementation

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{ENTRIES_FILE, PLAN_FILE};

/// Unique identifier for a plan
pub type PlanId = String;

/// Current time as unix milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A record that can be stored in a plan's entry log
///
/// Records are serialized as JSON objects; the `id` must also be written
/// under the `"id"` key so deletes can match lines without knowing the type.
pub trait Record {
    fn id(&self) -> &str;
}

/// Summary of a stored plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub plan_id: PlanId,
    pub entry_count: usize,
    /// Entries were written at some point, even if none are left
    pub has_entry_log: bool,
    pub has_plan_document: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The main plan store
#[derive(Debug, Clone)]
pub struct PlanStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl PlanStore {
    /// Open or create a plan store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened plan store");
        Ok(Self { base_path })
    }

    /// Base directory of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn plan_dir(&self, plan_id: &str) -> Result<PathBuf> {
        let valid = !plan_id.is_empty()
            && plan_id != "."
            && plan_id != ".."
            && !plan_id.contains(['/', '\\'])
            && !plan_id.starts_with('.');
        if !valid {
            return Err(eyre::eyre!("Invalid plan id: {:?}", plan_id));
        }
        Ok(self.base_path.join(plan_id))
    }

    /// Write the plan document, creating the plan directory if needed
    pub fn save_plan<T: Serialize>(&self, plan_id: &str, plan: &T) -> Result<()> {
        let dir = self.plan_dir(plan_id)?;
        fs::create_dir_all(&dir).context(format!("Failed to create plan directory: {}", dir.display()))?;
        let content = serde_json::to_string_pretty(plan)?;

        let _lock = lock_plan(&dir)?;
        write_atomic(&dir.join(PLAN_FILE), content.as_bytes())?;
        info!(plan_id, "Saved plan document");
        Ok(())
    }

    /// Read the plan document, if the plan exists
    pub fn load_plan<T: DeserializeOwned>(&self, plan_id: &str) -> Result<Option<T>> {
        let path = self.plan_dir(plan_id)?.join(PLAN_FILE);
        if !path.exists() {
            debug!(plan_id, "load_plan: no plan document");
            return Ok(None);
        }
        let content = fs::read_to_string(&path).context(format!("Failed to read plan: {}", path.display()))?;
        let plan = serde_json::from_str(&content).context(format!("Failed to parse plan: {}", path.display()))?;
        Ok(Some(plan))
    }

    /// List all records of a plan in stored order
    ///
    /// A plan without an entry log has no records; that is not an error.
    pub fn list<T: DeserializeOwned>(&self, plan_id: &str) -> Result<Vec<T>> {
        let path = self.plan_dir(plan_id)?.join(ENTRIES_FILE);
        read_lines(&path)?
            .iter()
            .map(|line| serde_json::from_str(line).context(format!("Corrupt record in {}", path.display())))
            .collect()
    }

    /// Whether entries were ever written for a plan
    ///
    /// Deleting the last record leaves an empty log behind, so this stays
    /// true for a plan whose entries were all removed.
    pub fn has_entry_log(&self, plan_id: &str) -> Result<bool> {
        Ok(self.plan_dir(plan_id)?.join(ENTRIES_FILE).exists())
    }

    /// Insert or replace a record by id
    pub fn upsert<T: Record + Serialize>(&self, plan_id: &str, record: &T) -> Result<()> {
        let dir = self.plan_dir(plan_id)?;
        fs::create_dir_all(&dir)?;
        let _lock = lock_plan(&dir)?;

        let path = dir.join(ENTRIES_FILE);
        let line = serde_json::to_string(record)?;
        let mut lines = read_lines(&path)?;
        match lines.iter().position(|l| line_id(l).as_deref() == Some(record.id())) {
            Some(idx) => lines[idx] = line,
            None => lines.push(line),
        }
        write_lines(&path, &lines)?;
        debug!(plan_id, record_id = record.id(), "upsert: written");
        Ok(())
    }

    /// Delete a record by id, returning whether anything was removed
    pub fn delete(&self, plan_id: &str, record_id: &str) -> Result<bool> {
        let dir = self.plan_dir(plan_id)?;
        if !dir.exists() {
            return Ok(false);
        }
        let _lock = lock_plan(&dir)?;

        let path = dir.join(ENTRIES_FILE);
        let mut lines = read_lines(&path)?;
        let before = lines.len();
        lines.retain(|l| line_id(l).as_deref() != Some(record_id));
        let removed = lines.len() != before;
        if removed {
            write_lines(&path, &lines)?;
        }
        debug!(plan_id, record_id, removed, "delete: done");
        Ok(removed)
    }

    /// Replace the entire entry log of a plan
    pub fn replace_all<T: Record + Serialize>(&self, plan_id: &str, records: &[T]) -> Result<()> {
        let dir = self.plan_dir(plan_id)?;
        fs::create_dir_all(&dir)?;
        let _lock = lock_plan(&dir)?;

        let lines = records
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        write_lines(&dir.join(ENTRIES_FILE), &lines)?;
        info!(plan_id, count = records.len(), "Replaced entry log");
        Ok(())
    }

    /// List all stored plans
    pub fn list_plans(&self) -> Result<Vec<PlanSummary>> {
        let mut plans = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let entries_path = path.join(ENTRIES_FILE);
            let plan_path = path.join(PLAN_FILE);
            let updated_at = [&entries_path, &plan_path]
                .iter()
                .filter_map(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
                .max()
                .map(DateTime::<Utc>::from);

            plans.push(PlanSummary {
                plan_id: name,
                entry_count: read_lines(&entries_path)?.len(),
                has_entry_log: entries_path.exists(),
                has_plan_document: plan_path.exists(),
                updated_at,
            });
        }

        plans.sort_by(|a, b| a.plan_id.cmp(&b.plan_id));
        Ok(plans)
    }

    /// Delete a plan and all its data
    pub fn delete_plan(&self, plan_id: &str) -> Result<()> {
        let dir = self.plan_dir(plan_id)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!(plan_id, "Deleted plan");
        }
        Ok(())
    }
}

/// Hold an exclusive lock on the plan directory until the guard drops
fn lock_plan(dir: &Path) -> Result<fs::File> {
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(".lock"))
        .context("Failed to open plan lock")?;
    file.lock_exclusive().context("Failed to lock plan")?;
    Ok(file)
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path).context(format!("Failed to open {}", path.display()))?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    write_atomic(path, content.as_bytes())
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp).context(format!("Failed to create {}", tmp.display()))?;
        file.write_all(content)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path).context(format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn line_id(line: &str) -> Option<String> {
    serde_json::from_str::<Value>(line)
        .ok()?
        .get("id")?
        .as_str()
        .map(str::to_string)
}
