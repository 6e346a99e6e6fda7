use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::Result;

/// The document collections the app keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Members,
    Groups,
    Payments,
    Expenses,
    Announcements,
    Users,
    ContributionSettings,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Members,
        Collection::Groups,
        Collection::Payments,
        Collection::Expenses,
        Collection::Announcements,
        Collection::Users,
        Collection::ContributionSettings,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Members => "members",
            Collection::Groups => "groups",
            Collection::Payments => "payments",
            Collection::Expenses => "expenses",
            Collection::Announcements => "announcements",
            Collection::Users => "users",
            Collection::ContributionSettings => "contributionSettings",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }

    pub fn from_file_name(file: &str) -> Option<Collection> {
        let stem = file.strip_suffix(".json")?;
        Collection::ALL.into_iter().find(|c| c.name() == stem)
    }
}

/// JSON-file document store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("collections"))?;
        Ok(Self { root })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::data_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collections_dir(&self) -> PathBuf {
        self.root.join("collections")
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.collections_dir().join(collection.file_name())
    }

    /// Read a whole collection. A missing file reads as the empty default.
    pub fn read<T: DeserializeOwned + Default>(&self, collection: Collection) -> Result<T> {
        let path = self.path(collection);
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        tracing::debug!(collection = collection.name(), "read");
        Ok(serde_json::from_str(&raw)?)
    }

    /// Replace a whole collection.
    ///
    /// Writes a temp file and renames it over the target so a watcher sees
    /// one change instead of a truncate followed by a write.
    pub fn write<T: Serialize>(&self, collection: Collection, docs: &T) -> Result<()> {
        write_atomic(&self.path(collection), docs)?;
        tracing::debug!(collection = collection.name(), "wrote");
        Ok(())
    }

    /// Hand out the next `{prefix}-{N}`.
    ///
    /// The last number per prefix is kept in `counters.json`, so a number is
    /// never handed out twice, even after the document holding it is deleted.
    /// `existing` seeds the counter for data written before it existed.
    pub fn allocate_id<'a>(
        &self,
        prefix: &str,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Result<String> {
        let path = self.root.join(COUNTERS_FILE);
        let mut counters: BTreeMap<String, u64> = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        let last = counters
            .get(prefix)
            .copied()
            .unwrap_or(0)
            .max(max_suffix(prefix, existing));
        counters.insert(prefix.to_string(), last + 1);
        write_atomic(&path, &counters)?;
        Ok(format!("{}-{}", prefix, last + 1))
    }
}

const COUNTERS_FILE: &str = "counters.json";

/// Write a temp file next to `path` and rename it over the target.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.tmp", file));
    fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn max_suffix<'a>(prefix: &str, ids: impl IntoIterator<Item = &'a str>) -> u64 {
    ids.into_iter()
        .filter_map(|id| {
            id.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('-'))
                .and_then(|n| n.parse::<u64>().ok())
        })
        .max()
        .unwrap_or(0)
}

/// Next id of the form `{prefix}-{N}`, one past the highest existing N.
///
/// For ids scoped to one document. Collection ids go through
/// [`Store::allocate_id`].
pub fn next_id<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    format!("{}-{}", prefix, max_suffix(prefix, existing) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collection_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let docs: Vec<serde_json::Value> = store.read(Collection::Members).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store
            .write(Collection::Expenses, &vec![serde_json::json!({"id": "expense-1"})])
            .unwrap();
        let names: Vec<String> = fs::read_dir(store.collections_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["expenses.json".to_string()]);
    }

    #[test]
    fn next_id_skips_foreign_prefixes() {
        let ids = ["member-2", "member-10", "group-40", "member-x"];
        assert_eq!(next_id("member", ids), "member-11");
        assert_eq!(next_id("payment", ids), "payment-1");
    }

    #[test]
    fn allocated_ids_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.allocate_id("member", []).unwrap(), "member-1");
        assert_eq!(store.allocate_id("member", ["member-1"]).unwrap(), "member-2");
        // member-2 was deleted; its number stays taken.
        assert_eq!(store.allocate_id("member", ["member-1"]).unwrap(), "member-3");
        assert_eq!(store.allocate_id("group", []).unwrap(), "group-1");
    }

    #[test]
    fn allocation_catches_up_with_existing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.allocate_id("payment", ["payment-41"]).unwrap(), "payment-42");
        assert!(dir.path().join("counters.json").exists());
        assert!(!store.collections_dir().join("counters.json").exists());
    }

    #[test]
    fn file_names_map_back() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_file_name(&c.file_name()), Some(c));
        }
        assert_eq!(Collection::from_file_name(".members.json.tmp"), None);
    }
}
