//! Persistence of user-defined orderings.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for ordering persistence.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to access ordering file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse ordering file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize ordering: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Ordering broker no longer exists")]
    BrokerGone,
}

type Result<T> = std::result::Result<T, PersistError>;

/// Key/value storage of ordered resource lists.
///
/// `client_id` identifies the subscriber, `scope` the activity context
/// (see [`scope_key`](super::scope_key)).
pub trait OrderStore {
    fn get(&self, client_id: &str, scope: &str) -> Result<Option<Vec<String>>>;

    fn set(&mut self, client_id: &str, scope: &str, order: &[String]) -> Result<()>;
}

/// Volatile store, for tests and for clients that do not persist.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    entries: HashMap<(String, String), Vec<String>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for MemoryOrderStore {
    fn get(&self, client_id: &str, scope: &str) -> Result<Option<Vec<String>>> {
        Ok(self.entries.get(&(client_id.to_string(), scope.to_string())).cloned())
    }

    fn set(&mut self, client_id: &str, scope: &str, order: &[String]) -> Result<()> {
        self.entries.insert((client_id.to_string(), scope.to_string()), order.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrderGroup {
    #[serde(rename = "kactivitiesLinkedItemsOrder", default)]
    linked_items_order: Vec<String>,
}

/// TOML file with one table per client and scope, rewritten on every change.
///
/// ```toml
/// ["ResultModel-OrderingFor-org.example.app-ForActivity-a1"]
/// kactivitiesLinkedItemsOrder = ["/home/user/a.txt", "/home/user/b.txt"]
/// ```
#[derive(Debug)]
pub struct FileOrderStore {
    path: PathBuf,
    groups: BTreeMap<String, OrderGroup>,
}

impl FileOrderStore {
    /// Load the file at `path`; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let groups = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path: path.to_path_buf(), groups })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn group_name(client_id: &str, scope: &str) -> String {
        format!("ResultModel-OrderingFor-{client_id}-{scope}")
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self.groups)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl OrderStore for FileOrderStore {
    fn get(&self, client_id: &str, scope: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .groups
            .get(&Self::group_name(client_id, scope))
            .map(|group| group.linked_items_order.clone()))
    }

    fn set(&mut self, client_id: &str, scope: &str, order: &[String]) -> Result<()> {
        self.groups.insert(
            Self::group_name(client_id, scope),
            OrderGroup { linked_items_order: order.to_vec() },
        );
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn order(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryOrderStore::new();
        assert_eq!(store.get("c", "ForAllActivities").unwrap(), None);

        store.set("c", "ForAllActivities", &order(&["/a", "/b"])).unwrap();
        assert_eq!(store.get("c", "ForAllActivities").unwrap(), Some(order(&["/a", "/b"])));
        assert_eq!(store.get("other", "ForAllActivities").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ordering.toml");

        let mut store = FileOrderStore::load(&path).unwrap();
        store.set("org.example.app", "ForActivity-a1", &order(&["/x", "/y"])).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("ResultModel-OrderingFor-org.example.app-ForActivity-a1"));
        assert!(content.contains("kactivitiesLinkedItemsOrder"));

        let reloaded = FileOrderStore::load(&path).unwrap();
        assert_eq!(
            reloaded.get("org.example.app", "ForActivity-a1").unwrap(),
            Some(order(&["/x", "/y"]))
        );
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ordering.toml");
        fs::write(&path, "not = [valid").unwrap();

        assert!(matches!(FileOrderStore::load(&path), Err(PersistError::Parse(_))));
    }
}
