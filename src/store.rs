//! Per-class JSON documents under `<root>/<class>/<name>.json`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::artifacts::check_file_name;
use crate::error::{Result, UnlearnError};

const JSON_EXT: &str = ".json";

#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parses one document. `name` may omit the `.json` suffix.
    pub fn read(&self, class: &str, name: &str) -> Result<Value> {
        let path = self.file_path(class, name)?;
        if !path.is_file() {
            return Err(UnlearnError::NotFound(format!("file {}", file_name(name))));
        }
        read_json(&path)
    }

    /// Document names (without suffix) of a class, in display order.
    pub fn list(&self, class: &str) -> Result<Vec<String>> {
        Ok(self.sorted_files(class)?
            .into_iter()
            .map(|f| stem(&f).to_owned())
            .collect())
    }

    /// Every document of a class as `(name, contents)`, in display order.
    pub fn read_all(&self, class: &str) -> Result<Vec<(String, Value)>> {
        let dir = self.class_dir(class)?;
        self.sorted_files(class)?
            .into_iter()
            .map(|f| {
                let value = read_json(&dir.join(&f))?;
                Ok((stem(&f).to_owned(), value))
            })
            .collect()
    }

    pub fn delete(&self, class: &str, name: &str) -> Result<()> {
        let path = self.file_path(class, name)?;
        if !path.is_file() {
            return Err(UnlearnError::NotFound(format!("file {}", file_name(name))));
        }
        std::fs::remove_file(&path).map_err(|e| UnlearnError::io(&path, e))?;
        info!(path = %path.display(), "deleted data file");
        Ok(())
    }

    fn class_dir(&self, class: &str) -> Result<PathBuf> {
        check_file_name(class)?;
        Ok(self.root.join(class))
    }

    fn file_path(&self, class: &str, name: &str) -> Result<PathBuf> {
        let name = file_name(name);
        check_file_name(&name)?;
        Ok(self.class_dir(class)?.join(name))
    }

    /// `.json` file names of a class directory, sorted by `display_order`.
    fn sorted_files(&self, class: &str) -> Result<Vec<String>> {
        let dir = self.class_dir(class)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UnlearnError::NotFound(format!("directory for class {}", class)));
            }
            Err(e) => return Err(UnlearnError::io(&dir, e)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| UnlearnError::io(&dir, e))?;
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(JSON_EXT) && entry.path().is_file() {
                    files.push(name.to_owned());
                }
            }
        }
        if files.is_empty() {
            return Err(UnlearnError::NotFound(format!("JSON files for class {}", class)));
        }
        files.sort_by(|a, b| display_order(class, a, b));
        Ok(files)
    }
}

/// Files starting with `000<class>` first, then `a00<class>`, then the
/// rest; alphabetical within each tier.
fn display_order(class: &str, a: &str, b: &str) -> Ordering {
    let tier = |name: &str| {
        if name.starts_with(&format!("000{}", class)) {
            0
        } else if name.starts_with(&format!("a00{}", class)) {
            1
        } else {
            2
        }
    };
    tier(a).cmp(&tier(b)).then_with(|| a.cmp(b))
}

fn file_name(name: &str) -> String {
    if name.ends_with(JSON_EXT) { name.to_owned() } else { format!("{}{}", name, JSON_EXT) }
}

fn stem(file: &str) -> &str {
    file.strip_suffix(JSON_EXT).unwrap_or(file)
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path).map_err(|e| UnlearnError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| UnlearnError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(class: &str, files: &[&str]) -> (tempfile::TempDir, DataStore) {
        let dir = tempfile::tempdir().unwrap();
        let class_dir = dir.path().join(class);
        std::fs::create_dir_all(&class_dir).unwrap();
        for (i, f) in files.iter().enumerate() {
            std::fs::write(class_dir.join(f), json!({ "i": i }).to_string()).unwrap();
        }
        let store = DataStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn list_sorts_into_three_tiers() {
        let (_dir, store) = store_with("3", &["b.json", "a003_x.json", "0003_z.json", "0003_a.json", "a.json", "notes.txt"]);
        assert_eq!(store.list("3").unwrap(), vec!["0003_a", "0003_z", "a003_x", "a", "b"]);
    }

    #[test]
    fn read_all_keeps_order_and_contents() {
        let (_dir, store) = store_with("1", &["x.json", "0001.json"]);
        let all = store.read_all("1").unwrap();
        assert_eq!(all[0], ("0001".to_owned(), json!({ "i": 1 })));
        assert_eq!(all[1], ("x".to_owned(), json!({ "i": 0 })));
    }

    #[test]
    fn read_and_delete_accept_names_with_or_without_suffix() {
        let (_dir, store) = store_with("2", &["run.json", "other.json"]);
        assert_eq!(store.read("2", "run").unwrap(), json!({ "i": 0 }));
        assert_eq!(store.read("2", "run.json").unwrap(), json!({ "i": 0 }));

        store.delete("2", "run").unwrap();
        assert!(matches!(store.read("2", "run"), Err(UnlearnError::NotFound(_))));
        assert!(matches!(store.delete("2", "run.json"), Err(UnlearnError::NotFound(_))));
    }

    #[test]
    fn missing_or_empty_class_is_not_found() {
        let (dir, store) = store_with("5", &[]);
        assert!(matches!(store.list("5"), Err(UnlearnError::NotFound(_))));
        assert!(matches!(store.read_all("6"), Err(UnlearnError::NotFound(_))));
        drop(dir);
    }

    #[test]
    fn malformed_json_names_the_file() {
        let (dir, store) = store_with("0", &[]);
        std::fs::write(dir.path().join("0").join("bad.json"), "{").unwrap();
        match store.read_all("0") {
            Err(UnlearnError::Json { path, .. }) => assert!(path.ends_with("bad.json")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn traversal_is_rejected() {
        let (_dir, store) = store_with("0", &[]);
        assert!(matches!(store.read("..", "x"), Err(UnlearnError::InvalidRequest(_))));
        assert!(matches!(store.read("0", "../secret"), Err(UnlearnError::InvalidRequest(_))));
    }
}
