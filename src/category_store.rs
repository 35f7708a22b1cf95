/// Persistent store of user-defined triage categories.
///
/// A category binds a shortcut key to the name of a destination folder. The
/// store keeps categories in insertion order and writes them to a flat JSON
/// object after every change:
///
/// ```json
/// {
///     "Category_1": {
///         "input_keys": "q",
///         "input_filename": "cats"
///     }
/// }
/// ```
///
/// # Examples
///
/// ```no_run
/// use imgtriage::category_store::CategoryStore;
///
/// let mut store = CategoryStore::load("classify_button.json");
/// let name = store.insert("q", "cats").expect("insert failed");
/// assert_eq!(name, "Category_1");
/// ```
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Prefix of auto-generated category names.
pub const NAME_PREFIX: &str = "Category_";

/// A named classification bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Unique name, the key in the store.
    pub name: String,
    /// Key token that classifies into this category.
    pub shortcut: String,
    /// Name of the subfolder under the save root.
    pub destination_folder: String,
}

/// On-disk value for a category, keyed by its name.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CategoryRecord {
    #[serde(rename = "input_keys")]
    shortcut: String,
    #[serde(rename = "input_filename")]
    destination_folder: String,
}

/// Errors returned by category store mutations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field was empty or malformed.
    #[error("{0}")]
    Validation(String),
    /// No category with the given name exists.
    #[error("No category named '{0}'")]
    NotFound(String),
    /// Another category already uses the requested name.
    #[error("A category named '{0}' already exists")]
    NameTaken(String),
    /// The store file could not be written.
    #[error("Failed to write category store {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    /// The categories could not be serialized.
    #[error("Failed to serialize categories: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Category records backed by a JSON file.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    path: PathBuf,
    categories: Vec<Category>,
}

impl CategoryStore {
    /// Opens the store at `path`.
    ///
    /// A missing or malformed file yields an empty store; this never fails.
    /// Entries whose value is not a `{input_keys, input_filename}` record are
    /// skipped with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let categories = read_categories(&path);
        tracing::debug!(
            "loaded {} categories from {}",
            categories.len(),
            path.display()
        );
        Self { path, categories }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All categories in display order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Adds a category under an auto-generated name and persists the store.
    ///
    /// The name is `Category_N` where `N` is the smallest positive integer not
    /// already in use. Shortcuts are not required to be unique.
    ///
    /// # Errors
    ///
    /// * `Validation` if `shortcut` or `destination_folder` is empty, or the
    ///   folder is not a single plain path component
    /// * `Io` if the store cannot be written; the category is not kept
    pub fn insert(&mut self, shortcut: &str, destination_folder: &str) -> StoreResult<String> {
        if shortcut.trim().is_empty() {
            return Err(StoreError::Validation("No shortcut key set".to_string()));
        }
        if destination_folder.trim().is_empty() {
            return Err(StoreError::Validation(
                "No destination folder set".to_string(),
            ));
        }
        validate_folder_name(destination_folder)?;

        let name = self.next_free_name();
        self.categories.push(Category {
            name: name.clone(),
            shortcut: shortcut.to_string(),
            destination_folder: destination_folder.to_string(),
        });

        if let Err(e) = self.save() {
            self.categories.pop();
            return Err(e);
        }

        tracing::debug!("inserted {} ({} -> {})", name, shortcut, destination_folder);
        Ok(name)
    }

    /// Renames a category, keeping its shortcut, folder and position.
    ///
    /// An empty `new_name` leaves the store untouched.
    ///
    /// # Errors
    ///
    /// * `NotFound` if `old_name` does not exist
    /// * `NameTaken` if `new_name` belongs to a different category
    /// * `Io` if the store cannot be written; the rename is reverted
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> StoreResult<()> {
        let index = self
            .position(old_name)
            .ok_or_else(|| StoreError::NotFound(old_name.to_string()))?;

        if new_name.is_empty() || new_name == old_name {
            return Ok(());
        }
        if self.get(new_name).is_some() {
            return Err(StoreError::NameTaken(new_name.to_string()));
        }

        self.categories[index].name = new_name.to_string();
        if let Err(e) = self.save() {
            self.categories[index].name = old_name.to_string();
            return Err(e);
        }

        tracing::debug!("renamed {} to {}", old_name, new_name);
        Ok(())
    }

    /// Removes a category and persists the store.
    ///
    /// # Errors
    ///
    /// * `NotFound` if `name` does not exist
    /// * `Io` if the store cannot be written; the category is restored
    pub fn delete(&mut self, name: &str) -> StoreResult<Category> {
        let index = self
            .position(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let removed = self.categories.remove(index);
        if let Err(e) = self.save() {
            self.categories.insert(index, removed);
            return Err(e);
        }

        tracing::debug!("deleted {}", name);
        Ok(removed)
    }

    /// Writes the whole store to disk.
    ///
    /// The JSON is written to a sibling temporary file which then replaces the
    /// store file, so a crash mid-write leaves the previous contents intact.
    pub fn save(&self) -> StoreResult<()> {
        let json = encode_categories(&self.categories)?;

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = temp_path_for(&self.path);
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(e)
        })?;

        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    fn next_free_name(&self) -> String {
        (1..)
            .map(|n| format!("{}{}", NAME_PREFIX, n))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or_else(|| format!("{}{}", NAME_PREFIX, self.categories.len() + 1))
    }
}

fn validate_folder_name(folder: &str) -> StoreResult<()> {
    let mut components = Path::new(folder).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !folder.contains(['/', '\\']) => Ok(()),
        _ => Err(StoreError::Validation(format!(
            "Destination folder '{}' must be a plain folder name",
            folder
        ))),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "categories.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serializes categories as a pretty-printed object with four-space indents.
fn encode_categories(categories: &[Category]) -> Result<Vec<u8>, serde_json::Error> {
    let mut object = Map::new();
    for category in categories {
        let record = CategoryRecord {
            shortcut: category.shortcut.clone(),
            destination_folder: category.destination_folder.clone(),
        };
        object.insert(category.name.clone(), serde_json::to_value(record)?);
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    Value::Object(object).serialize(&mut serializer)?;
    Ok(buf)
}

fn read_categories(path: &Path) -> Vec<Category> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("could not read {}: {}", path.display(), e);
            }
            return Vec::new();
        }
    };

    let object: Map<String, Value> = match serde_json::from_str(&content) {
        Ok(object) => object,
        Err(e) => {
            tracing::warn!("ignoring malformed category store {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    object
        .into_iter()
        .filter_map(
            |(name, value)| match serde_json::from_value::<CategoryRecord>(value) {
                Ok(record) => Some(Category {
                    name,
                    shortcut: record.shortcut,
                    destination_folder: record.destination_folder,
                }),
                Err(e) => {
                    tracing::warn!("skipping malformed category '{}': {}", name, e);
                    None
                }
            },
        )
        .collect()
}
