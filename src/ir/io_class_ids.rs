//! Output class id mapping: which class names a conversion keeps, and the
//! COCO category id each one receives.
//!
//! The mapping file is YAML (so a JSON object also loads):
//!
//! ```yaml
//! Person: 1
//! Car: 2
//! Traffic light: 10
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::ids::CategoryId;
use crate::error::OicocoError;

/// Class name to output category id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassIdMap {
    ids: BTreeMap<String, CategoryId>,
}

impl ClassIdMap {
    /// Assigns ids `1..=n` to `names` in the order given. A repeated name
    /// keeps its first id.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut ids = BTreeMap::new();
        let mut next = 1u64;
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || ids.contains_key(name) {
                continue;
            }
            ids.insert(name.to_string(), CategoryId::new(next));
            next += 1;
        }
        Self { ids }
    }

    pub fn get(&self, name: &str) -> Option<CategoryId> {
        self.ids.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>, I: Into<CategoryId>> FromIterator<(S, I)> for ClassIdMap {
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        Self {
            ids: iter
                .into_iter()
                .map(|(name, id)| (name.into(), id.into()))
                .collect(),
        }
    }
}

/// Reads a class id mapping file.
pub fn read_class_ids(path: &Path) -> Result<ClassIdMap, OicocoError> {
    if !path.is_file() {
        return Err(OicocoError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(OicocoError::Io)?;
    parse_class_ids(&text, path)
}

/// Parses a class id mapping from a YAML or JSON string.
pub fn from_class_ids_str(text: &str) -> Result<ClassIdMap, OicocoError> {
    parse_class_ids(text, Path::new("<string>"))
}

fn parse_class_ids(text: &str, path: &Path) -> Result<ClassIdMap, OicocoError> {
    let raw: BTreeMap<String, u64> =
        serde_yaml::from_str(text).map_err(|source| OicocoError::ClassIdsParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(raw.into_iter().collect())
}
