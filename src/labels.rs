use std::collections::HashSet;
use std::path::Path;

use crate::error::LabelError;
use crate::types::NUM_CLASSES;

/// Ordered class names. Index `i` names output dimension `i` of every engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRegistry {
    labels: [String; NUM_CLASSES],
}

impl LabelRegistry {
    pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
        let labels: Vec<String> = labels.into_iter().map(|l| l.trim().to_string()).collect();

        let mut seen = HashSet::new();
        for (index, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(LabelError::Empty(index));
            }
            if !seen.insert(label.as_str()) {
                return Err(LabelError::Duplicate(label.clone()));
            }
        }

        let actual = labels.len();
        let labels: [String; NUM_CLASSES] =
            labels.try_into().map_err(|_| LabelError::WrongCount {
                expected: NUM_CLASSES,
                actual,
            })?;

        Ok(Self { labels })
    }

    /// Reads a JSON array of strings, e.g. `["blue", "green", "yellow"]`.
    pub fn from_file(path: &Path) -> Result<Self, LabelError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LabelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let labels: Vec<String> =
            serde_json::from_str(&contents).map_err(|source| LabelError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(labels)
    }

    pub fn get(&self, index: usize) -> &str {
        &self.labels[index]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}
