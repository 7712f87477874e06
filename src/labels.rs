use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::error::DetectError;

/// Ordered class names, index-aligned with the class ids the
/// post-processor emits. Loaded once at model init, immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Loads one label per line, e.g. darknet's `coco.names`.
    /// Blank lines are skipped; surrounding whitespace is trimmed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {}", path.display()))?;
        let table = Self::parse(&raw);
        if table.is_empty() {
            bail!("label file {} contains no labels", path.display());
        }
        Ok(table)
    }

    pub fn parse(raw: &str) -> Self {
        let names = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn get(&self, class_id: usize) -> Result<&str, DetectError> {
        self.names
            .get(class_id)
            .map(String::as_str)
            .ok_or(DetectError::EmptyLabelTable {
                class_id,
                len: self.names.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let table = LabelTable::parse("person\n\nbicycle\ncar \n");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0).unwrap(), "person");
        assert_eq!(table.get(2).unwrap(), "car");
    }

    #[test]
    fn test_get_out_of_range() {
        let table = LabelTable::parse("person\nbicycle");
        let err = table.get(5).unwrap_err();
        assert_eq!(
            err,
            DetectError::EmptyLabelTable {
                class_id: 5,
                len: 2
            }
        );
    }

    #[test]
    fn test_empty_table_rejects_any_id() {
        let table = LabelTable::parse("");
        assert!(table.is_empty());
        assert!(table.get(0).is_err());
    }
}
