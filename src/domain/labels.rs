// ============================================================
// Layer 3: Label Set
// ============================================================
// Ordered category names. A label's id is its position, so the
// order must be identical at training and inference time; it
// is persisted next to the vocabulary.

use serde::{Deserialize, Serialize};

use crate::domain::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn encode(&self, name: &str) -> CoreResult<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| CoreError::InvalidConfig(format!("unknown label '{name}'")))
    }

    pub fn decode(&self, id: usize) -> CoreResult<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or(CoreError::UnknownId { id })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_position() {
        let labels = LabelSet::new(vec!["Arabic".into(), "Czech".into(), "Dutch".into()]);
        assert_eq!(labels.encode("Czech").unwrap(), 1);
        assert_eq!(labels.decode(2).unwrap(), "Dutch");
        assert!(labels.decode(3).is_err());
        assert!(labels.encode("Greek").is_err());
    }
}
