use super::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type KeywordIndex = usize;

/// Ordered, index-addressed pool of unique display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPool {
    words: Vec<String>,
}

impl KeywordPool {
    pub fn new<I, S>(words: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.is_empty() {
            return Err(ModelError::EmptyPool);
        }
        let mut seen = HashSet::with_capacity(words.len());
        for word in &words {
            if !seen.insert(word.as_str()) {
                return Err(ModelError::DuplicateKeyword(word.clone()));
            }
        }
        Ok(Self { words })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: KeywordIndex) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn labels(&self, indices: &[KeywordIndex]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&index| self.get(index).map(str::to_string))
            .collect()
    }

    pub fn check_index(&self, index: KeywordIndex) -> Result<(), ModelError> {
        if index < self.words.len() {
            Ok(())
        } else {
            Err(ModelError::IndexOutOfRange {
                index,
                keyword_count: self.words.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicates_and_empty_pools() {
        assert_eq!(
            KeywordPool::new(Vec::<String>::new()),
            Err(ModelError::EmptyPool)
        );
        assert_eq!(
            KeywordPool::new(["apple", "pear", "apple"]),
            Err(ModelError::DuplicateKeyword("apple".to_string()))
        );
    }

    #[test]
    fn labels_skip_unknown_indices() {
        let pool = KeywordPool::new(["apple", "pear", "plum"]).unwrap();
        assert_eq!(pool.labels(&[2, 0, 9]), vec!["plum", "apple"]);
        assert!(pool.check_index(3).is_err());
    }
}
