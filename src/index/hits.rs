//! Materialized index lookup results

use crate::error::{ConstraintViolation, GraphResult};

/// Result of an index lookup.
///
/// Hits are collected when the lookup runs, so iterating them never touches
/// the index again and can be repeated any number of times with the same
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHits<I> {
    hits: Vec<I>,
}

impl<I: Copy> IndexHits<I> {
    pub fn new(hits: Vec<I>) -> Self {
        Self { hits }
    }

    /// The only hit, `None` if there are none.
    ///
    /// More than one hit is a constraint error.
    pub fn single(&self) -> GraphResult<Option<I>> {
        match self.hits.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            many => Err(ConstraintViolation::NotSingle { count: many.len() }.into()),
        }
    }

    pub fn first(&self) -> Option<I> {
        self.hits.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = I> + '_ {
        self.hits.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn as_slice(&self) -> &[I] {
        &self.hits
    }

    pub fn into_vec(self) -> Vec<I> {
        self.hits
    }
}

impl<I> IntoIterator for IndexHits<I> {
    type Item = I;
    type IntoIter = std::vec::IntoIter<I>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a, I> IntoIterator for &'a IndexHits<I> {
    type Item = &'a I;
    type IntoIter = std::slice::Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::NodeId;

    #[test]
    fn test_single() {
        let none: IndexHits<NodeId> = IndexHits::new(Vec::new());
        assert_eq!(none.single().unwrap(), None);

        let one = IndexHits::new(vec![NodeId::new(4)]);
        assert_eq!(one.single().unwrap(), Some(NodeId::new(4)));

        let two = IndexHits::new(vec![NodeId::new(4), NodeId::new(5)]);
        assert!(matches!(
            two.single(),
            Err(GraphError::Constraint(ConstraintViolation::NotSingle { count: 2 }))
        ));
    }

    #[test]
    fn test_hits_are_restartable() {
        let hits = IndexHits::new(vec![NodeId::new(1), NodeId::new(2)]);
        let first: Vec<_> = hits.iter().collect();
        let second: Vec<_> = hits.iter().collect();
        assert_eq!(first, second);
        assert_eq!(hits.len(), 2);
    }
}
