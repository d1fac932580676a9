use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A recorded answer for one question position.
///
/// Serializes untagged so the wire shape matches the question payloads:
/// a bare index for single-select questions, a sorted array of indices for
/// multi-select ones. `BTreeSet` keeps the set deduplicated and ordered,
/// which makes set equality and serialization deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectedAnswer {
    Single(usize),
    Multiple(BTreeSet<usize>),
}

impl SelectedAnswer {
    /// Builds a multi-select answer from any iterator of indices.
    ///
    /// Duplicates collapse; order is irrelevant.
    #[must_use]
    pub fn multiple(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::Multiple(indices.into_iter().collect())
    }

    /// Returns every choice index this answer touches.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        match self {
            Self::Single(index) => Either::Left(std::iter::once(*index)),
            Self::Multiple(set) => Either::Right(set.iter().copied()),
        }
    }

    #[must_use]
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }
}

// Minimal two-variant iterator helper so `indices` can return one type.
enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R, T> Iterator for Either<L, R>
where
    L: Iterator<Item = T>,
    R: Iterator<Item = T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            Self::Left(iter) => iter.next(),
            Self::Right(iter) => iter.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_collapses_duplicates_and_order() {
        let a = SelectedAnswer::multiple([3, 1, 3]);
        let b = SelectedAnswer::multiple([1, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn indices_covers_both_shapes() {
        let single = SelectedAnswer::Single(2);
        assert_eq!(single.indices().collect::<Vec<_>>(), vec![2]);

        let multi = SelectedAnswer::multiple([4, 0]);
        assert_eq!(multi.indices().collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn serializes_as_bare_index_or_array() {
        let single = serde_json::to_value(SelectedAnswer::Single(1)).unwrap();
        assert_eq!(single, serde_json::json!(1));

        let multi = serde_json::to_value(SelectedAnswer::multiple([3, 1])).unwrap();
        assert_eq!(multi, serde_json::json!([1, 3]));
    }

    #[test]
    fn deserializes_untagged() {
        let single: SelectedAnswer = serde_json::from_str("2").unwrap();
        assert_eq!(single, SelectedAnswer::Single(2));

        let multi: SelectedAnswer = serde_json::from_str("[3, 1]").unwrap();
        assert_eq!(multi, SelectedAnswer::multiple([1, 3]));
    }
}
