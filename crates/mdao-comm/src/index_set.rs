//! Ordered index sets used to build scatters

/// Ordered list of global positions contributed by the calling rank.
///
/// Order is significant: the `k`-th entry of a source set is paired with the
/// `k`-th entry of the destination set. Duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    indices: Vec<usize>,
}

impl IndexSet {
    /// Create an empty index set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index set from a vector of positions
    pub fn from_vec(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get the entry at position `k`
    pub fn get(&self, k: usize) -> Option<usize> {
        self.indices.get(k).copied()
    }

    /// Largest entry, if any
    pub fn max(&self) -> Option<usize> {
        self.indices.iter().copied().max()
    }

    /// All entries as a slice
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Iterate over entries
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

impl From<Vec<usize>> for IndexSet {
    fn from(indices: Vec<usize>) -> Self {
        Self::from_vec(indices)
    }
}

impl From<&[usize]> for IndexSet {
    fn from(indices: &[usize]) -> Self {
        Self::from_vec(indices.to_vec())
    }
}

impl std::ops::Index<usize> for IndexSet {
    type Output = usize;

    fn index(&self, k: usize) -> &Self::Output {
        &self.indices[k]
    }
}

impl IntoIterator for IndexSet {
    type Item = usize;
    type IntoIter = std::vec::IntoIter<usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.into_iter()
    }
}
