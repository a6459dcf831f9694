//! Variable-set registry.
//!
//! Variable sets are named when a layout is assembled and addressed by a
//! dense [`VarSetId`] afterwards. Buffers inside a vector are stored in id
//! order, so every lookup after allocation is a direct index.

use std::fmt;

use crate::error::{Result, VectorError};

/// Dense identifier of a variable set within one [`VarSetLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarSetId(usize);

impl VarSetId {
    /// Create an id from its position in the layout.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the set in its layout.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Local partitioning of a vector into variable sets.
///
/// Records, for the calling rank, the name and local element count of each
/// set. Used as the allocation template for [`MultiVector`](crate::MultiVector).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarSetLayout {
    names: Vec<String>,
    local_lens: Vec<usize>,
}

impl VarSetLayout {
    /// Create an empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout from `(name, local_len)` pairs, in order.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::DuplicateVarSet`] if a name repeats.
    pub fn from_sets<I, S>(sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut layout = Self::new();
        for (name, len) in sets {
            layout.push(name, len)?;
        }
        Ok(layout)
    }

    /// Register a new set and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::DuplicateVarSet`] if the name is already taken.
    pub fn push(&mut self, name: impl Into<String>, local_len: usize) -> Result<VarSetId> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(VectorError::DuplicateVarSet { name });
        }
        self.names.push(name);
        self.local_lens.push(local_len);
        Ok(VarSetId(self.names.len() - 1))
    }

    /// Resolve a set name to its id
    pub fn id(&self, name: &str) -> Option<VarSetId> {
        self.names.iter().position(|n| n == name).map(VarSetId)
    }

    /// Name of a set
    pub fn name(&self, id: VarSetId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    /// Local element count of a set
    pub fn local_len(&self, id: VarSetId) -> Option<usize> {
        self.local_lens.get(id.0).copied()
    }

    /// Local element counts of all sets, in id order
    pub fn local_lens(&self) -> &[usize] {
        &self.local_lens
    }

    /// Sum of local element counts over all sets
    pub fn total_local_len(&self) -> usize {
        self.local_lens.iter().sum()
    }

    /// Number of sets
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the layout has no sets
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check that `id` belongs to this layout.
    pub fn check(&self, id: VarSetId) -> Result<()> {
        if id.0 < self.len() {
            Ok(())
        } else {
            Err(VectorError::UnknownVarSet { id, len: self.len() })
        }
    }

    /// Iterate over `(id, name, local_len)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (VarSetId, &str, usize)> + '_ {
        self.names
            .iter()
            .zip(&self.local_lens)
            .enumerate()
            .map(|(i, (name, &len))| (VarSetId(i), name.as_str(), len))
    }
}
