//! Resource kinds and capacity vectors.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// The fixed set of resource kinds a task may demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// CPU cores.
    Cpu,
    /// GPU devices.
    Gpu,
}

impl ResourceKind {
    /// Number of resource kinds.
    pub const COUNT: usize = 2;

    /// All resource kinds, in index order.
    pub const ALL: [ResourceKind; Self::COUNT] = [ResourceKind::Cpu, ResourceKind::Gpu];

    /// Returns the vector index of this kind.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks up a resource kind by vector index.
    pub fn from_index(index: usize) -> Result<Self, ProtoError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ProtoError::InvalidResourceIndex(index))
    }

    /// Returns the canonical lowercase name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }
}

/// A quantity per resource kind.
///
/// Used both for capacities (static and dynamic node resources) and for
/// task demands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceVector([f64; ResourceKind::COUNT]);

impl ResourceVector {
    /// The all-zero vector.
    pub const ZERO: ResourceVector = ResourceVector([0.0; ResourceKind::COUNT]);

    /// Creates a vector from per-kind quantities in index order.
    #[must_use]
    pub const fn new(quantities: [f64; ResourceKind::COUNT]) -> Self {
        Self(quantities)
    }

    /// Returns the quantity for a resource kind.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.0[kind.index()]
    }

    /// Sets the quantity for a resource kind.
    pub fn set(&mut self, kind: ResourceKind, quantity: f64) {
        self.0[kind.index()] = quantity;
    }

    /// Returns a copy of this vector with one quantity replaced.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, quantity: f64) -> Self {
        self.set(kind, quantity);
        self
    }

    /// True if every quantity fits within the corresponding capacity.
    #[must_use]
    pub fn fits_within(&self, capacity: &ResourceVector) -> bool {
        self.0
            .iter()
            .zip(capacity.0.iter())
            .all(|(demand, available)| demand <= available)
    }

    /// True if no resource kind has any capacity left.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.0.iter().all(|quantity| *quantity <= 0.0)
    }

    /// Subtracts a demand from this capacity vector.
    pub fn acquire(&mut self, demand: &ResourceVector) {
        for (available, taken) in self.0.iter_mut().zip(demand.0.iter()) {
            *available -= taken;
        }
    }

    /// Returns a demand to this capacity vector.
    pub fn release(&mut self, demand: &ResourceVector) {
        for (available, returned) in self.0.iter_mut().zip(demand.0.iter()) {
            *available += returned;
        }
    }
}
