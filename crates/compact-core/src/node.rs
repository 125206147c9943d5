//! Node representation and solution-vector access.

use std::fmt;

use nalgebra::DVector;

/// Unique identifier for a node in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The ground node (node 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Create a new NodeId from a raw value.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if this is the ground node.
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }

    /// Index of this node in a solution vector (None for ground).
    pub fn index(self) -> Option<usize> {
        if self.is_ground() {
            None
        } else {
            Some((self.0 - 1) as usize)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Voltage of `node` in a solution vector; ground and nodes beyond the
/// vector read as zero.
pub fn node_voltage(solution: &DVector<f64>, node: NodeId) -> f64 {
    node.index()
        .and_then(|i| solution.get(i).copied())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_node() {
        assert!(NodeId::GROUND.is_ground());
        assert_eq!(NodeId::GROUND.as_u32(), 0);
        assert_eq!(NodeId::GROUND.to_string(), "GND");
        assert_eq!(NodeId::GROUND.index(), None);
    }

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert!(!id.is_ground());
        assert_eq!(id.as_u32(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.index(), Some(41));
    }

    #[test]
    fn test_node_voltage() {
        let solution = DVector::from_vec(vec![1.5, -2.0]);
        assert_eq!(node_voltage(&solution, NodeId::GROUND), 0.0);
        assert_eq!(node_voltage(&solution, NodeId::new(1)), 1.5);
        assert_eq!(node_voltage(&solution, NodeId::new(2)), -2.0);
        assert_eq!(node_voltage(&solution, NodeId::new(3)), 0.0);
    }
}
