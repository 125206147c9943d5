//! Modified Nodal Analysis (MNA) system with handle-based element access.
//!
//! Device models never index the matrix by (row, col) during a load. Every
//! nonzero a device will ever touch is acquired once at setup and addressed
//! through an [`ElementHandle`] afterwards. Rows and columns belonging to
//! ground resolve to a shared trash element, so device code stamps every
//! entry unconditionally.

use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;

use crate::error::{Error, Result};
use crate::node::NodeId;

/// Opaque reference to one matrix element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u32);

impl ElementHandle {
    /// The element that absorbs every stamp aimed at a ground row or column.
    pub const TRASH: ElementHandle = ElementHandle(0);

    /// Position of the element in the value arrays.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this handle discards its stamps.
    pub fn is_trash(self) -> bool {
        self.0 == 0
    }
}

/// MNA system: A x = b, with A stored sparsely and both A and b carrying an
/// imaginary part for small-signal and distortion analyses.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    /// (row, col) -> handle, in acquisition order.
    elements: IndexMap<(NodeId, NodeId), ElementHandle>,
    /// Real part of each element; slot 0 is the trash element.
    real: Vec<f64>,
    /// Imaginary part of each element.
    imag: Vec<f64>,
    /// Real RHS indexed by node id; index 0 absorbs ground writes.
    rhs: Vec<f64>,
    /// Imaginary RHS indexed by node id.
    irhs: Vec<f64>,
    /// Names of nodes created after construction (internal nodes).
    internal: Vec<(NodeId, String)>,
    /// Maximum number of distinct elements, if bounded.
    element_limit: Option<usize>,
}

impl MnaSystem {
    /// Create a system for `num_nodes` nodes (excluding ground).
    pub fn new(num_nodes: usize) -> Self {
        Self {
            elements: IndexMap::new(),
            real: vec![0.0],
            imag: vec![0.0],
            rhs: vec![0.0; num_nodes + 1],
            irhs: vec![0.0; num_nodes + 1],
            internal: Vec::new(),
            element_limit: None,
        }
    }

    /// Create a system that refuses to allocate more than `limit` elements.
    pub fn with_element_limit(num_nodes: usize, limit: usize) -> Self {
        Self {
            element_limit: Some(limit),
            ..Self::new(num_nodes)
        }
    }

    /// Number of nodes excluding ground.
    pub fn num_nodes(&self) -> usize {
        self.rhs.len() - 1
    }

    /// Number of distinct (non-trash) elements acquired so far.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Allocate a new internal node and return its id.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId::new(self.rhs.len() as u32);
        self.rhs.push(0.0);
        self.irhs.push(0.0);
        self.internal.push((id, name.into()));
        id
    }

    /// Name given to an internal node at creation.
    pub fn internal_node_name(&self, node: NodeId) -> Option<&str> {
        self.internal
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, name)| name.as_str())
    }

    /// Acquire the element at (row, col).
    ///
    /// Acquisition is idempotent: asking twice for the same pair returns the
    /// same handle and does not count against the element limit.
    pub fn acquire(&mut self, row: NodeId, col: NodeId) -> Result<ElementHandle> {
        if row.is_ground() || col.is_ground() {
            return Ok(ElementHandle::TRASH);
        }
        for node in [row, col] {
            if node.as_u32() as usize > self.num_nodes() {
                return Err(Error::NodeOutOfRange(node));
            }
        }
        if let Some(&handle) = self.elements.get(&(row, col)) {
            return Ok(handle);
        }
        if let Some(limit) = self.element_limit {
            if self.elements.len() >= limit {
                return Err(Error::ElementLimit { row, col, limit });
            }
        }
        let handle = ElementHandle(self.real.len() as u32);
        self.real.push(0.0);
        self.imag.push(0.0);
        self.elements.insert((row, col), handle);
        Ok(handle)
    }

    /// Handle previously acquired for (row, col), if any.
    pub fn handle(&self, row: NodeId, col: NodeId) -> Option<ElementHandle> {
        if row.is_ground() || col.is_ground() {
            return Some(ElementHandle::TRASH);
        }
        self.elements.get(&(row, col)).copied()
    }

    /// Whether `handle` refers to an element of this system.
    pub fn is_valid(&self, handle: ElementHandle) -> bool {
        handle.index() < self.real.len()
    }

    /// Clear all values to zero, keeping the element table.
    pub fn clear(&mut self) {
        self.real.fill(0.0);
        self.imag.fill(0.0);
        self.rhs.fill(0.0);
        self.irhs.fill(0.0);
    }

    /// Add a real value to an element.
    #[inline]
    pub fn add(&mut self, handle: ElementHandle, value: f64) {
        self.real[handle.index()] += value;
    }

    /// Add a complex value to an element.
    #[inline]
    pub fn add_complex(&mut self, handle: ElementHandle, re: f64, im: f64) {
        self.real[handle.index()] += re;
        self.imag[handle.index()] += im;
    }

    /// Add to the real RHS entry of `node`.
    #[inline]
    pub fn add_rhs(&mut self, node: NodeId, value: f64) {
        self.rhs[node.as_u32() as usize] += value;
    }

    /// Add to both RHS parts of `node`.
    #[inline]
    pub fn add_rhs_complex(&mut self, node: NodeId, re: f64, im: f64) {
        self.rhs[node.as_u32() as usize] += re;
        self.irhs[node.as_u32() as usize] += im;
    }

    /// Stamp a current source from node i to node j.
    ///
    /// Current flows from node i to node j (positive current enters node j).
    pub fn stamp_current_source(&mut self, node_i: NodeId, node_j: NodeId, current: f64) {
        self.add_rhs(node_i, -current);
        self.add_rhs(node_j, current);
    }

    /// Real part of element (row, col); zero if never acquired.
    pub fn value(&self, row: NodeId, col: NodeId) -> f64 {
        match self.handle(row, col) {
            Some(h) if !h.is_trash() => self.real[h.index()],
            _ => 0.0,
        }
    }

    /// Imaginary part of element (row, col); zero if never acquired.
    pub fn imag_value(&self, row: NodeId, col: NodeId) -> f64 {
        match self.handle(row, col) {
            Some(h) if !h.is_trash() => self.imag[h.index()],
            _ => 0.0,
        }
    }

    /// Real RHS entry of `node` (zero for ground).
    pub fn rhs(&self, node: NodeId) -> f64 {
        if node.is_ground() {
            0.0
        } else {
            self.rhs[node.as_u32() as usize]
        }
    }

    /// Imaginary RHS entry of `node` (zero for ground).
    pub fn irhs(&self, node: NodeId) -> f64 {
        if node.is_ground() {
            0.0
        } else {
            self.irhs[node.as_u32() as usize]
        }
    }

    /// Dense copy of the real matrix (ground row/column excluded).
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.num_nodes();
        let mut dense = DMatrix::zeros(n, n);
        for (&(row, col), &h) in &self.elements {
            if let (Some(i), Some(j)) = (row.index(), col.index()) {
                dense[(i, j)] = self.real[h.index()];
            }
        }
        dense
    }

    /// Dense copy of the complex matrix (ground row/column excluded).
    pub fn to_dense_complex(&self) -> DMatrix<Complex<f64>> {
        let n = self.num_nodes();
        let mut dense = DMatrix::from_element(n, n, Complex::new(0.0, 0.0));
        for (&(row, col), &h) in &self.elements {
            if let (Some(i), Some(j)) = (row.index(), col.index()) {
                dense[(i, j)] = Complex::new(self.real[h.index()], self.imag[h.index()]);
            }
        }
        dense
    }

    /// Real RHS as a vector indexed like a solution vector.
    pub fn rhs_vector(&self) -> DVector<f64> {
        DVector::from_row_slice(&self.rhs[1..])
    }

    /// Complex RHS as a vector indexed like a solution vector.
    pub fn complex_rhs_vector(&self) -> DVector<Complex<f64>> {
        DVector::from_iterator(
            self.num_nodes(),
            self.rhs[1..]
                .iter()
                .zip(&self.irhs[1..])
                .map(|(&re, &im)| Complex::new(re, im)),
        )
    }
}
