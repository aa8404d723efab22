//! Unit expressions
//!
//! A [`Unit`] is a cheap handle onto an immutable expression tree. Every node
//! remembers the unit-system that created it through a weak reference, so a
//! unit stays usable exactly as long as its system is alive.

use crate::system::SystemCell;
use crate::Dimension;
use gauge_core::Status;
use std::sync::{Arc, Weak};

/// Relative tolerance for comparing scale factors, origins and bases
pub(crate) const EPSILON: f64 = 1e-12;

/// Compare two reals with a relative tolerance (absolute near zero)
pub(crate) fn almost_equal(x: f64, y: f64) -> bool {
    if x == 0.0 || y == 0.0 {
        (x - y).abs() < EPSILON
    } else {
        (1.0 - x / y).abs() < EPSILON
    }
}

/// Variant of a unit expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitType {
    Invalid,
    Basic,
    Product,
    Galilean,
    Timestamp,
    Logarithmic,
}

/// A base unit or a named dimensionless unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Basic {
    /// Registration index within the owning system
    pub index: usize,
    /// Dimension axis; `None` for dimensionless basics such as the radian
    pub axis: Option<usize>,
}

impl Basic {
    pub fn dimension(&self) -> Dimension {
        match self.axis {
            Some(axis) => Dimension::axis(axis),
            None => Dimension::dimensionless(),
        }
    }
}

/// Basic units raised to non-zero integer powers, ordered by basic index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Product {
    factors: Vec<(Basic, i32)>,
}

impl Product {
    pub fn one() -> Self {
        Product { factors: Vec::new() }
    }

    pub fn from_basic(basic: Basic) -> Self {
        Product { factors: vec![(basic, 1)] }
    }

    pub fn factors(&self) -> &[(Basic, i32)] {
        &self.factors
    }

    pub fn is_one(&self) -> bool {
        self.factors.is_empty()
    }

    /// `None` if a merged power overflows
    pub fn multiply(&self, other: &Product) -> Option<Product> {
        let mut factors = Vec::with_capacity(self.factors.len() + other.factors.len());
        let (mut i, mut j) = (0, 0);
        while i < self.factors.len() || j < other.factors.len() {
            match (self.factors.get(i), other.factors.get(j)) {
                (Some(&(a, p)), Some(&(b, q))) if a.index == b.index => {
                    let sum = p.checked_add(q)?;
                    if sum != 0 {
                        factors.push((a, sum));
                    }
                    i += 1;
                    j += 1;
                }
                (Some(&(a, p)), Some(&(b, _))) if a.index < b.index => {
                    factors.push((a, p));
                    i += 1;
                }
                (Some(_), Some(&(b, q))) | (None, Some(&(b, q))) => {
                    factors.push((b, q));
                    j += 1;
                }
                (Some(&(a, p)), None) => {
                    factors.push((a, p));
                    i += 1;
                }
                (None, None) => break,
            }
        }
        Some(Product { factors })
    }

    pub fn power(&self, n: i32) -> Option<Product> {
        if n == 0 {
            return Some(Product::one());
        }
        let factors = self
            .factors
            .iter()
            .map(|&(b, p)| p.checked_mul(n).map(|p| (b, p)))
            .collect::<Option<Vec<_>>>()?;
        Some(Product { factors })
    }

    /// `None` unless every power is divisible by `n`
    pub fn root(&self, n: i32) -> Option<Product> {
        if n == 0 || self.factors.iter().any(|&(_, p)| p % n != 0) {
            return None;
        }
        Some(Product {
            factors: self.factors.iter().map(|&(b, p)| (b, p / n)).collect(),
        })
    }

    /// Each axis belongs to exactly one basic, so powers map straight onto
    /// exponents
    pub fn dimension(&self) -> Dimension {
        let mut exponents = Vec::new();
        for &(basic, power) in &self.factors {
            if let Some(axis) = basic.axis {
                if exponents.len() <= axis {
                    exponents.resize(axis + 1, 0);
                }
                exponents[axis] = power;
            }
        }
        Dimension::new(exponents)
    }

    /// A single basic to the first power is that basic
    pub fn into_kind(self) -> Kind {
        if let [(basic, 1)] = self.factors[..] {
            return Kind::Basic(basic);
        }
        Kind::Product(self)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Kind {
    Basic(Basic),
    Product(Product),
    /// `value_in_underlying = scale * value + origin`
    Galilean {
        scale: f64,
        underlying: Arc<Node>,
        origin: f64,
    },
    /// `unit` counted from `origin` (seconds since 2001-01-01 UTC)
    Timestamp {
        unit: Arc<Node>,
        origin: f64,
        second: Arc<Node>,
    },
    /// `value_in_reference = base ^ value`
    Logarithmic { base: f64, reference: Arc<Node> },
}

#[derive(Debug)]
pub(crate) struct Node {
    pub system: Weak<SystemCell>,
    pub system_id: u64,
    pub kind: Kind,
}

impl Node {
    /// A node in the same system as `self`
    pub fn sibling(&self, kind: Kind) -> Arc<Node> {
        Arc::new(Node {
            system: self.system.clone(),
            system_id: self.system_id,
            kind,
        })
    }

    pub fn dimension(&self) -> Dimension {
        match &self.kind {
            Kind::Basic(basic) => basic.dimension(),
            Kind::Product(product) => product.dimension(),
            Kind::Galilean { underlying, .. } => underlying.dimension(),
            Kind::Timestamp { unit, .. } => unit.dimension(),
            Kind::Logarithmic { reference, .. } => reference.dimension(),
        }
    }

    pub fn unit_type(&self) -> UnitType {
        match self.kind {
            Kind::Basic(_) => UnitType::Basic,
            Kind::Product(_) => UnitType::Product,
            Kind::Galilean { .. } => UnitType::Galilean,
            Kind::Timestamp { .. } => UnitType::Timestamp,
            Kind::Logarithmic { .. } => UnitType::Logarithmic,
        }
    }
}

/// Structural equality of two nodes of the same system
pub(crate) fn node_eq(a: &Node, b: &Node) -> bool {
    if a.system_id != b.system_id {
        return false;
    }
    match (&a.kind, &b.kind) {
        (Kind::Basic(x), Kind::Basic(y)) => x.index == y.index,
        (Kind::Product(x), Kind::Product(y)) => x == y,
        (
            Kind::Galilean { scale: s1, underlying: u1, origin: o1 },
            Kind::Galilean { scale: s2, underlying: u2, origin: o2 },
        ) => almost_equal(*s1, *s2) && almost_equal(*o1, *o2) && node_eq(u1, u2),
        (
            Kind::Timestamp { unit: u1, origin: o1, .. },
            Kind::Timestamp { unit: u2, origin: o2, .. },
        ) => almost_equal(*o1, *o2) && node_eq(u1, u2),
        (
            Kind::Logarithmic { base: b1, reference: r1 },
            Kind::Logarithmic { base: b2, reference: r2 },
        ) => almost_equal(*b1, *b2) && node_eq(r1, r2),
        _ => false,
    }
}

/// Handle onto a unit expression, or the invalid sentinel
///
/// Operations never fail loudly: a failed construction yields an invalid
/// unit that remembers why, and every further operation on it yields an
/// invalid unit with the same status. All invalid units compare equal.
#[derive(Debug, Clone)]
pub struct Unit {
    pub(crate) node: Option<Arc<Node>>,
    pub(crate) status: Status,
}

impl Unit {
    pub(crate) fn from_node(node: Arc<Node>) -> Self {
        Unit { node: Some(node), status: Status::Success }
    }

    pub(crate) fn invalid(status: Status) -> Self {
        Unit { node: None, status }
    }

    /// The node, if the unit is valid and its system is alive
    pub(crate) fn live_node(&self) -> Option<&Arc<Node>> {
        self.node.as_ref().filter(|n| n.system.strong_count() > 0)
    }

    pub(crate) fn system_cell(&self) -> Option<Arc<SystemCell>> {
        self.node.as_ref().and_then(|n| n.system.upgrade())
    }

    pub fn is_valid(&self) -> bool {
        self.live_node().is_some()
    }

    /// Why this unit is invalid, or `Success`
    pub fn status(&self) -> Status {
        match &self.node {
            None => self.status,
            Some(node) if node.system.strong_count() == 0 => Status::NoUnit,
            Some(_) => Status::Success,
        }
    }

    pub fn unit_type(&self) -> UnitType {
        self.live_node()
            .map(|n| n.unit_type())
            .unwrap_or(UnitType::Invalid)
    }

    /// Dimension vector; `None` for an invalid unit
    pub fn dimension(&self) -> Option<Dimension> {
        self.live_node().map(|n| n.dimension())
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension().map(|d| d.is_dimensionless()).unwrap_or(false)
    }

    pub fn same_system(&self, other: &Unit) -> bool {
        match (self.live_node(), other.live_node()) {
            (Some(a), Some(b)) => a.system_id == b.system_id,
            _ => false,
        }
    }

    /// First name registered for exactly this unit
    pub fn name(&self) -> Option<String> {
        let cell = self.system_cell()?;
        let registry = cell.read();
        registry.name_of(self)
    }

    /// First symbol registered for exactly this unit
    pub fn symbol(&self) -> Option<String> {
        let cell = self.system_cell()?;
        let registry = cell.read();
        registry.symbol_of(self)
    }

    /// Basic units and their powers for a Basic or Product unit
    pub fn product_powers(&self) -> Option<Vec<(Unit, i32)>> {
        let node = self.live_node()?;
        let factors: Vec<(Basic, i32)> = match &node.kind {
            Kind::Basic(basic) => vec![(*basic, 1)],
            Kind::Product(product) => product.factors().to_vec(),
            _ => return None,
        };
        Some(
            factors
                .into_iter()
                .map(|(basic, power)| (Unit::from_node(node.sibling(Kind::Basic(basic))), power))
                .collect(),
        )
    }

    pub fn underlying_unit(&self) -> Option<Unit> {
        match &self.live_node()?.kind {
            Kind::Galilean { underlying, .. } => Some(Unit::from_node(underlying.clone())),
            _ => None,
        }
    }

    pub fn galilean_scale(&self) -> Option<f64> {
        match self.live_node()?.kind {
            Kind::Galilean { scale, .. } => Some(scale),
            _ => None,
        }
    }

    /// Origin in units of the underlying unit
    pub fn galilean_origin(&self) -> Option<f64> {
        match self.live_node()?.kind {
            Kind::Galilean { origin, .. } => Some(origin),
            _ => None,
        }
    }

    pub fn log_base(&self) -> Option<f64> {
        match self.live_node()?.kind {
            Kind::Logarithmic { base, .. } => Some(base),
            _ => None,
        }
    }

    pub fn reference_unit(&self) -> Option<Unit> {
        match &self.live_node()?.kind {
            Kind::Logarithmic { reference, .. } => Some(Unit::from_node(reference.clone())),
            _ => None,
        }
    }

    pub fn time_unit(&self) -> Option<Unit> {
        match &self.live_node()?.kind {
            Kind::Timestamp { unit, .. } => Some(Unit::from_node(unit.clone())),
            _ => None,
        }
    }

    /// Seconds since 2001-01-01 00:00:00 UTC
    pub fn time_origin(&self) -> Option<f64> {
        match self.live_node()?.kind {
            Kind::Timestamp { origin, .. } => Some(origin),
            _ => None,
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::invalid(Status::NoUnit)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        match (self.live_node(), other.live_node()) {
            (None, None) => true,
            (Some(a), Some(b)) => node_eq(a, b),
            _ => false,
        }
    }
}
