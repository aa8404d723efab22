//! Unit algebra
//!
//! Operations build new units from existing ones. A failed operation returns
//! an invalid unit; an invalid operand yields an invalid result carrying the
//! operand's status.

use crate::unit::{almost_equal, Kind, Node, Product};
use crate::{Converter, Unit};
use gauge_core::{decode_time, CivilTime, Status};
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

/// Largest power or root accepted
pub const MAX_EXPONENT: i32 = 255;

/// `scale × product` form of a multiplicative unit
fn scaled_product(node: &Node) -> Option<(f64, Product)> {
    match &node.kind {
        Kind::Basic(basic) => Some((1.0, Product::from_basic(*basic))),
        Kind::Product(product) => Some((1.0, product.clone())),
        Kind::Galilean { scale, underlying, origin } if *origin == 0.0 => {
            let (inner, product) = scaled_product(underlying)?;
            Some((scale * inner, product))
        }
        _ => None,
    }
}

/// Galilean wrapper that collapses to `underlying` when it is the identity
fn galilean(template: &Node, scale: f64, underlying: Arc<Node>, origin: f64) -> Unit {
    if almost_equal(scale, 1.0) && almost_equal(origin, 0.0) {
        return Unit::from_node(underlying);
    }
    Unit::from_node(template.sibling(Kind::Galilean { scale, underlying, origin }))
}

/// `None` or a scale outside the finite nonzero range means an exponent
/// overflowed
fn build(template: &Node, scale: f64, product: Option<Product>) -> Unit {
    match product {
        Some(product) if scale.is_finite() && scale != 0.0 => {
            let base = template.sibling(product.into_kind());
            galilean(template, scale, base, 0.0)
        }
        _ => Unit::invalid(Status::BadArgument),
    }
}

impl Unit {
    fn unary(&self, op: impl FnOnce(&Arc<Node>) -> Unit) -> Unit {
        match self.live_node() {
            Some(node) => op(node),
            None => Unit::invalid(self.status()),
        }
    }

    fn binary(&self, other: &Unit, op: impl FnOnce(&Arc<Node>, &Arc<Node>) -> Unit) -> Unit {
        match (self.live_node(), other.live_node()) {
            (None, _) => Unit::invalid(self.status()),
            (_, None) => Unit::invalid(other.status()),
            (Some(a), Some(b)) if a.system_id != b.system_id => Unit::invalid(Status::NotSameSystem),
            (Some(a), Some(b)) => op(a, b),
        }
    }

    /// Product of two units
    pub fn multiply(&self, other: &Unit) -> Unit {
        self.binary(other, |a, b| match (scaled_product(a), scaled_product(b)) {
            (Some((s1, p1)), Some((s2, p2))) => build(a, s1 * s2, p1.multiply(&p2)),
            _ => Unit::invalid(Status::Meaningless),
        })
    }

    /// Quotient of two units
    pub fn divide(&self, other: &Unit) -> Unit {
        self.binary(other, |a, b| match (scaled_product(a), scaled_product(b)) {
            (Some((s1, p1)), Some((s2, p2))) => {
                let product = p2.power(-1).and_then(|inverse| p1.multiply(&inverse));
                build(a, s1 / s2, product)
            }
            _ => Unit::invalid(Status::Meaningless),
        })
    }

    /// Reciprocal unit
    pub fn invert(&self) -> Unit {
        self.unary(|a| match scaled_product(a) {
            Some((scale, product)) => build(a, 1.0 / scale, product.power(-1)),
            None => Unit::invalid(Status::Meaningless),
        })
    }

    /// Raise to an integer power. A power of zero yields the unit one.
    pub fn raise(&self, power: i32) -> Unit {
        if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&power) {
            return self.unary(|_| Unit::invalid(Status::BadArgument));
        }
        self.unary(|a| match scaled_product(a) {
            Some(_) if power == 0 => build(a, 1.0, Some(Product::one())),
            Some((scale, product)) => build(a, scale.powi(power), product.power(power)),
            None => Unit::invalid(Status::Meaningless),
        })
    }

    /// Take an integer root; every power must be divisible by `root`
    pub fn root(&self, root: i32) -> Unit {
        if !(1..=MAX_EXPONENT).contains(&root) {
            return self.unary(|_| Unit::invalid(Status::BadArgument));
        }
        self.unary(|a| {
            let Some((scale, product)) = scaled_product(a) else {
                return Unit::invalid(Status::Meaningless);
            };
            if scale < 0.0 && root % 2 == 0 {
                return Unit::invalid(Status::Meaningless);
            }
            match product.root(root) {
                Some(product) => build(a, real_root(scale, root), Some(product)),
                None => Unit::invalid(Status::Meaningless),
            }
        })
    }

    /// A unit `factor` times as large: `(g.scale_by(1000)) == kg`
    pub fn scale_by(&self, factor: f64) -> Unit {
        if factor == 0.0 || !factor.is_finite() {
            return self.unary(|_| Unit::invalid(Status::BadArgument));
        }
        self.unary(|a| match &a.kind {
            Kind::Galilean { scale, underlying, origin } => {
                galilean(a, factor * scale, underlying.clone(), *origin)
            }
            Kind::Timestamp { .. } => Unit::invalid(Status::Meaningless),
            _ => galilean(a, factor, a.clone(), 0.0),
        })
    }

    /// `self.scale_by(1 / divisor)` without rounding through the reciprocal
    fn shrink_by(&self, divisor: f64) -> Unit {
        if divisor == 0.0 || !divisor.is_finite() {
            return self.unary(|_| Unit::invalid(Status::BadArgument));
        }
        self.unary(|a| match &a.kind {
            Kind::Galilean { scale, underlying, origin } => {
                galilean(a, scale / divisor, underlying.clone(), *origin)
            }
            Kind::Timestamp { .. } => Unit::invalid(Status::Meaningless),
            _ => galilean(a, 1.0 / divisor, a.clone(), 0.0),
        })
    }

    /// A unit whose zero lies at `offset` of this unit: `(K.offset_by(273.15)) == degC`
    pub fn offset_by(&self, offset: f64) -> Unit {
        if !offset.is_finite() {
            return self.unary(|_| Unit::invalid(Status::BadArgument));
        }
        self.unary(|a| match &a.kind {
            Kind::Galilean { scale, underlying, origin } => {
                galilean(a, *scale, underlying.clone(), origin + scale * offset)
            }
            Kind::Timestamp { .. } => Unit::invalid(Status::Meaningless),
            _ => galilean(a, 1.0, a.clone(), offset),
        })
    }

    /// A timestamp unit counting this time unit from `origin`
    /// (seconds since 2001-01-01 00:00:00 UTC)
    pub fn offset_by_time(&self, origin: f64) -> Unit {
        self.unary(|_| {
            let second = self.system_cell().and_then(|cell| cell.second());
            match second {
                Some(second) => self.timestamp_since(&second, origin),
                None => Unit::invalid(Status::NoSecond),
            }
        })
    }

    /// Like [`Unit::offset_by_time`] with a calendar origin
    pub fn offset_by_date(&self, origin: CivilTime) -> Unit {
        match origin.encode() {
            Ok(seconds) => self.offset_by_time(seconds),
            Err(_) => self.unary(|_| Unit::invalid(Status::BadArgument)),
        }
    }

    /// Timestamp construction with the system second already looked up
    pub(crate) fn timestamp_since(&self, second: &Unit, origin: f64) -> Unit {
        if decode_time(origin).is_err() {
            return self.unary(|_| Unit::invalid(Status::BadArgument));
        }
        self.binary(second, |a, s| match a.kind {
            Kind::Timestamp { .. } | Kind::Logarithmic { .. } => Unit::invalid(Status::Meaningless),
            _ if !Converter::can_convert(self, second) => Unit::invalid(Status::Meaningless),
            _ => Unit::from_node(a.sibling(Kind::Timestamp {
                unit: a.clone(),
                origin,
                second: s.clone(),
            })),
        })
    }

    /// Logarithmic unit with this unit as reference
    pub fn to_logarithmic(&self, base: f64) -> Unit {
        if base <= 1.0 || !base.is_finite() {
            return self.unary(|_| Unit::invalid(Status::BadArgument));
        }
        self.unary(|a| match a.kind {
            Kind::Timestamp { .. } => Unit::invalid(Status::Meaningless),
            _ => Unit::from_node(a.sibling(Kind::Logarithmic {
                base,
                reference: a.clone(),
            })),
        })
    }
}

/// Real `n`th root that lands on integers when it can
fn real_root(value: f64, n: i32) -> f64 {
    if n == 1 {
        return value;
    }
    let magnitude = value.abs().powf(1.0 / f64::from(n));
    let nearest = magnitude.round();
    let magnitude = if nearest != 0.0 && nearest.powi(n) == value.abs() {
        nearest
    } else {
        magnitude
    };
    if value < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

impl Mul<&Unit> for &Unit {
    type Output = Unit;
    fn mul(self, rhs: &Unit) -> Unit {
        self.multiply(rhs)
    }
}

impl Mul for Unit {
    type Output = Unit;
    fn mul(self, rhs: Unit) -> Unit {
        self.multiply(&rhs)
    }
}

impl Div<&Unit> for &Unit {
    type Output = Unit;
    fn div(self, rhs: &Unit) -> Unit {
        self.divide(rhs)
    }
}

impl Div for Unit {
    type Output = Unit;
    fn div(self, rhs: Unit) -> Unit {
        self.divide(&rhs)
    }
}

impl Mul<f64> for &Unit {
    type Output = Unit;
    fn mul(self, rhs: f64) -> Unit {
        self.scale_by(rhs)
    }
}

impl Mul<f64> for Unit {
    type Output = Unit;
    fn mul(self, rhs: f64) -> Unit {
        self.scale_by(rhs)
    }
}

impl Mul<&Unit> for f64 {
    type Output = Unit;
    fn mul(self, rhs: &Unit) -> Unit {
        rhs.scale_by(self)
    }
}

impl Mul<Unit> for f64 {
    type Output = Unit;
    fn mul(self, rhs: Unit) -> Unit {
        rhs.scale_by(self)
    }
}

impl Div<f64> for &Unit {
    type Output = Unit;
    fn div(self, rhs: f64) -> Unit {
        self.shrink_by(rhs)
    }
}

impl Div<f64> for Unit {
    type Output = Unit;
    fn div(self, rhs: f64) -> Unit {
        self.shrink_by(rhs)
    }
}

impl Div<&Unit> for f64 {
    type Output = Unit;
    fn div(self, rhs: &Unit) -> Unit {
        rhs.invert().scale_by(self)
    }
}

impl Div<Unit> for f64 {
    type Output = Unit;
    fn div(self, rhs: Unit) -> Unit {
        rhs.invert().scale_by(self)
    }
}

impl Add<f64> for &Unit {
    type Output = Unit;
    fn add(self, rhs: f64) -> Unit {
        self.offset_by(rhs)
    }
}

impl Add<f64> for Unit {
    type Output = Unit;
    fn add(self, rhs: f64) -> Unit {
        self.offset_by(rhs)
    }
}

impl Add<&Unit> for f64 {
    type Output = Unit;
    fn add(self, rhs: &Unit) -> Unit {
        rhs.offset_by(self)
    }
}

impl Add<Unit> for f64 {
    type Output = Unit;
    fn add(self, rhs: Unit) -> Unit {
        rhs.offset_by(self)
    }
}

impl Sub<f64> for &Unit {
    type Output = Unit;
    fn sub(self, rhs: f64) -> Unit {
        self.offset_by(-rhs)
    }
}

impl Sub<f64> for Unit {
    type Output = Unit;
    fn sub(self, rhs: f64) -> Unit {
        self.offset_by(-rhs)
    }
}

/// `k - u` offsets `u` by `-k`
impl Sub<&Unit> for f64 {
    type Output = Unit;
    fn sub(self, rhs: &Unit) -> Unit {
        rhs.offset_by(-self)
    }
}

impl Sub<Unit> for f64 {
    type Output = Unit;
    fn sub(self, rhs: Unit) -> Unit {
        rhs.offset_by(-self)
    }
}
