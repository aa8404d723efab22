//! Value conversion between units
//!
//! Every unit reduces to a product of basic units (its root) plus a chain of
//! steps that maps a value in the unit to a value in the root. Two units are
//! convertible when their roots share a dimension; the conversion is the
//! first chain followed by the inverse of the second, with adjacent affine
//! steps merged and `exp`/`log` pairs of the same base cancelled.

use crate::unit::{almost_equal, Kind, Node, Product};
use crate::Unit;
use gauge_core::Status;
use std::f64::consts::E;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    /// `y = scale * x + offset`
    Affine { scale: f64, offset: f64 },
    /// `y = (x - offset) / scale`
    Unaffine { scale: f64, offset: f64 },
    /// `y = base ^ x`
    Exp(f64),
    /// `y = log_base(x)`
    Log(f64),
}

impl Step {
    fn inverse(self) -> Step {
        match self {
            Step::Affine { scale, offset } => Step::Unaffine { scale, offset },
            Step::Unaffine { scale, offset } => Step::Affine { scale, offset },
            Step::Exp(base) => Step::Log(base),
            Step::Log(base) => Step::Exp(base),
        }
    }
}

/// Path from a unit down to its root product
struct Chain {
    root: Product,
    steps: Vec<Step>,
    timestamp: bool,
}

fn chain_to_root(node: &Node) -> Chain {
    match &node.kind {
        Kind::Basic(basic) => Chain {
            root: Product::from_basic(*basic),
            steps: Vec::new(),
            timestamp: false,
        },
        Kind::Product(product) => Chain {
            root: product.clone(),
            steps: Vec::new(),
            timestamp: false,
        },
        Kind::Galilean { scale, underlying, origin } => {
            let mut chain = chain_to_root(underlying);
            chain.steps.insert(0, Step::Affine { scale: *scale, offset: *origin });
            chain
        }
        Kind::Logarithmic { base, reference } => {
            let mut chain = chain_to_root(reference);
            chain.steps.insert(0, Step::Exp(*base));
            chain
        }
        Kind::Timestamp { unit, origin, second } => {
            // unit -> root -> seconds -> seconds since 2001 -> root
            let unit_chain = chain_to_root(unit);
            let second_chain = chain_to_root(second);
            let mut steps = unit_chain.steps;
            steps.extend(second_chain.steps.iter().rev().map(|s| s.inverse()));
            steps.push(Step::Affine { scale: 1.0, offset: *origin });
            steps.extend(second_chain.steps.iter().copied());
            Chain {
                root: second_chain.root,
                steps,
                timestamp: true,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Affine { multiplier: f64, offset: f64 },
    Exp(f64),
    Log(f64),
}

impl Stage {
    fn apply(self, x: f64) -> f64 {
        match self {
            Stage::Affine { multiplier, offset } => multiplier * x + offset,
            Stage::Exp(base) => power_of(base, x),
            Stage::Log(base) => log_in_base(x, base),
        }
    }
}

fn power_of(base: f64, x: f64) -> f64 {
    if base == E {
        x.exp()
    } else if base == 2.0 {
        x.exp2()
    } else {
        base.powf(x)
    }
}

fn log_in_base(x: f64, base: f64) -> f64 {
    if base == 10.0 {
        x.log10()
    } else if base == 2.0 {
        x.log2()
    } else if base == E {
        x.ln()
    } else {
        x.ln() / base.ln()
    }
}

/// Composed conversion function
#[derive(Debug, Clone, PartialEq)]
enum Transform {
    Affine { multiplier: f64, offset: f64 },
    Chain(Vec<Stage>),
}

impl Transform {
    fn compose(steps: impl IntoIterator<Item = Step>) -> Transform {
        let mut stages: Vec<Stage> = Vec::new();
        let (mut multiplier, mut offset) = (1.0, 0.0);

        for step in steps {
            match step {
                Step::Affine { scale, offset: shift } => {
                    multiplier *= scale;
                    offset = scale * offset + shift;
                }
                Step::Unaffine { scale, offset: shift } => {
                    multiplier /= scale;
                    offset = (offset - shift) / scale;
                }
                Step::Exp(base) | Step::Log(base) => {
                    let pending_identity = almost_equal(multiplier, 1.0) && almost_equal(offset, 0.0);
                    let cancels = match (stages.last(), step) {
                        (Some(Stage::Exp(b)), Step::Log(_)) | (Some(Stage::Log(b)), Step::Exp(_)) => {
                            almost_equal(*b, base)
                        }
                        _ => false,
                    };
                    if pending_identity && cancels {
                        stages.pop();
                        if let Some(&Stage::Affine { multiplier: m, offset: o }) = stages.last() {
                            stages.pop();
                            multiplier = m;
                            offset = o;
                        } else {
                            multiplier = 1.0;
                            offset = 0.0;
                        }
                        continue;
                    }
                    if !pending_identity {
                        stages.push(Stage::Affine { multiplier, offset });
                    }
                    multiplier = 1.0;
                    offset = 0.0;
                    stages.push(match step {
                        Step::Exp(_) => Stage::Exp(base),
                        _ => Stage::Log(base),
                    });
                }
            }
        }

        if stages.is_empty() {
            return Transform::Affine { multiplier, offset };
        }
        if !(almost_equal(multiplier, 1.0) && almost_equal(offset, 0.0)) {
            stages.push(Stage::Affine { multiplier, offset });
        }
        Transform::Chain(stages)
    }

    fn apply(&self, x: f64) -> f64 {
        match self {
            Transform::Affine { multiplier, offset } => multiplier * x + offset,
            Transform::Chain(stages) => stages.iter().fold(x, |acc, stage| stage.apply(acc)),
        }
    }
}

/// Converts values from one unit to another
///
/// Built once; immutable afterwards. An invalid converter returns NaN.
#[derive(Debug, Clone)]
pub struct Converter {
    from: Unit,
    to: Unit,
    transform: Option<Transform>,
    status: Status,
}

impl Converter {
    pub fn new(from: &Unit, to: &Unit) -> Self {
        let (transform, status) = match Self::plan(from, to) {
            Ok((from_chain, to_chain)) => {
                let steps = from_chain
                    .steps
                    .into_iter()
                    .chain(to_chain.steps.into_iter().rev().map(Step::inverse));
                (Some(Transform::compose(steps)), Status::Success)
            }
            Err(status) => {
                trace!(?status, "units are not convertible");
                (None, status)
            }
        };
        Converter {
            from: from.clone(),
            to: to.clone(),
            transform,
            status,
        }
    }

    /// Whether values in `from` can be expressed in `to`
    pub fn can_convert(from: &Unit, to: &Unit) -> bool {
        Self::plan(from, to).is_ok()
    }

    fn plan(from: &Unit, to: &Unit) -> Result<(Chain, Chain), Status> {
        let a = from.live_node().ok_or(from.status())?;
        let b = to.live_node().ok_or(to.status())?;
        if a.system_id != b.system_id {
            return Err(Status::NotSameSystem);
        }
        let from_chain = chain_to_root(a);
        let to_chain = chain_to_root(b);
        if from_chain.timestamp != to_chain.timestamp
            || from_chain.root.dimension() != to_chain.root.dimension()
        {
            return Err(Status::Meaningless);
        }
        Ok((from_chain, to_chain))
    }

    pub fn is_valid(&self) -> bool {
        self.transform.is_some()
    }

    /// Why construction failed, or `Success`
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn from_unit(&self) -> &Unit {
        &self.from
    }

    pub fn to_unit(&self) -> &Unit {
        &self.to
    }

    /// `(multiplier, offset)` when the conversion is `y = multiplier * x + offset`
    pub fn affine(&self) -> Option<(f64, f64)> {
        match self.transform.as_ref()? {
            Transform::Affine { multiplier, offset } => Some((*multiplier, *offset)),
            Transform::Chain(_) => None,
        }
    }

    /// Convert one value; NaN if the converter is invalid
    pub fn convert(&self, value: f64) -> f64 {
        match &self.transform {
            Some(transform) => transform.apply(value),
            None => f64::NAN,
        }
    }

    /// Convert into a new vector
    pub fn convert_slice(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.convert(v)).collect()
    }

    /// Convert every value in place and hand the slice back
    pub fn convert_in_place<'a>(&self, values: &'a mut [f64]) -> &'a mut [f64] {
        for value in values.iter_mut() {
            *value = self.convert(*value);
        }
        values
    }
}

impl Unit {
    /// Converter from this unit to `to`
    pub fn converter_to(&self, to: &Unit) -> Converter {
        Converter::new(self, to)
    }

    pub fn is_convertible_to(&self, to: &Unit) -> bool {
        Converter::can_convert(self, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnitSystem;

    struct Fixture {
        _system: UnitSystem,
        m: Unit,
        s: Unit,
        k: Unit,
        w: Unit,
    }

    fn fixture() -> Fixture {
        let mut system = UnitSystem::new();
        let m = system.add_base_unit("meter", "m");
        let kg = system.add_base_unit("kilogram", "kg");
        let s = system.add_base_unit("second", "s");
        let k = system.add_base_unit("kelvin", "K");
        system.set_second(&s).unwrap();
        let w = &(&(&m * &m) * &kg) / &s.raise(3);
        Fixture { _system: system, m, s, k, w }
    }

    #[test]
    fn test_identity() {
        let f = fixture();
        let c = Converter::new(&f.m, &f.m);
        assert!(c.is_valid());
        assert_eq!(c.affine(), Some((1.0, 0.0)));
        assert_eq!(c.convert(42.0), 42.0);
    }

    #[test]
    fn test_speed() {
        let f = fixture();
        let ms = &f.m / &f.s;
        let kmh = &(&f.m * 1000.0) / &(&f.s * 3600.0);
        let c = Converter::new(&ms, &kmh);
        assert_eq!(c.convert(1000.0 / 3600.0), 1.0);
        let back = Converter::new(&kmh, &ms);
        assert!((back.convert(36.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let f = fixture();
        let c = Converter::new(&(&f.m / &f.s), &(&f.m / &f.s.raise(2)));
        assert!(!c.is_valid());
        assert_eq!(c.status(), Status::Meaningless);
        assert!(c.convert(1.0).is_nan());
        assert!(c.affine().is_none());
    }

    #[test]
    fn test_temperature() {
        let f = fixture();
        let celsius = &f.k + 273.15;
        let fahrenheit = &(&f.k / 1.8) + 459.67;
        let c = Converter::new(&celsius, &f.k);
        assert!((c.convert(0.0) - 273.15).abs() < 1e-12);
        let c = Converter::new(&celsius, &fahrenheit);
        assert!((c.convert(100.0) - 212.0).abs() < 1e-9);
        assert!((c.convert(-40.0) + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_logarithmic() {
        let f = fixture();
        let mw = &f.w * 1e-3;
        let dbm = mw.to_logarithmic(10.0) * 0.1;
        let c = Converter::new(&dbm, &f.w);
        assert!(c.is_valid());
        assert!(c.affine().is_none());
        assert!((c.convert(30.0) - 1.0).abs() < 1e-12);
        assert!((c.convert(0.0) - 1e-3).abs() < 1e-15);

        let back = Converter::new(&f.w, &dbm);
        assert!((back.convert(1.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_pairs_cancel() {
        let f = fixture();
        let bel_mw = (&f.w * 1e-3).to_logarithmic(10.0);
        let bel_w = f.w.to_logarithmic(10.0);
        let c = Converter::new(&bel_mw, &bel_w);
        assert!(c.is_valid());
        // a scale sits between exp and log, so nothing cancels
        assert!(c.affine().is_none());
        assert!(c.convert(3.0).abs() < 1e-12);
        let same = Converter::new(&bel_w, &bel_w);
        assert_eq!(same.affine(), Some((1.0, 0.0)));
    }

    #[test]
    fn test_timestamps() {
        let f = fixture();
        let unix = f.s.offset_by_time(-978_307_200.0);
        let reference = f.s.offset_by_time(0.0);
        let c = Converter::new(&unix, &reference);
        assert_eq!(c.convert(978_307_200.0), 0.0);

        let hours = (&f.s * 3600.0).offset_by_time(0.0);
        let c = Converter::new(&hours, &reference);
        assert_eq!(c.convert(1.0), 3600.0);

        assert!(!Converter::can_convert(&reference, &f.s));
        assert!(!Converter::can_convert(&f.s, &reference));
    }

    #[test]
    fn test_bulk() {
        let f = fixture();
        let c = Converter::new(&(&f.m * 1000.0), &f.m);
        let values = [1.0, 2.5, -3.0];
        let copied = c.convert_slice(&values);
        assert_eq!(copied, vec![1000.0, 2500.0, -3000.0]);
        let mut buffer = values;
        let converted = c.convert_in_place(&mut buffer);
        assert_eq!(converted, &[1000.0, 2500.0, -3000.0]);
        assert_eq!(values.len(), copied.len());
    }

    #[test]
    fn test_foreign_system() {
        let a = fixture();
        let b = fixture();
        let c = Converter::new(&a.m, &b.m);
        assert_eq!(c.status(), Status::NotSameSystem);
        assert!(!a.m.is_convertible_to(&b.m));
    }

    #[test]
    fn test_compose_merges_affines() {
        let t = Transform::compose([
            Step::Affine { scale: 2.0, offset: 1.0 },
            Step::Unaffine { scale: 4.0, offset: 3.0 },
        ]);
        // ((2x + 1) - 3) / 4
        assert_eq!(t, Transform::Affine { multiplier: 0.5, offset: -0.5 });
    }

    #[test]
    fn test_compose_cancels_exp_log() {
        let t = Transform::compose([
            Step::Affine { scale: 2.0, offset: 0.0 },
            Step::Exp(10.0),
            Step::Log(10.0),
            Step::Affine { scale: 3.0, offset: 1.0 },
        ]);
        assert_eq!(t, Transform::Affine { multiplier: 6.0, offset: 1.0 });
    }
}
