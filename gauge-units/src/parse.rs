//! Unit expression parser
//!
//! Accepted forms, e.g.:
//! - `m`, `meter`, `km`, `kilometers`, `METER` (identifiers)
//! - `kg.m.s^-2`, `kg·m·s⁻²`, `kg m/s2`, `N per m**2` (products)
//! - `3.14 m`, `1e-3 kg` (scaled units)
//! - `K @ 273.15`, `s since 1970-01-01 00:00:00 UTC` (offsets and timestamps)
//! - `lg(re 1 mW)`, `log(re: 1mW)`, `ln(re m)` (logarithmic units)

use crate::system::{Registry, SystemCell};
use crate::Unit;
use gauge_core::{CivilTime, Status};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::f64::consts::E;
use std::sync::Arc;
use tracing::trace;

#[derive(Parser)]
#[grammar = "unit.pest"]
struct UnitParser;

/// Intermediate value: a bare number or a unit
#[derive(Debug)]
enum Term {
    Number(f64),
    Unit(Unit),
}

struct Evaluator<'a> {
    cell: &'a Arc<SystemCell>,
    registry: &'a Registry,
}

/// Parse `text` within the system owning `cell`.
///
/// The caller holds the registry guard; evaluation never locks again.
pub(crate) fn parse(cell: &Arc<SystemCell>, registry: &Registry, text: &str) -> Unit {
    let root = match UnitParser::parse(Rule::unit_text, text) {
        Ok(mut pairs) => pairs.next(),
        Err(e) => {
            trace!(text, error = %e, "syntax error in unit expression");
            return Unit::invalid(Status::SyntaxError);
        }
    };
    let evaluator = Evaluator { cell, registry };
    let expression = root
        .into_iter()
        .flat_map(|pair| pair.into_inner())
        .find(|pair| pair.as_rule() == Rule::shift_exp);
    let result = match expression {
        Some(pair) => evaluator.shift_exp(pair).and_then(|term| evaluator.into_unit(term)),
        None => Ok(cell.one()),
    };
    result.unwrap_or_else(|status| {
        trace!(text, ?status, "unit expression did not evaluate");
        Unit::invalid(status)
    })
}

fn checked(unit: Unit) -> Result<Term, Status> {
    if unit.is_valid() {
        Ok(Term::Unit(unit))
    } else {
        Err(unit.status())
    }
}

fn parse_number(text: &str) -> Result<f64, Status> {
    text.parse::<f64>().map_err(|_| Status::SyntaxError)
}

fn parse_exponent(pair: Pair<Rule>) -> Result<i32, Status> {
    match pair.as_rule() {
        Rule::integer => pair.as_str().parse::<i32>().map_err(|_| Status::BadArgument),
        Rule::superscript => {
            let mut sign = 1i32;
            let mut value = 0i32;
            for c in pair.as_str().chars() {
                match c {
                    '⁻' => sign = -1,
                    '⁺' => sign = 1,
                    _ => {
                        let digit = superscript_digit(c).ok_or(Status::SyntaxError)?;
                        value = value
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(digit))
                            .ok_or(Status::BadArgument)?;
                    }
                }
            }
            Ok(sign * value)
        }
        _ => Err(Status::SyntaxError),
    }
}

fn superscript_digit(c: char) -> Option<i32> {
    let digit = match c {
        '⁰' => 0,
        '¹' => 1,
        '²' => 2,
        '³' => 3,
        '⁴' => 4,
        '⁵' => 5,
        '⁶' => 6,
        '⁷' => 7,
        '⁸' => 8,
        '⁹' => 9,
        _ => return None,
    };
    Some(digit)
}

/// Seconds since 2001-01-01 UTC for a `timestamp` pair
fn parse_timestamp(pair: Pair<Rule>) -> Result<f64, Status> {
    let mut civil = CivilTime::date(2001, 1, 1);
    for part in pair.into_inner() {
        let text = part.as_str();
        match part.as_rule() {
            Rule::year => civil.year = text.parse().map_err(|_| Status::SyntaxError)?,
            Rule::month => civil.month = text.parse().map_err(|_| Status::SyntaxError)?,
            Rule::day => civil.day = text.parse().map_err(|_| Status::SyntaxError)?,
            Rule::hour => civil.hour = text.parse().map_err(|_| Status::SyntaxError)?,
            Rule::minute => civil.minute = text.parse().map_err(|_| Status::SyntaxError)?,
            Rule::second => civil.second = parse_number(text)?,
            _ => {}
        }
    }
    civil.encode().map_err(|_| Status::BadArgument)
}

fn log_base(text: &str) -> f64 {
    match text.to_ascii_lowercase().as_str() {
        "ln" => E,
        "lb" => 2.0,
        _ => 10.0,
    }
}

impl Evaluator<'_> {
    fn into_unit(&self, term: Term) -> Result<Unit, Status> {
        let unit = match term {
            Term::Unit(unit) => unit,
            Term::Number(n) => self.cell.one().scale_by(n),
        };
        if unit.is_valid() {
            Ok(unit)
        } else {
            Err(unit.status())
        }
    }

    fn shift_exp(&self, pair: Pair<Rule>) -> Result<Term, Status> {
        let mut inner = pair.into_inner();
        let base = match inner.next() {
            Some(product) => self.product_exp(product)?,
            None => return Err(Status::SyntaxError),
        };
        let Some(shift) = inner.next() else {
            return Ok(base);
        };
        let unit = self.into_unit(base)?;
        let shifted = match shift.as_rule() {
            Rule::number => unit.offset_by(parse_number(shift.as_str())?),
            Rule::timestamp => {
                let origin = parse_timestamp(shift)?;
                let second = self.registry.second().ok_or(Status::NoSecond)?;
                unit.timestamp_since(&second, origin)
            }
            _ => return Err(Status::SyntaxError),
        };
        checked(shifted)
    }

    fn product_exp(&self, pair: Pair<Rule>) -> Result<Term, Status> {
        let mut inner = pair.into_inner();
        let mut acc = match inner.next() {
            Some(first) => self.power_exp(first)?,
            None => return Err(Status::SyntaxError),
        };
        while let Some(op) = inner.next() {
            let rhs = match inner.next() {
                Some(operand) => self.power_exp(operand)?,
                None => return Err(Status::SyntaxError),
            };
            acc = match op.as_rule() {
                Rule::divide => Self::divide(acc, rhs)?,
                _ => Self::multiply(acc, rhs)?,
            };
        }
        Ok(acc)
    }

    fn multiply(lhs: Term, rhs: Term) -> Result<Term, Status> {
        match (lhs, rhs) {
            (Term::Number(a), Term::Number(b)) => Ok(Term::Number(a * b)),
            (Term::Number(n), Term::Unit(u)) | (Term::Unit(u), Term::Number(n)) => checked(u.scale_by(n)),
            (Term::Unit(a), Term::Unit(b)) => checked(a.multiply(&b)),
        }
    }

    fn divide(lhs: Term, rhs: Term) -> Result<Term, Status> {
        match (lhs, rhs) {
            (Term::Number(_), Term::Number(b)) if b == 0.0 => Err(Status::BadArgument),
            (Term::Number(a), Term::Number(b)) => Ok(Term::Number(a / b)),
            (Term::Unit(u), Term::Number(n)) => checked(&u / n),
            (Term::Number(n), Term::Unit(u)) => checked(u.invert().scale_by(n)),
            (Term::Unit(a), Term::Unit(b)) => checked(a.divide(&b)),
        }
    }

    fn power_exp(&self, pair: Pair<Rule>) -> Result<Term, Status> {
        let mut inner = pair.into_inner();
        let base = match inner.next() {
            Some(factor) => self.factor(factor)?,
            None => return Err(Status::SyntaxError),
        };
        let Some(exponent) = inner.next() else {
            return Ok(base);
        };
        let power = parse_exponent(exponent)?;
        match base {
            Term::Number(n) => Ok(Term::Number(n.powi(power))),
            Term::Unit(u) => checked(u.raise(power)),
        }
    }

    fn factor(&self, pair: Pair<Rule>) -> Result<Term, Status> {
        match pair.as_rule() {
            Rule::number => Ok(Term::Number(parse_number(pair.as_str())?)),
            Rule::identifier => self
                .registry
                .resolve(pair.as_str())
                .map(Term::Unit)
                .ok_or(Status::UnknownIdentifier),
            Rule::group => match pair.into_inner().next() {
                Some(inner) => self.shift_exp(inner),
                None => Err(Status::SyntaxError),
            },
            Rule::logarithm => {
                let mut inner = pair.into_inner();
                let (Some(base), Some(reference)) = (inner.next(), inner.next()) else {
                    return Err(Status::SyntaxError);
                };
                let reference = self.shift_exp(reference)?;
                let reference = self.into_unit(reference)?;
                checked(reference.to_logarithmic(log_base(base.as_str())))
            }
            _ => Err(Status::SyntaxError),
        }
    }
}
