//! Textual rendering of units
//!
//! Products print as `m·s⁻¹` (UTF-8) or `m.s^-1` (ASCII). Both forms parse
//! back to an equal unit.

use crate::system::Registry;
use crate::unit::{Kind, Node, Product};
use crate::Unit;
use gauge_core::{decode_time, format_real, Status};
use serde::{Deserialize, Serialize};
use std::f64::consts::E;
use std::fmt;
use std::sync::Arc;

/// Whether registered labels of whole units are used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    /// Use a registered label for the whole unit when one exists
    #[default]
    Short,
    /// Expand down to basic units
    Definition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Labels {
    #[default]
    Symbols,
    Names,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub form: Form,
    pub labels: Labels,
    pub encoding: Encoding,
}

impl FormatOptions {
    pub fn definition(mut self) -> Self {
        self.form = Form::Definition;
        self
    }

    pub fn names(mut self) -> Self {
        self.labels = Labels::Names;
        self
    }

    pub fn ascii(mut self) -> Self {
        self.encoding = Encoding::Ascii;
        self
    }
}

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

struct Writer<'a> {
    registry: &'a Registry,
    options: FormatOptions,
}

impl Writer<'_> {
    fn label(&self, node: &Arc<Node>, labels: Labels) -> Option<String> {
        let unit = Unit::from_node(node.clone());
        match labels {
            Labels::Names => self.registry.name_of(&unit),
            Labels::Symbols => self.registry.symbol_of(&unit),
        }
    }

    fn other(labels: Labels) -> Labels {
        match labels {
            Labels::Names => Labels::Symbols,
            Labels::Symbols => Labels::Names,
        }
    }

    fn write(&self, node: &Arc<Node>) -> Result<String, Status> {
        if self.options.form == Form::Short {
            if let Some(label) = self.label(node, self.options.labels) {
                return Ok(label);
            }
        }
        match &node.kind {
            Kind::Basic(_) => self.basic(node),
            Kind::Product(product) => self.product(node, product),
            Kind::Galilean { scale, underlying, origin } => {
                let mut text = String::new();
                let under = self.write(underlying)?;
                let under_is_one = matches!(&underlying.kind, Kind::Product(p) if p.is_one());
                if *scale != 1.0 || under_is_one {
                    text.push_str(&format_real(*scale));
                }
                if !under_is_one {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&under);
                }
                if *origin != 0.0 {
                    text.push_str(" @ ");
                    text.push_str(&format_real(origin / scale));
                }
                Ok(text)
            }
            Kind::Timestamp { unit, origin, .. } => {
                let civil = decode_time(*origin).map_err(|_| Status::CantFormat)?;
                Ok(format!("{} since {} UTC", self.write(unit)?, civil))
            }
            Kind::Logarithmic { base, reference } => {
                let reference = self.write(reference)?;
                let function = if *base == 10.0 {
                    "lg".to_string()
                } else if *base == E {
                    "ln".to_string()
                } else if *base == 2.0 {
                    "lb".to_string()
                } else {
                    format!("{}-log", format_real(*base))
                };
                Ok(format!("{}(re {})", function, reference))
            }
        }
    }

    fn basic(&self, node: &Arc<Node>) -> Result<String, Status> {
        let labels = self.options.labels;
        self.label(node, labels)
            .or_else(|| self.label(node, Self::other(labels)))
            .ok_or(Status::CantFormat)
    }

    fn product(&self, node: &Arc<Node>, product: &Product) -> Result<String, Status> {
        if product.is_one() {
            return Ok("1".to_string());
        }
        let separator = match self.options.encoding {
            Encoding::Utf8 => "·",
            Encoding::Ascii => ".",
        };
        let mut parts = Vec::with_capacity(product.factors().len());
        for &(basic, power) in product.factors() {
            let mut part = self.basic(&node.sibling(Kind::Basic(basic)))?;
            if power != 1 {
                part.push_str(&self.power(power));
            }
            parts.push(part);
        }
        Ok(parts.join(separator))
    }

    fn power(&self, power: i32) -> String {
        match self.options.encoding {
            Encoding::Ascii => format!("^{}", power),
            Encoding::Utf8 => {
                let mut text = String::new();
                if power < 0 {
                    text.push('⁻');
                }
                for digit in power.unsigned_abs().to_string().bytes() {
                    text.push(SUPERSCRIPT_DIGITS[usize::from(digit - b'0')]);
                }
                text
            }
        }
    }
}

impl Unit {
    /// Render the unit, or report why it can't be
    pub fn try_format(&self, options: FormatOptions) -> Result<String, Status> {
        let node = self.live_node().ok_or(Status::CantFormat)?;
        let cell = self.system_cell().ok_or(Status::CantFormat)?;
        let registry = cell.read();
        let writer = Writer { registry: &registry, options };
        writer.write(node)
    }

    /// Render the unit; an invalid or unprintable unit renders as `""`
    pub fn format(&self, options: FormatOptions) -> String {
        self.try_format(options).unwrap_or_default()
    }
}

/// Short form with names, e.g. `kilogram` or `1e-06 kilogram`
impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(FormatOptions::default().names()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnitSystem;

    fn system() -> (UnitSystem, Unit, Unit, Unit) {
        let mut system = UnitSystem::new();
        let m = system.add_base_unit("meter", "m");
        let kg = system.add_base_unit("kilogram", "kg");
        let s = system.add_base_unit("second", "s");
        system.set_second(&s).unwrap();
        (system, m, kg, s)
    }

    #[test]
    fn test_product_encodings() {
        let (_system, m, _, s) = system();
        let velocity = &m / &s;
        assert_eq!(velocity.format(FormatOptions::default()), "m·s⁻¹");
        assert_eq!(velocity.format(FormatOptions::default().ascii()), "m.s^-1");
        assert_eq!(velocity.format(FormatOptions::default().names()), "meter·second⁻¹");
        assert_eq!(m.raise(12).format(FormatOptions::default()), "m¹²");
    }

    #[test]
    fn test_one() {
        let (system, _, _, _) = system();
        assert_eq!(system.dimensionless_unit_one().format(FormatOptions::default()), "1");
    }

    #[test]
    fn test_galilean() {
        let (_system, m, kg, s) = system();
        let km_s2 = &(&m * 1000.0) * &s.raise(2);
        assert_eq!(km_s2.format(FormatOptions::default().definition()), "1000 m·s²");
        assert_eq!(
            km_s2.format(FormatOptions::default().definition().names()),
            "1000 meter·second²"
        );
        assert_eq!((&kg * 1e-6).to_string(), "1e-06 kilogram");
        assert_eq!((&kg / 1.8 + 459.67).format(FormatOptions::default()), "0.555555555555556 kg @ 459.67");
    }

    #[test]
    fn test_short_form_prefers_registered_label() {
        let (mut system, m, kg, s) = system();
        let newton = &(&kg * &m) / &s.raise(2);
        system.add_unit(&newton, "newton", "N").unwrap();
        assert_eq!(newton.format(FormatOptions::default()), "N");
        assert_eq!(newton.format(FormatOptions::default().definition()), "m·kg·s⁻²");
        assert_eq!((&newton * 1000.0).format(FormatOptions::default()), "1000 N");
    }

    #[test]
    fn test_logarithmic() {
        let (_system, m, _, _) = system();
        assert_eq!(m.to_logarithmic(10.0).format(FormatOptions::default()), "lg(re m)");
        assert_eq!(m.to_logarithmic(E).format(FormatOptions::default()), "ln(re m)");
        assert_eq!(m.to_logarithmic(3.0).format(FormatOptions::default()), "3-log(re m)");
    }

    #[test]
    fn test_timestamp() {
        let (_system, _, _, s) = system();
        let since = s.offset_by_time(-978_307_200.0);
        assert_eq!(since.format(FormatOptions::default()), "s since 1970-01-01 00:00:00 UTC");

        let far = s.offset_by_time(1e300);
        assert_eq!(far.status(), Status::BadArgument);
        assert_eq!(far.try_format(FormatOptions::default()), Err(Status::CantFormat));
        assert_eq!(far.format(FormatOptions::default()), "");
    }

    #[test]
    fn test_invalid_and_unlabelled() {
        let (mut system, _, _, _) = system();
        assert_eq!(Unit::invalid(Status::SyntaxError).format(FormatOptions::default()), "");
        let anonymous = system.add_base_unit("", "");
        assert_eq!(anonymous.try_format(FormatOptions::default()), Err(Status::CantFormat));
        assert_eq!(anonymous.to_string(), "");
    }
}
