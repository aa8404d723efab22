//! Gauge Units - Unit algebra and value conversion
//!
//! Units belong to a [`UnitSystem`] and are built, combined and compared
//! through it. Dimensional analysis decides what can be converted.
//!
//! Unit kinds:
//! - Basic (m, kg, s, rad)
//! - Product (m·s⁻¹, kg·m²·s⁻²)
//! - Galilean, an affine transform of another unit (km, degC)
//! - Timestamp (s since 2001-01-01 00:00:00 UTC)
//! - Logarithmic (lg(re mW))
//!
//! ```ignore
//! let system = UnitSystem::load_database(None);
//! let speed = system.unit_from_string("m/s");
//! let road = system.unit_from_string("km/h");
//! assert_eq!(speed.converter_to(&road).convert(1.0), 3.6);
//! ```

mod algebra;
mod convert;
mod database;
mod dimension;
mod format;
mod parse;
mod system;
mod unit;

pub use algebra::MAX_EXPONENT;
pub use convert::Converter;
pub use database::{
    plural_of, Aliases, DatabaseError, PrefixRecord, RecordKind, UnitDatabase, UnitRecord,
    DATABASE_ENV,
};
pub use dimension::Dimension;
pub use format::{Encoding, Form, FormatOptions, Labels};
pub use system::{DatabaseOrigin, UnitSystem};
pub use unit::{Unit, UnitType};

pub use gauge_core::Status;
