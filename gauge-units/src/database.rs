//! Unit definition databases
//!
//! A database is a list of prefixes and unit records. Derived records carry a
//! definition in expression syntax that is parsed against the system being
//! built, so a record may use any record before it.
//!
//! Resolution for [`UnitSystem::load_database`]:
//! 1. an explicit path,
//! 2. the file named by `GAUGE_UNITS_PATH`,
//! 3. the built-in SI database.

use crate::{DatabaseOrigin, UnitSystem};
use gauge_core::Status;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable naming a database file
pub const DATABASE_ENV: &str = "GAUGE_UNITS_PATH";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("can't read unit database {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse unit database {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("bad unit record {name:?}: {status}")]
    Definition { name: String, status: Status },
}

impl DatabaseError {
    /// Engine status for a failure while loading from `origin`
    pub fn status(&self, origin: DatabaseOrigin) -> Status {
        match self {
            DatabaseError::Io { .. } => match origin {
                DatabaseOrigin::User => Status::OpenArgument,
                DatabaseOrigin::Environment => Status::OpenEnvironment,
                DatabaseOrigin::System | DatabaseOrigin::None => Status::OpenDefault,
            },
            DatabaseError::Json { .. } | DatabaseError::Definition { .. } => Status::ParseError,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrefixRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub symbol: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A new dimension axis
    Base,
    /// A named dimensionless unit
    Dimensionless,
    /// Defined by an expression over earlier records
    #[default]
    Derived,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Aliases {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UnitRecord {
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub def: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Plural name; derived from `name` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub symbol: String,
    #[serde(default)]
    pub aliases: Aliases,
}

impl UnitRecord {
    fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }

    fn plural(&mut self, plural: &str) -> &mut Self {
        self.plural = Some(plural.to_string());
        self
    }

    fn alias_name(&mut self, name: &str) -> &mut Self {
        self.aliases.names.push(name.to_string());
        self
    }

    fn alias_symbol(&mut self, symbol: &str) -> &mut Self {
        self.aliases.symbols.push(symbol.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UnitDatabase {
    #[serde(default)]
    pub prefixes: Vec<PrefixRecord>,
    #[serde(default)]
    pub units: Vec<UnitRecord>,
    /// Name of the unit timestamps are measured in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<String>,
}

/// English plural of a unit name
pub fn plural_of(name: &str) -> String {
    let ends_with_consonant_y = name.ends_with('y')
        && name
            .chars()
            .rev()
            .nth(1)
            .map(|c| !"aeiou".contains(c))
            .unwrap_or(false);
    if ends_with_consonant_y {
        format!("{}ies", &name[..name.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|end| name.ends_with(end)) {
        format!("{}es", name)
    } else {
        format!("{}s", name)
    }
}

impl UnitDatabase {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_path(path: &Path) -> Result<Self, DatabaseError> {
        let text = std::fs::read_to_string(path).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| DatabaseError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The built-in database: SI units, prefixes and common non-SI units
    pub fn si() -> Self {
        let mut db = UnitDatabase::default();
        db.register_prefixes();
        db.register_base_units();
        db.register_derived_units();
        db.register_time_units();
        db.register_temperature_units();
        db.register_other_units();
        db.second = Some("second".to_string());
        db
    }

    fn prefix(&mut self, name: &str, symbol: &str, value: f64) {
        self.prefixes.push(PrefixRecord {
            name: name.to_string(),
            symbol: symbol.to_string(),
            value,
        });
    }

    fn record(&mut self, kind: RecordKind, def: &str, name: &str, symbol: &str) -> &mut UnitRecord {
        self.units.push(UnitRecord {
            kind,
            def: def.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            ..UnitRecord::default()
        });
        let last = self.units.len() - 1;
        &mut self.units[last]
    }

    fn base(&mut self, name: &str, symbol: &str) -> &mut UnitRecord {
        self.record(RecordKind::Base, "", name, symbol)
    }

    fn dimensionless(&mut self, name: &str, symbol: &str) -> &mut UnitRecord {
        self.record(RecordKind::Dimensionless, "", name, symbol)
    }

    fn derived(&mut self, def: &str, name: &str, symbol: &str) -> &mut UnitRecord {
        self.record(RecordKind::Derived, def, name, symbol)
    }

    fn register_prefixes(&mut self) {
        self.prefix("yotta", "Y", 1e24);
        self.prefix("zetta", "Z", 1e21);
        self.prefix("exa", "E", 1e18);
        self.prefix("peta", "P", 1e15);
        self.prefix("tera", "T", 1e12);
        self.prefix("giga", "G", 1e9);
        self.prefix("mega", "M", 1e6);
        self.prefix("kilo", "k", 1e3);
        self.prefix("hecto", "h", 1e2);
        self.prefix("deka", "da", 1e1);
        self.prefix("deca", "", 1e1);
        self.prefix("deci", "d", 1e-1);
        self.prefix("centi", "c", 1e-2);
        self.prefix("milli", "m", 1e-3);
        self.prefix("micro", "u", 1e-6);
        self.prefix("", "µ", 1e-6);
        self.prefix("", "μ", 1e-6);
        self.prefix("nano", "n", 1e-9);
        self.prefix("pico", "p", 1e-12);
        self.prefix("femto", "f", 1e-15);
        self.prefix("atto", "a", 1e-18);
        self.prefix("zepto", "z", 1e-21);
        self.prefix("yocto", "y", 1e-24);
    }

    fn register_base_units(&mut self) {
        self.base("meter", "m").alias_name("metre");
        self.base("kilogram", "kg");
        self.base("second", "s");
        self.base("ampere", "A");
        self.base("kelvin", "K");
        self.base("mole", "mol");
        self.base("candela", "cd");

        self.dimensionless("radian", "rad");
        self.dimensionless("steradian", "sr");
    }

    fn register_derived_units(&mut self) {
        self.derived("1e-3 kg", "gram", "g");
        self.derived("1/s", "hertz", "Hz").plural("hertz");
        self.derived("kg.m.s^-2", "newton", "N");
        self.derived("N/m^2", "pascal", "Pa");
        self.derived("N.m", "joule", "J");
        self.derived("J/s", "watt", "W");
        self.derived("A.s", "coulomb", "C");
        self.derived("W/A", "volt", "V");
        self.derived("C/V", "farad", "F");
        self.derived("V/A", "ohm", "Ω").alias_symbol("Ω");
        self.derived("A/V", "siemens", "S").plural("siemens");
        self.derived("V.s", "weber", "Wb");
        self.derived("Wb/m^2", "tesla", "T");
        self.derived("Wb/A", "henry", "H");
        self.derived("cd.sr", "lumen", "lm");
        self.derived("lm/m^2", "lux", "lx").plural("lux");
        self.derived("1/s", "becquerel", "Bq");
        self.derived("J/kg", "gray", "Gy");
        self.derived("J/kg", "sievert", "Sv");
        self.derived("mol/s", "katal", "kat");
    }

    fn register_time_units(&mut self) {
        self.derived("60 s", "minute", "min");
        self.derived("60 min", "hour", "h");
        self.derived("24 h", "day", "d");
    }

    fn register_temperature_units(&mut self) {
        // K = C + 273.15
        self.derived("K @ 273.15", "degree_Celsius", "degC")
            .plural("degrees_Celsius")
            .alias_name("celsius")
            .alias_symbol("°C");
        self.derived("K/1.8", "degree_Rankine", "degR")
            .plural("degrees_Rankine")
            .alias_name("rankine")
            .alias_symbol("°R");
        // R = F + 459.67
        self.derived("degR @ 459.67", "degree_Fahrenheit", "degF")
            .plural("degrees_Fahrenheit")
            .alias_name("fahrenheit")
            .alias_symbol("°F");
    }

    fn register_other_units(&mut self) {
        self.derived("1e-3 m^3", "liter", "L")
            .alias_name("litre")
            .alias_symbol("l");
        self.derived("1000 kg", "tonne", "t").alias_name("metric_ton");
        self.derived("1e5 Pa", "bar", "bar");
        self.derived("101325 Pa", "atmosphere", "atm");
        self.derived("0.017453292519943295 rad", "degree", "°")
            .alias_symbol("deg");
        self.derived("0.0254 m", "inch", "in");
        self.derived("12 in", "foot", "ft").plural("feet");
        self.derived("3 ft", "yard", "yd");
        self.derived("1609.344 m", "mile", "mi");
        self.derived("0.45359237 kg", "pound", "lb");
        self.derived("0.01", "percent", "%").plural("percent");
    }
}

/// Where to load a database from, given an explicit path and the environment
fn database_source(
    explicit: Option<&Path>,
    environment: Option<OsString>,
) -> (DatabaseOrigin, Option<PathBuf>) {
    if let Some(path) = explicit {
        return (DatabaseOrigin::User, Some(path.to_path_buf()));
    }
    match environment {
        Some(value) if !value.is_empty() => (DatabaseOrigin::Environment, Some(PathBuf::from(value))),
        _ => (DatabaseOrigin::System, None),
    }
}

impl UnitSystem {
    /// Load a unit-system; on failure the result is invalid and carries
    /// [`UnitSystem::status`] and [`UnitSystem::error_message`].
    pub fn load_database(path: Option<&Path>) -> UnitSystem {
        let (origin, path) = database_source(path, std::env::var_os(DATABASE_ENV));
        match Self::load_from(origin, path.clone()) {
            Ok(system) => system,
            Err(e) => {
                warn!(error = %e, ?origin, "unit database failed to load");
                let mut system = UnitSystem::failed(e.status(origin), e.to_string(), path.clone());
                system.set_source(origin, path);
                system
            }
        }
    }

    /// Like [`UnitSystem::load_database`] but reports the failure
    pub fn try_load_database(path: Option<&Path>) -> Result<UnitSystem, DatabaseError> {
        let (origin, path) = database_source(path, std::env::var_os(DATABASE_ENV));
        Self::load_from(origin, path)
    }

    /// The built-in SI unit-system
    pub fn si() -> UnitSystem {
        Self::load_from(DatabaseOrigin::System, None).unwrap_or_else(|e| {
            UnitSystem::failed(e.status(DatabaseOrigin::System), e.to_string(), None)
        })
    }

    fn load_from(origin: DatabaseOrigin, path: Option<PathBuf>) -> Result<UnitSystem, DatabaseError> {
        let db = match &path {
            Some(path) => {
                debug!(path = %path.display(), ?origin, "loading unit database");
                UnitDatabase::from_path(path)?
            }
            None => UnitDatabase::si(),
        };
        let mut system = Self::from_database(&db)?;
        system.set_source(origin, path);
        Ok(system)
    }

    /// Build a new system from database records
    pub fn from_database(db: &UnitDatabase) -> Result<UnitSystem, DatabaseError> {
        let mut system = UnitSystem::new();
        for prefix in &db.prefixes {
            system
                .add_prefix(&prefix.name, &prefix.symbol, prefix.value)
                .map_err(|status| DatabaseError::Definition {
                    name: format!("{}{}", prefix.name, prefix.symbol),
                    status,
                })?;
        }
        for record in &db.units {
            system.apply_record(record)?;
        }
        if let Some(name) = &db.second {
            let second = system.unit_by_name(name);
            system
                .set_second(&second)
                .map_err(|status| DatabaseError::Definition {
                    name: name.clone(),
                    status,
                })?;
        }
        debug!(
            prefixes = db.prefixes.len(),
            units = db.units.len(),
            "unit database applied"
        );
        Ok(system)
    }

    fn apply_record(&mut self, record: &UnitRecord) -> Result<(), DatabaseError> {
        let failed = |status| DatabaseError::Definition {
            name: record.label().to_string(),
            status,
        };
        let unit = match record.kind {
            RecordKind::Base => self.add_base_unit(&record.name, &record.symbol),
            RecordKind::Dimensionless => self.add_dimensionless_unit(&record.name, &record.symbol),
            RecordKind::Derived => {
                let unit = self.unit_from_string(record.def.as_str());
                if unit.is_valid() {
                    self.add_unit(&unit, &record.name, &record.symbol).map_err(failed)?;
                }
                unit
            }
        };
        if !unit.is_valid() {
            return Err(failed(unit.status()));
        }

        let plural = match (&record.plural, record.name.is_empty()) {
            (Some(plural), _) => Some(plural.clone()),
            (None, false) => Some(plural_of(&record.name)),
            (None, true) => None,
        };
        let names = plural.iter().chain(record.aliases.names.iter());
        for name in names {
            if let Err(status) = self.add_alias(&unit, name, "") {
                warn!(unit = record.label(), alias = %name, %status, "name alias skipped");
            }
        }
        for symbol in &record.aliases.symbols {
            if let Err(status) = self.add_alias(&unit, "", symbol) {
                warn!(unit = record.label(), alias = %symbol, %status, "symbol alias skipped");
            }
        }
        if record.plural.is_none() {
            for name in &record.aliases.names {
                let plural = plural_of(name);
                if let Err(status) = self.add_alias(&unit, &plural, "") {
                    warn!(unit = record.label(), alias = %plural, %status, "plural alias skipped");
                }
            }
        }
        Ok(())
    }
}
