//! Unit-system registry
//!
//! A [`UnitSystem`] owns the basic units, the name and symbol tables and the
//! prefixes. Units point back at it weakly; dropping the system invalidates
//! every unit it produced.

use crate::parse;
use crate::unit::{Basic, Kind, Node, Product};
use crate::{Converter, Unit, UnitType};
use gauge_core::Status;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(1);

/// Where the definitions of a unit-system came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseOrigin {
    /// Built programmatically
    #[default]
    None,
    /// Path given by the caller
    User,
    /// Path taken from the environment
    Environment,
    /// Built-in database
    System,
}

#[derive(Debug, Clone)]
struct Prefix {
    text: String,
    value: f64,
}

/// Name, symbol and prefix tables
#[derive(Debug, Default)]
pub(crate) struct Registry {
    basics: usize,
    axes: usize,
    by_name: HashMap<String, Unit>,
    by_symbol: HashMap<String, Unit>,
    folded_names: HashMap<String, Unit>,
    folded_symbols: HashMap<String, Unit>,
    /// Printed labels; the first one registered for a unit wins
    unit_names: Vec<(Unit, String)>,
    unit_symbols: Vec<(Unit, String)>,
    /// Longest first
    name_prefixes: Vec<Prefix>,
    symbol_prefixes: Vec<Prefix>,
    second: Option<Unit>,
}

impl Registry {
    pub fn name_of(&self, unit: &Unit) -> Option<String> {
        self.unit_names
            .iter()
            .find(|(u, _)| u == unit)
            .map(|(_, name)| name.clone())
    }

    pub fn symbol_of(&self, unit: &Unit) -> Option<String> {
        self.unit_symbols
            .iter()
            .find(|(u, _)| u == unit)
            .map(|(_, symbol)| symbol.clone())
    }

    pub fn second(&self) -> Option<Unit> {
        self.second.clone()
    }

    /// Resolve an identifier from expression text.
    ///
    /// Exact matches come first, then prefixed forms, then case-folded forms.
    pub fn resolve(&self, id: &str) -> Option<Unit> {
        if let Some(unit) = self.by_symbol.get(id).or_else(|| self.by_name.get(id)) {
            return Some(unit.clone());
        }
        if let Some(unit) = Self::prefixed(&self.symbol_prefixes, id, &self.by_symbol) {
            return Some(unit);
        }
        if let Some(unit) = Self::prefixed(&self.name_prefixes, id, &self.by_name) {
            return Some(unit);
        }
        let folded = id.to_lowercase();
        if let Some(unit) = self
            .folded_symbols
            .get(&folded)
            .or_else(|| self.folded_names.get(&folded))
        {
            return Some(unit.clone());
        }
        self.name_prefixes.iter().find_map(|prefix| {
            let rest = folded.strip_prefix(prefix.text.to_lowercase().as_str())?;
            let unit = self.folded_names.get(rest)?;
            Some(unit.scale_by(prefix.value))
        })
    }

    fn prefixed(prefixes: &[Prefix], id: &str, table: &HashMap<String, Unit>) -> Option<Unit> {
        prefixes.iter().find_map(|prefix| {
            let rest = id.strip_prefix(prefix.text.as_str())?;
            let unit = table.get(rest)?;
            Some(unit.scale_by(prefix.value))
        })
    }

    fn check_free(table: &HashMap<String, Unit>, key: &str, unit: &Unit) -> Result<(), Status> {
        match table.get(key) {
            Some(existing) if existing != unit => Err(Status::Exists),
            _ => Ok(()),
        }
    }

    fn insert_lookup(&mut self, unit: &Unit, name: &str, symbol: &str) -> Result<(), Status> {
        if !name.is_empty() {
            Self::check_free(&self.by_name, name, unit)?;
        }
        if !symbol.is_empty() {
            Self::check_free(&self.by_symbol, symbol, unit)?;
        }
        if !name.is_empty() {
            self.by_name.insert(name.to_string(), unit.clone());
            self.folded_names
                .entry(name.to_lowercase())
                .or_insert_with(|| unit.clone());
        }
        if !symbol.is_empty() {
            self.by_symbol.insert(symbol.to_string(), unit.clone());
            self.folded_symbols
                .entry(symbol.to_lowercase())
                .or_insert_with(|| unit.clone());
        }
        Ok(())
    }

    fn insert_labels(&mut self, unit: &Unit, name: &str, symbol: &str) {
        if !name.is_empty() && self.name_of(unit).is_none() {
            self.unit_names.push((unit.clone(), name.to_string()));
        }
        if !symbol.is_empty() && self.symbol_of(unit).is_none() {
            self.unit_symbols.push((unit.clone(), symbol.to_string()));
        }
    }

    fn insert_prefix(prefixes: &mut Vec<Prefix>, text: &str, value: f64) -> Result<(), Status> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(existing) = prefixes.iter().find(|p| p.text == text) {
            return if existing.value == value { Ok(()) } else { Err(Status::Exists) };
        }
        prefixes.push(Prefix { text: text.to_string(), value });
        prefixes.sort_by(|a, b| b.text.chars().count().cmp(&a.text.chars().count()));
        Ok(())
    }
}

/// Shared state that units point back to
#[derive(Debug)]
pub(crate) struct SystemCell {
    pub id: u64,
    registry: RwLock<Registry>,
}

impl SystemCell {
    pub fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn node(self: &Arc<Self>, kind: Kind) -> Arc<Node> {
        Arc::new(Node {
            system: Arc::downgrade(self),
            system_id: self.id,
            kind,
        })
    }

    pub fn second(&self) -> Option<Unit> {
        self.read().second()
    }

    pub fn one(self: &Arc<Self>) -> Unit {
        Unit::from_node(self.node(Kind::Product(Product::one())))
    }
}

/// Registry of units that can be looked up, parsed and extended
#[derive(Debug)]
pub struct UnitSystem {
    inner: Arc<SystemCell>,
    status: Status,
    error_message: Option<String>,
    origin: DatabaseOrigin,
    path: Option<PathBuf>,
}

impl UnitSystem {
    /// An empty, valid system containing only the unit one
    pub fn new() -> Self {
        let id = NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed);
        debug!(id, "creating empty unit-system");
        UnitSystem {
            inner: Arc::new(SystemCell {
                id,
                registry: RwLock::new(Registry::default()),
            }),
            status: Status::Success,
            error_message: None,
            origin: DatabaseOrigin::None,
            path: None,
        }
    }

    /// A system whose construction failed; behaves as empty
    pub(crate) fn failed(status: Status, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        let mut system = Self::new();
        system.status = status;
        system.error_message = Some(message.into());
        system.path = path;
        system
    }

    pub(crate) fn set_source(&mut self, origin: DatabaseOrigin, path: Option<PathBuf>) {
        self.origin = origin;
        self.path = path;
    }

    pub fn is_valid(&self) -> bool {
        self.status.is_success()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Description of the construction failure, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn database_origin(&self) -> DatabaseOrigin {
        self.origin
    }

    pub(crate) fn cell(&self) -> &Arc<SystemCell> {
        &self.inner
    }

    /// Case-sensitive lookup by name
    pub fn unit_by_name(&self, name: &str) -> Unit {
        self.lookup(name, |registry| registry.by_name.get(name).cloned())
    }

    /// Case-sensitive lookup by symbol
    pub fn unit_by_symbol(&self, symbol: &str) -> Unit {
        self.lookup(symbol, |registry| registry.by_symbol.get(symbol).cloned())
    }

    fn lookup(&self, key: &str, find: impl FnOnce(&Registry) -> Option<Unit>) -> Unit {
        if !self.is_valid() {
            return Unit::invalid(self.status);
        }
        if key.is_empty() {
            return Unit::invalid(Status::BadArgument);
        }
        find(&self.inner.read()).unwrap_or_else(|| Unit::invalid(Status::NoUnit))
    }

    /// Parse a unit expression. Empty or absent text is the unit one.
    pub fn unit_from_string<'a>(&self, text: impl Into<Option<&'a str>>) -> Unit {
        if !self.is_valid() {
            return Unit::invalid(self.status);
        }
        match text.into() {
            None | Some("") => self.dimensionless_unit_one(),
            Some(text) => parse::parse(&self.inner, &self.inner.read(), text),
        }
    }

    /// The empty product
    pub fn dimensionless_unit_one(&self) -> Unit {
        if !self.is_valid() {
            return Unit::invalid(self.status);
        }
        self.inner.one()
    }

    /// The unit used as the time scale of timestamp units
    pub fn second(&self) -> Unit {
        if !self.is_valid() {
            return Unit::invalid(self.status);
        }
        self.inner
            .read()
            .second()
            .unwrap_or_else(|| Unit::invalid(Status::NoSecond))
    }

    /// Add a unit along a new dimension axis
    pub fn add_base_unit(&mut self, name: &str, symbol: &str) -> Unit {
        self.add_basic(name, symbol, true)
    }

    /// Add a named dimensionless unit such as the radian
    pub fn add_dimensionless_unit(&mut self, name: &str, symbol: &str) -> Unit {
        self.add_basic(name, symbol, false)
    }

    fn add_basic(&mut self, name: &str, symbol: &str, with_axis: bool) -> Unit {
        if !self.is_valid() {
            return Unit::invalid(self.status);
        }
        let mut registry = self.inner.write();
        if registry.by_name.contains_key(name) || registry.by_symbol.contains_key(symbol) {
            return Unit::invalid(Status::Exists);
        }
        let axis = with_axis.then_some(registry.axes);
        let basic = Basic { index: registry.basics, axis };
        let unit = Unit::from_node(self.inner.node(Kind::Basic(basic)));
        if let Err(status) = registry.insert_lookup(&unit, name, symbol) {
            return Unit::invalid(status);
        }
        registry.insert_labels(&unit, name, symbol);
        registry.basics += 1;
        if with_axis {
            registry.axes += 1;
        }
        debug!(name, symbol, index = basic.index, ?axis, "added basic unit");
        unit
    }

    /// Register `unit` under `name` and `symbol` (either may be empty).
    /// The first name and symbol registered for a unit are the ones it prints with.
    pub fn add_unit(&mut self, unit: &Unit, name: &str, symbol: &str) -> Result<(), Status> {
        self.check_own(unit)?;
        let mut registry = self.inner.write();
        registry.insert_lookup(unit, name, symbol)?;
        registry.insert_labels(unit, name, symbol);
        debug!(name, symbol, "added unit");
        Ok(())
    }

    /// Map extra identifiers to `unit` without changing how it prints
    pub fn add_alias(&mut self, unit: &Unit, name: &str, symbol: &str) -> Result<(), Status> {
        self.check_own(unit)?;
        self.inner.write().insert_lookup(unit, name, symbol)?;
        debug!(name, symbol, "added alias");
        Ok(())
    }

    /// Add a prefix such as `kilo`/`k` = 1000
    pub fn add_prefix(&mut self, name: &str, symbol: &str, value: f64) -> Result<(), Status> {
        if !self.is_valid() {
            return Err(self.status);
        }
        if !value.is_finite() || value == 0.0 || (name.is_empty() && symbol.is_empty()) {
            return Err(Status::BadArgument);
        }
        let mut registry = self.inner.write();
        Registry::insert_prefix(&mut registry.name_prefixes, name, value)?;
        Registry::insert_prefix(&mut registry.symbol_prefixes, symbol, value)?;
        debug!(name, symbol, value, "added prefix");
        Ok(())
    }

    /// Designate the time unit that timestamp units are measured against
    pub fn set_second(&mut self, unit: &Unit) -> Result<(), Status> {
        self.check_own(unit)?;
        if matches!(unit.unit_type(), UnitType::Timestamp | UnitType::Logarithmic) {
            return Err(Status::BadArgument);
        }
        if let Some(existing) = self.inner.read().second() {
            if !Converter::can_convert(&existing, unit) {
                return Err(Status::Meaningless);
            }
        }
        self.inner.write().second = Some(unit.clone());
        Ok(())
    }

    fn check_own(&self, unit: &Unit) -> Result<(), Status> {
        if !self.is_valid() {
            return Err(self.status);
        }
        let node = unit.live_node().ok_or(unit.status())?;
        if node.system_id != self.inner.id {
            return Err(Status::NotSameSystem);
        }
        Ok(())
    }

    /// All registered names (aliases included), sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered symbols (aliases included), sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.inner.read().by_symbol.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_system() -> (UnitSystem, Unit, Unit) {
        let mut system = UnitSystem::new();
        let m = system.add_base_unit("meter", "m");
        let s = system.add_base_unit("second", "s");
        system.add_prefix("kilo", "k", 1e3).unwrap();
        system.add_prefix("milli", "m", 1e-3).unwrap();
        (system, m, s)
    }

    #[test]
    fn test_new_system_has_one() {
        let system = UnitSystem::new();
        assert!(system.is_valid());
        assert_eq!(system.database_origin(), DatabaseOrigin::None);
        let one = system.dimensionless_unit_one();
        assert_eq!(one.unit_type(), UnitType::Product);
        assert!(one.is_dimensionless());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let (system, m, _) = small_system();
        assert_eq!(system.unit_by_name("meter"), m);
        assert_eq!(system.unit_by_symbol("m"), m);
        assert!(!system.unit_by_name("Meter").is_valid());
        assert_eq!(system.unit_by_name("").status(), Status::BadArgument);
        assert_eq!(system.unit_by_name("foobarbaz").status(), Status::NoUnit);
    }

    #[test]
    fn test_base_units_get_distinct_axes() {
        let (_system, m, s) = small_system();
        assert_ne!(m, s);
        assert_ne!(m.dimension(), s.dimension());
        assert_eq!(m.name().as_deref(), Some("meter"));
        assert_eq!(s.symbol().as_deref(), Some("s"));
    }

    #[test]
    fn test_dimensionless_basic() {
        let mut system = UnitSystem::new();
        let rad = system.add_dimensionless_unit("radian", "rad");
        assert!(rad.is_dimensionless());
        assert_eq!(rad.unit_type(), UnitType::Basic);
        assert_ne!(rad, system.dimensionless_unit_one());
    }

    #[test]
    fn test_add_unit_collisions() {
        let (mut system, m, s) = small_system();
        assert_eq!(system.add_unit(&s, "meter", ""), Err(Status::Exists));
        // re-registering the same unit is harmless
        assert_eq!(system.add_unit(&m, "meter", "m"), Ok(()));
        assert!(!system.add_base_unit("meter", "x").is_valid());
    }

    #[test]
    fn test_alias_does_not_relabel() {
        let (mut system, m, _) = small_system();
        system.add_alias(&m, "metre", "").unwrap();
        assert_eq!(system.unit_by_name("metre"), m);
        assert_eq!(m.name().as_deref(), Some("meter"));
    }

    #[test]
    fn test_foreign_unit_rejected() {
        let (mut system, _, _) = small_system();
        let mut other = UnitSystem::new();
        let foreign = other.add_base_unit("furlong", "fur");
        assert_eq!(system.add_unit(&foreign, "furlong", ""), Err(Status::NotSameSystem));
    }

    #[test]
    fn test_resolution_order() {
        let (system, m, s) = small_system();
        let registry = system.cell().read();
        // exact symbol beats milli-prefix
        assert_eq!(registry.resolve("m"), Some(m.clone()));
        assert_eq!(registry.resolve("km"), Some(m.scale_by(1e3)));
        assert_eq!(registry.resolve("ms"), Some(s.scale_by(1e-3)));
        assert_eq!(registry.resolve("kilometer"), Some(m.scale_by(1e3)));
        assert_eq!(registry.resolve("METER"), Some(m.clone()));
        assert_eq!(registry.resolve("Kilometer"), Some(m.scale_by(1e3)));
        assert_eq!(registry.resolve("fbb"), None);
    }

    #[test]
    fn test_prefix_validation() {
        let (mut system, _, _) = small_system();
        assert_eq!(system.add_prefix("zero", "z", 0.0), Err(Status::BadArgument));
        assert_eq!(system.add_prefix("kilo", "", 1024.0), Err(Status::Exists));
        assert_eq!(system.add_prefix("kilo", "k", 1e3), Ok(()));
    }

    #[test]
    fn test_second() {
        let (mut system, m, s) = small_system();
        assert_eq!(system.second().status(), Status::NoSecond);
        system.set_second(&s).unwrap();
        assert_eq!(system.second(), s);
        assert_eq!(system.set_second(&m), Err(Status::Meaningless));
    }

    #[test]
    fn test_dropped_system_invalidates_units() {
        let (system, m, _) = small_system();
        drop(system);
        assert!(!m.is_valid());
        assert_eq!(m.status(), Status::NoUnit);
    }

    #[test]
    fn test_failed_system_behaves_as_empty() {
        let system = UnitSystem::failed(Status::OpenArgument, "no such file", None);
        assert!(!system.is_valid());
        assert_eq!(system.unit_by_name("meter").status(), Status::OpenArgument);
        assert!(!system.unit_from_string("").is_valid());
        assert_eq!(system.error_message(), Some("no such file"));
    }

    #[test]
    fn test_names_and_symbols() {
        let (system, _, _) = small_system();
        assert_eq!(system.names(), vec!["meter".to_string(), "second".to_string()]);
        assert_eq!(system.symbols(), vec!["m".to_string(), "s".to_string()]);
    }
}
