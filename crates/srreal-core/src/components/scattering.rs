use super::elements::electron_count;
use crate::core::attributes::{AttributeTable, HasAttributeTable};
use crate::core::component::Component;
use crate::core::owner::ComponentOwner;
use crate::core::registry::{Prototype, RegistryError, TypeRegistry};
use crate::core::ticker::{ClockSource, EventTicker};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub type ScatteringFactorTableRegistry = TypeRegistry<dyn ScatteringFactorTable>;
pub type ScatteringFactorTableOwner = ComponentOwner<dyn ScatteringFactorTable>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    #[error("Unknown atom or ion symbol '{0}'")]
    UnknownSymbol(String),

    #[error("Cannot rescale from '{symbol}': its standard scattering factor at Q={q} is zero")]
    ZeroReference { symbol: String, q: f64 },

    #[error("Custom factor for '{symbol}' needs a finite {name}, got {value}")]
    NonFinite {
        symbol: String,
        name: &'static str,
        value: f64,
    },
}

#[derive(Debug, Error)]
pub enum CustomFactorLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CustomFactor<'a> {
    source: &'a str,
    scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct CustomEntry {
    source: String,
    scale: f64,
    value: f64,
    q: f64,
}

/// User overrides of standard scattering factors.
///
/// Each custom symbol is a rescaled copy of the standard factor of a source
/// symbol, so the override keeps the Q dependence of its source. The value and
/// Q an override was defined with are kept so it can be replayed exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomFactors {
    entries: HashMap<String, CustomEntry>,
}

impl CustomFactors {
    fn get(&self, symbol: &str) -> Option<CustomFactor<'_>> {
        self.entries.get(symbol).map(|entry| CustomFactor {
            source: entry.source.as_str(),
            scale: entry.scale,
        })
    }

    fn insert(&mut self, symbol: &str, entry: CustomEntry) {
        self.entries.insert(symbol.to_string(), entry);
    }

    fn remove(&mut self, symbol: &str) -> bool {
        self.entries.remove(symbol).is_some()
    }

    fn clear(&mut self) -> bool {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        had_entries
    }

    pub fn symbols(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The overrides as records that reproduce them, ordered by symbol.
    pub fn records(&self) -> Vec<CustomFactorRecord> {
        let mut records: Vec<_> = self
            .entries
            .iter()
            .map(|(symbol, entry)| CustomFactorRecord {
                symbol: symbol.clone(),
                source: Some(entry.source.clone()),
                value: entry.value,
                q: Some(entry.q),
            })
            .collect();
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        records
    }
}

/// Lookup of atomic scattering factors by atom, ion or isotope symbol.
pub trait ScatteringFactorTable: Component {
    fn create(&self) -> Box<dyn ScatteringFactorTable>;

    fn clone_boxed(&self) -> Box<dyn ScatteringFactorTable>;

    /// `"X"` for x-rays, `"N"` for neutrons, `"E"` for electrons and `"EN"`
    /// for the electron number table.
    fn radiation_type(&self) -> &str;

    /// Tabulated scattering factor at `q` in inverse Angstroms, ignoring
    /// custom overrides.
    fn standard_lookup(&self, symbol: &str, q: f64) -> Result<f64, LookupError>;

    fn custom_factors(&self) -> &CustomFactors;

    fn custom_factors_mut(&mut self) -> &mut CustomFactors;

    /// Scattering factor at `q`, honoring custom overrides.
    fn lookup(&self, symbol: &str, q: f64) -> Result<f64, LookupError> {
        match self.custom_factors().get(symbol) {
            Some(custom) => Ok(custom.scale * self.standard_lookup(custom.source, q)?),
            None => self.standard_lookup(symbol, q),
        }
    }

    /// Defines `symbol` as the standard factor of `source` rescaled to equal
    /// `value` at `q`.
    fn set_custom_from(
        &mut self,
        symbol: &str,
        source: &str,
        value: f64,
        q: f64,
    ) -> Result<(), LookupError> {
        for (name, number) in [("value", value), ("q", q)] {
            if !number.is_finite() {
                return Err(LookupError::NonFinite {
                    symbol: symbol.to_string(),
                    name,
                    value: number,
                });
            }
        }
        let reference = self.standard_lookup(source, q)?;
        if reference == 0.0 {
            return Err(LookupError::ZeroReference {
                symbol: source.to_string(),
                q,
            });
        }
        let entry = CustomEntry {
            source: source.to_string(),
            scale: value / reference,
            value,
            q,
        };
        self.custom_factors_mut().insert(symbol, entry);
        self.ticker_mut().click();
        Ok(())
    }

    fn set_custom(&mut self, symbol: &str, value: f64) -> Result<(), LookupError> {
        self.set_custom_from(symbol, symbol, value, 0.0)
    }

    fn reset_custom(&mut self, symbol: &str) {
        if self.custom_factors_mut().remove(symbol) {
            self.ticker_mut().click();
        }
    }

    fn reset_all(&mut self) {
        if self.custom_factors_mut().clear() {
            self.ticker_mut().click();
        }
    }

    fn custom_symbols(&self) -> BTreeSet<String> {
        self.custom_factors().symbols()
    }
}

impl Prototype for dyn ScatteringFactorTable {
    const KIND: &'static str = "ScatteringFactorTable";

    fn create_instance(&self) -> Box<Self> {
        self.create()
    }

    fn clone_instance(&self) -> Box<Self> {
        self.clone_boxed()
    }
}

/// Scattering factor equal to the number of electrons, registered as
/// `"electronnumber"` with the alias `"EN"`.
#[derive(Debug, Clone)]
pub struct ElectronNumberTable {
    custom: CustomFactors,
    ticker: EventTicker,
    attributes: AttributeTable<ElectronNumberTable>,
}

impl ElectronNumberTable {
    pub const TYPE_NAME: &'static str = "electronnumber";

    pub fn new(clock: &ClockSource) -> Self {
        Self {
            custom: CustomFactors::default(),
            ticker: clock.ticker(),
            attributes: AttributeTable::new(),
        }
    }
}

impl HasAttributeTable for ElectronNumberTable {
    fn attribute_table(&self) -> &AttributeTable<Self> {
        &self.attributes
    }
}

impl Component for ElectronNumberTable {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn ticker(&self) -> &EventTicker {
        &self.ticker
    }

    fn ticker_mut(&mut self) -> &mut EventTicker {
        &mut self.ticker
    }
}

impl ScatteringFactorTable for ElectronNumberTable {
    fn create(&self) -> Box<dyn ScatteringFactorTable> {
        Box::new(Self::new(self.ticker.source()))
    }

    fn clone_boxed(&self) -> Box<dyn ScatteringFactorTable> {
        Box::new(self.clone())
    }

    fn radiation_type(&self) -> &str {
        "EN"
    }

    fn standard_lookup(&self, symbol: &str, _q: f64) -> Result<f64, LookupError> {
        electron_count(symbol)
            .map(f64::from)
            .ok_or_else(|| LookupError::UnknownSymbol(symbol.to_string()))
    }

    fn custom_factors(&self) -> &CustomFactors {
        &self.custom
    }

    fn custom_factors_mut(&mut self) -> &mut CustomFactors {
        &mut self.custom
    }
}

/// One row of a custom scattering factor file with the columns
/// `symbol,source,value,q`. Empty `source` means the symbol itself, empty `q`
/// means zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFactorRecord {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
}

pub fn load_custom_factors(path: &Path) -> Result<Vec<CustomFactorRecord>, CustomFactorLoadError> {
    let to_error = |e| CustomFactorLoadError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(to_error)?;

    let mut records = Vec::new();
    for result in reader.deserialize::<CustomFactorRecord>() {
        records.push(result.map_err(to_error)?);
    }
    debug!(path = %path.display(), count = records.len(), "Loaded custom scattering factors.");
    Ok(records)
}

/// Applies all records in order; stops at the first record that cannot be
/// resolved by the table.
pub fn apply_custom_factors(
    table: &mut dyn ScatteringFactorTable,
    records: &[CustomFactorRecord],
) -> Result<(), LookupError> {
    for record in records {
        let source = record.source.as_deref().unwrap_or(&record.symbol);
        table.set_custom_from(&record.symbol, source, record.value, record.q.unwrap_or(0.0))?;
    }
    Ok(())
}

pub fn create_scattering_factor_table(
    registry: &ScatteringFactorTableRegistry,
    name: &str,
) -> Result<Box<dyn ScatteringFactorTable>, RegistryError> {
    registry.create(name)
}

pub fn register_scattering_factor_table(
    registry: &mut ScatteringFactorTableRegistry,
    prototype: Box<dyn ScatteringFactorTable>,
) -> Result<bool, RegistryError> {
    registry.add(prototype)
}

pub fn alias_scattering_factor_table(
    registry: &mut ScatteringFactorTableRegistry,
    existing: &str,
    alias: &str,
) -> Result<(), RegistryError> {
    registry.alias(existing, alias)
}

pub fn scattering_factor_table_types(registry: &ScatteringFactorTableRegistry) -> BTreeSet<String> {
    registry.types()
}

pub fn register_builtin_scattering_factor_tables(
    registry: &mut ScatteringFactorTableRegistry,
) -> Result<(), RegistryError> {
    let clock = registry.clock().clone();
    register_scattering_factor_table(registry, Box::new(ElectronNumberTable::new(&clock)))?;
    alias_scattering_factor_table(registry, ElectronNumberTable::TYPE_NAME, "EN")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn table() -> Box<dyn ScatteringFactorTable> {
        let mut registry = ScatteringFactorTableRegistry::new(ClockSource::new());
        register_builtin_scattering_factor_tables(&mut registry).unwrap();
        create_scattering_factor_table(&registry, "EN").unwrap()
    }

    #[test]
    fn electron_number_table_counts_electrons() {
        let table = table();
        assert_eq!(table.type_name(), "electronnumber");
        assert_eq!(table.radiation_type(), "EN");
        assert_eq!(table.lookup("Na", 0.0), Ok(11.0));
        assert_eq!(table.lookup("Na+", 5.0), Ok(10.0));
        assert_eq!(
            table.lookup("Qq", 0.0),
            Err(LookupError::UnknownSymbol("Qq".to_string()))
        );
    }

    #[test]
    fn set_custom_overrides_lookup_and_clicks() {
        let mut table = table();
        let before = table.ticker_value();
        table.set_custom("Na", 7.0).unwrap();
        assert_eq!(table.lookup("Na", 0.0), Ok(7.0));
        assert_eq!(table.standard_lookup("Na", 0.0), Ok(11.0));
        assert!(table.ticker_value() > before);
        assert_eq!(
            table.custom_symbols().into_iter().collect::<Vec<_>>(),
            vec!["Na"]
        );
    }

    #[test]
    fn set_custom_from_rescales_source_factor() {
        let mut table = table();
        table.set_custom_from("Xa", "O", 4.0, 0.0).unwrap();
        assert_eq!(table.lookup("Xa", 0.0), Ok(4.0));
    }

    #[test]
    fn set_custom_from_unknown_source_fails_without_change() {
        let mut table = table();
        let before = table.ticker_value();
        assert!(table.set_custom_from("Xa", "Qq", 4.0, 0.0).is_err());
        assert!(table.custom_symbols().is_empty());
        assert_eq!(table.ticker_value(), before);
    }

    #[test]
    fn set_custom_rejects_non_finite_input_without_change() {
        let mut table = table();
        table.set_custom("Na", 7.0).unwrap();
        let before = table.ticker_value();

        assert!(matches!(
            table.set_custom("Na", f64::NAN),
            Err(LookupError::NonFinite { name: "value", .. })
        ));
        assert!(matches!(
            table.set_custom("Cl", f64::INFINITY),
            Err(LookupError::NonFinite { name: "value", .. })
        ));
        assert!(matches!(
            table.set_custom_from("Xa", "O", 4.0, f64::NAN),
            Err(LookupError::NonFinite { name: "q", .. })
        ));
        assert_eq!(table.lookup("Na", 0.0), Ok(7.0));
        assert_eq!(
            table.custom_symbols().into_iter().collect::<Vec<_>>(),
            vec!["Na"]
        );
        assert_eq!(table.ticker_value(), before);
    }

    #[test]
    fn custom_factor_records_replay_onto_fresh_table() {
        let mut original = table();
        original.set_custom("Na", 7.0).unwrap();
        original.set_custom_from("Xa", "O", 4.0, 1.5).unwrap();

        let records = original.custom_factors().records();
        assert_eq!(
            records.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
            vec!["Na", "Xa"]
        );

        let mut fresh = table();
        apply_custom_factors(fresh.as_mut(), &records).unwrap();
        assert_eq!(fresh.custom_factors(), original.custom_factors());
        assert_eq!(fresh.lookup("Xa", 0.0), Ok(4.0));
    }

    #[test]
    fn reset_custom_restores_standard_value() {
        let mut table = table();
        table.set_custom("Na", 7.0).unwrap();
        table.set_custom("Cl", 20.0).unwrap();

        table.reset_custom("Na");
        assert_eq!(table.lookup("Na", 0.0), Ok(11.0));
        assert_eq!(table.lookup("Cl", 0.0), Ok(20.0));

        let before = table.ticker_value();
        table.reset_custom("Na");
        assert_eq!(table.ticker_value(), before);

        table.reset_all();
        assert_eq!(table.lookup("Cl", 0.0), Ok(17.0));
        assert!(table.ticker_value() > before);
    }

    #[test]
    fn clone_keeps_custom_factors() {
        let mut table = table();
        table.set_custom("Na", 7.0).unwrap();
        let copy = table.clone_instance();
        table.reset_all();
        assert_eq!(copy.lookup("Na", 0.0), Ok(7.0));
    }

    #[test]
    fn custom_factors_load_from_csv_and_apply() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.csv");
        fs::write(&path, "symbol,source,value,q\nNa,,7.0,\nXa, O ,4.0,0.0\n").unwrap();

        let records = load_custom_factors(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, None);
        assert_eq!(records[1].source.as_deref(), Some("O"));

        let mut table = table();
        apply_custom_factors(table.as_mut(), &records).unwrap();
        assert_eq!(table.lookup("Na", 0.0), Ok(7.0));
        assert_eq!(table.lookup("Xa", 0.0), Ok(4.0));
    }

    #[test]
    fn load_custom_factors_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_custom_factors(&dir.path().join("missing.csv"));
        assert!(matches!(result, Err(CustomFactorLoadError::Csv { .. })));
    }

    #[test]
    fn load_custom_factors_fails_for_malformed_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "symbol,source,value,q\nNa,,seven,\n").unwrap();
        assert!(load_custom_factors(&path).is_err());
    }
}
