use super::value::{Properties, Value};
use phf::{Set, phf_set};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const SOURCE_TYPE: &str = "source";
pub const STRIPPER_TYPE: &str = "stripper";

/// Properties every `stripper` element reports, even when they equal the lattice defaults.
pub static STRIPPER_PROP_KEYS: Set<&'static str> = phf_set! {
    "IonChargeStates", "NCharge",
};

/// Properties every `source` element reports, besides the per-charge-state
/// `{vector_variable}{i}` / `{matrix_variable}{i}` fields.
pub static SOURCE_PROP_KEYS: Set<&'static str> = phf_set! {
    "IonEk", "IonEs", "NCharge", "IonChargeStates",
};

pub const VECTOR_VARIABLE_KEY: &str = "vector_variable";
pub const MATRIX_VARIABLE_KEY: &str = "matrix_variable";

/// One element of the lattice, in transport order.
///
/// `name` and `type` are kept apart from the free-form property map; the element
/// index is its position in the owning [`LatticeDocument`](super::lattice::LatticeDocument).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeElement {
    pub name: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub properties: Properties,
}

impl LatticeElement {
    pub fn new(name: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            element_type: element_type.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    #[inline]
    pub fn is_source(&self) -> bool {
        self.element_type == SOURCE_TYPE
    }

    #[inline]
    pub fn is_stripper(&self) -> bool {
        self.element_type == STRIPPER_TYPE
    }

    pub fn vector_variable(&self) -> Option<&str> {
        self.get(VECTOR_VARIABLE_KEY).and_then(Value::as_str)
    }

    pub fn matrix_variable(&self) -> Option<&str> {
        self.get(MATRIX_VARIABLE_KEY).and_then(Value::as_str)
    }

    /// Number of charge states declared through `NCharge`.
    pub fn charge_state_count(&self) -> usize {
        self.get("NCharge").map_or(0, Value::list_len)
    }

    /// Copies `keys` (where present) into a fresh property map.
    pub fn subset<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> Properties {
        keys.into_iter()
            .filter_map(|k| self.properties.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }
}

/// An element together with its position in the lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub index: usize,
    pub name: String,
    pub element_type: String,
    pub properties: Properties,
}

fn add_forced_keys(conf: &LatticeElement, keys: &mut BTreeSet<String>, with_source_fields: bool) {
    if conf.is_stripper() {
        keys.extend(STRIPPER_PROP_KEYS.iter().map(|k| k.to_string()));
    } else if conf.is_source() {
        keys.insert(VECTOR_VARIABLE_KEY.to_string());
        keys.insert(MATRIX_VARIABLE_KEY.to_string());
        if with_source_fields {
            keys.extend(SOURCE_PROP_KEYS.iter().map(|k| k.to_string()));
            let count = conf.charge_state_count();
            for var in [conf.vector_variable(), conf.matrix_variable()]
                .into_iter()
                .flatten()
            {
                keys.extend((0..count).map(|i| format!("{var}{i}")));
            }
        }
    }
    keys.retain(|k| conf.properties.contains_key(k));
}

/// The properties that describe `conf` on its own, i.e. its keys minus the
/// lattice-wide `shared` keys, plus the keys forced for `stripper` and `source`
/// elements.
///
/// `conf` is the merged configuration of the element (header defaults overlaid
/// with its own properties). Forced keys are only reported when present.
pub fn effective_property_keys(conf: &LatticeElement, shared: &BTreeSet<String>) -> BTreeSet<String> {
    let mut keys: BTreeSet<String> = conf
        .properties
        .keys()
        .filter(|k| !shared.contains(*k))
        .cloned()
        .collect();
    add_forced_keys(conf, &mut keys, true);
    keys
}

/// Keys written into an element declaration: the keys of `conf` that the
/// `reference` configuration (normally the merged source configuration) does
/// not already carry, plus `vector_variable`/`matrix_variable` for sources and
/// the charge-state keys for strippers.
pub fn declaration_keys(conf: &LatticeElement, reference: &Properties) -> BTreeSet<String> {
    let mut keys: BTreeSet<String> = conf
        .properties
        .keys()
        .filter(|k| !reference.contains_key(*k))
        .cloned()
        .collect();
    add_forced_keys(conf, &mut keys, false);
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn source_conf() -> LatticeElement {
        LatticeElement::new("S", "source")
            .with_property("sim_type", "MomentMatrix")
            .with_property("IonEk", 500000.0)
            .with_property("IonEs", 931494320.0)
            .with_property("NCharge", vec![10111.0, 10531.0])
            .with_property("IonChargeStates", vec![0.138655, 0.14])
            .with_property("vector_variable", "P")
            .with_property("matrix_variable", "S")
            .with_property("P0", vec![0.0; 7])
            .with_property("P1", vec![0.0; 7])
            .with_property("S0", vec![0.0; 49])
            .with_property("S1", vec![0.0; 49])
    }

    #[test]
    fn plain_element_keys_exclude_shared_defaults() {
        let conf = LatticeElement::new("D1", "drift")
            .with_property("L", 0.1)
            .with_property("aper", 0.02)
            .with_property("sim_type", "MomentMatrix");
        let keys = effective_property_keys(&conf, &shared(&["sim_type", "aper"]));
        assert_eq!(keys, shared(&["L"]));
    }

    #[test]
    fn stripper_keeps_charge_state_keys_even_when_shared() {
        let conf = LatticeElement::new("STRIP", "stripper")
            .with_property("IonChargeStates", vec![0.3])
            .with_property("NCharge", vec![100.0]);
        let keys = effective_property_keys(&conf, &shared(&["IonChargeStates", "NCharge"]));
        assert_eq!(keys, shared(&["IonChargeStates", "NCharge"]));
    }

    #[test]
    fn source_synthesizes_one_field_pair_per_charge_state() {
        let all: Vec<&str> = vec![
            "sim_type", "IonEk", "IonEs", "NCharge", "IonChargeStates", "vector_variable",
            "matrix_variable", "P0", "P1", "S0", "S1",
        ];
        let keys = effective_property_keys(&source_conf(), &shared(&all));
        assert_eq!(
            keys,
            shared(&[
                "IonChargeStates", "IonEk", "IonEs", "NCharge", "P0", "P1", "S0", "S1",
                "matrix_variable", "vector_variable",
            ])
        );
    }

    #[test]
    fn declaration_keys_only_force_variable_names_on_sources() {
        let conf = source_conf();
        let keys = declaration_keys(&conf, &conf.properties);
        assert_eq!(keys, shared(&["matrix_variable", "vector_variable"]));

        let quad = LatticeElement::new("Q1", "quadrupole")
            .with_property("B2", 1.2)
            .with_property("sim_type", "MomentMatrix");
        assert_eq!(declaration_keys(&quad, &conf.properties), shared(&["B2"]));
    }
}
