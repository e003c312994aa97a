//! A small drift-only transport engine used by the crate's tests.

use super::transport::Machine;
use crate::core::models::element::LatticeElement;
use crate::core::models::lattice::LatticeDocument;
use crate::core::models::snapshot::MomentState;
use crate::core::models::value::{Properties, Value};
use crate::core::optics::{Matrix7, Vector7};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MockError {
    #[error("lattice '{0}' has no elements")]
    EmptyLattice(String),
    #[error("no element at index {0}")]
    UnknownElement(usize),
    #[error("source element is missing '{0}'")]
    InvalidSource(String),
}

/// Keeps the document it was built from (what [`Machine::conf`] reports) apart
/// from the live one that [`Machine::reconfigure`] edits, like real engines do.
#[derive(Debug, Clone)]
pub struct MockMachine {
    built: LatticeDocument,
    live: LatticeDocument,
}

impl MockMachine {
    fn first_source(&self) -> Option<LatticeElement> {
        let index = self.live.indices_by_type("source").into_iter().next()?;
        self.live.element_conf(index)
    }

    fn seed(source: &LatticeElement, state: &mut MomentState) -> Result<(), MockError> {
        let list = |key: &str| {
            source
                .get(key)
                .and_then(Value::to_list)
                .ok_or_else(|| MockError::InvalidSource(key.to_string()))
        };
        let number = |key: &str| {
            source
                .get(key)
                .and_then(Value::as_number)
                .ok_or_else(|| MockError::InvalidSource(key.to_string()))
        };

        let ion_q = list("NCharge")?;
        let ion_z = list("IonChargeStates")?;
        let ion_ek = number("IonEk")?;
        let ion_es = number("IonEs")?;
        let count = ion_q.len();

        let gamma = (ion_es + ion_ek) / ion_es;
        let beta = (1.0 - 1.0 / (gamma * gamma)).sqrt();

        let mut seeded = MomentState::zeros(count);
        seeded.pos = state.pos;
        let reference = &mut seeded.reference;
        reference.ion_ek = ion_ek;
        reference.ion_es = ion_es;
        reference.ion_w = ion_ek + ion_es;
        reference.gamma = gamma;
        reference.beta = beta;
        reference.bg = beta * gamma;
        reference.ion_q = ion_q.first().copied().unwrap_or_default();
        reference.ion_z = ion_z.first().copied().unwrap_or_default();

        let cs = &mut seeded.charge_states;
        cs.ion_ek = vec![ion_ek; count];
        cs.ion_es = vec![ion_es; count];
        cs.ion_w = vec![ion_ek + ion_es; count];
        cs.gamma = vec![gamma; count];
        cs.beta = vec![beta; count];
        cs.bg = vec![beta * gamma; count];
        cs.ion_q = ion_q;
        cs.ion_z = ion_z;

        let vv = source.vector_variable().unwrap_or("P").to_string();
        let mv = source.matrix_variable().unwrap_or("S").to_string();
        for i in 0..count {
            let centroid = list(&format!("{vv}{i}"))?;
            let tensor = list(&format!("{mv}{i}"))?;
            if centroid.len() != 7 || tensor.len() != 49 {
                return Err(MockError::InvalidSource(format!("{vv}{i}/{mv}{i}")));
            }
            seeded.moment0[i] = Vector7::from_column_slice(&centroid);
            seeded.moment1[i] = Matrix7::from_row_slice(&tensor);
        }
        seeded.update_envelopes();
        *state = seeded;
        Ok(())
    }

    fn drift(length: f64, state: &mut MomentState) {
        let mut map = Matrix7::identity();
        map[(0, 1)] = length * 1e3;
        map[(2, 3)] = length * 1e3;
        state.pos += length;
        for i in 0..state.charge_state_count() {
            state.moment0[i] = map * state.moment0[i];
            state.moment1[i] = map * state.moment1[i] * map.transpose();
            state.transfer_matrix[i] = map * state.transfer_matrix[i];
        }
        state.update_envelopes();
    }
}

impl Machine for MockMachine {
    type Error = MockError;

    fn build(document: &LatticeDocument) -> Result<Self, Self::Error> {
        if document.is_empty() {
            return Err(MockError::EmptyLattice(document.name.clone()));
        }
        Ok(Self {
            built: document.clone(),
            live: document.clone(),
        })
    }

    fn conf(&self) -> LatticeDocument {
        self.built.clone()
    }

    fn element_conf(&self, index: usize) -> Option<LatticeElement> {
        self.live.element_conf(index)
    }

    fn len(&self) -> usize {
        self.live.len()
    }

    fn reconfigure(&mut self, index: usize, patch: &Properties) -> Result<(), Self::Error> {
        if self.live.set_properties(index, patch) {
            Ok(())
        } else {
            Err(MockError::UnknownElement(index))
        }
    }

    fn allocate_state(&self) -> MomentState {
        let count = self
            .first_source()
            .map(|s| s.charge_state_count())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        MomentState::zeros(count)
    }

    fn propagate(
        &self,
        state: &mut MomentState,
        start: usize,
        max: usize,
        observe: &[usize],
    ) -> Result<Vec<(usize, MomentState)>, Self::Error> {
        let end = start.saturating_add(max).min(self.len());
        let mut observed = Vec::new();
        for index in start..end {
            let conf = self
                .element_conf(index)
                .ok_or(MockError::UnknownElement(index))?;
            match conf.element_type.as_str() {
                "source" => Self::seed(&conf, state)?,
                "drift" => {
                    let length = conf.get("L").and_then(Value::as_number).unwrap_or(0.0);
                    Self::drift(length, state);
                }
                _ => {}
            }
            if observe.contains(&index) {
                observed.push((index, state.clone()));
            }
        }
        Ok(observed)
    }
}

/// Four elements: a two-charge-state source, two drifts, and a marker.
pub const LATTICE: &str = r#"
name = "cell"

[header]
sim_type = "MomentMatrix"
Eng_Data_Dir = "data"
IonEk = 500000.0
IonEs = 931494320.0
IonChargeStates = [0.138655, 0.14]
NCharge = [10111.0, 10531.0]
P0 = [1.0, 0.001, 2.0, -0.002, 0.0, 0.0, 1.0]
P1 = [1.5, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]
S0 = [
    4.0, 0.001, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.001, 1e-6, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 9.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 4e-6, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
]
S1 = [
    4.0, 0.001, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.001, 1e-6, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 9.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 4e-6, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
]

[[elements]]
name = "S"
type = "source"
[elements.properties]
vector_variable = "P"
matrix_variable = "S"

[[elements]]
name = "D1"
type = "drift"
[elements.properties]
L = 0.5

[[elements]]
name = "D2"
type = "drift"
[elements.properties]
L = 1.5

[[elements]]
name = "M1"
type = "marker"
"#;

pub fn document() -> LatticeDocument {
    LatticeDocument::from_toml_str(LATTICE).unwrap()
}

pub fn machine() -> MockMachine {
    MockMachine::build(&document()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_seeds_both_charge_states() {
        let m = machine();
        let mut state = m.allocate_state();
        assert_eq!(state.charge_state_count(), 2);
        m.propagate(&mut state, 0, 1, &[]).unwrap();
        assert_eq!(state.moment0[0][0], 1.0);
        assert_eq!(state.moment0[1][0], 1.5);
        assert_eq!(state.moment1[0][(0, 1)], 0.001);
        assert_eq!(state.charge_states.ion_q, vec![10111.0, 10531.0]);
    }

    #[test]
    fn drift_moves_position_and_centroid() {
        let m = machine();
        let mut state = m.allocate_state();
        let observed = m.propagate(&mut state, 0, 2, &[1]).unwrap();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].0, 1);
        assert_eq!(state.pos, 0.5);
        // x' = 1 mrad over 0.5 m adds 0.5 mm
        assert!((state.moment0[0][0] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn conf_keeps_build_time_values_after_reconfigure() {
        let mut m = machine();
        let patch: Properties = [("L".to_string(), Value::Number(2.0))].into();
        m.reconfigure(1, &patch).unwrap();
        assert_eq!(m.conf().elements[1].get("L"), Some(&Value::Number(0.5)));
        assert_eq!(m.element_conf(1).unwrap().get("L"), Some(&Value::Number(2.0)));
        assert_eq!(m.reconfigure(9, &patch), Err(MockError::UnknownElement(9)));
    }

    #[test]
    fn empty_lattice_does_not_build() {
        let doc = LatticeDocument::new("void", Properties::new(), Vec::new());
        assert!(matches!(MockMachine::build(&doc), Err(MockError::EmptyLattice(_))));
    }
}
