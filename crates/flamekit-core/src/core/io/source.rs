use crate::core::models::beam::{BeamState, Observable, StateAccessError};
use crate::core::models::element::{
    LatticeElement, MATRIX_VARIABLE_KEY, SOURCE_TYPE, VECTOR_VARIABLE_KEY,
};
use crate::core::models::value::Value;
use crate::core::optics::Matrix7;
use phf::{Map, phf_map};

pub const DEFAULT_SOURCE_NAME: &str = "S";
pub const DEFAULT_VECTOR_VARIABLE: &str = "P";
pub const DEFAULT_MATRIX_VARIABLE: &str = "S";

/// Source-element property name, mapped to the [`BeamState`] attribute it is read from.
#[rustfmt::skip]
pub static SOURCE_KEY_MAPPING: Map<&'static str, &'static str> = phf_map! {
    "IonChargeStates" => "IonZ",
    "IonEk" => "ref_IonEk",
    "IonEs" => "ref_IonEs",
    "NCharge" => "IonQ",
};

fn observable_to_value(observable: Observable) -> Value {
    match observable {
        Observable::Scalar(v) => Value::Number(v),
        Observable::Array(v) => Value::Array(v),
        Observable::Vector(v) => Value::Array(v.iter().copied().collect()),
        Observable::Matrix(m) => Value::Array(row_major(&m)),
        Observable::Vectors(vs) => Value::Array(vs.iter().flat_map(|v| v.iter().copied()).collect()),
        Observable::Matrices(ms) => Value::Array(ms.iter().flat_map(row_major).collect()),
    }
}

fn row_major(m: &Matrix7) -> Vec<f64> {
    let mut values = Vec::with_capacity(49);
    for r in 0..7 {
        for c in 0..7 {
            values.push(m[(r, c)]);
        }
    }
    values
}

/// Writes `state` into a source element.
///
/// Starts from `existing` when given (typically the merged configuration of the
/// lattice's source element), otherwise from a fresh element named `S` with
/// vector variable `P` and matrix variable `S`. For every charge state `i` the
/// centroid is stored as `{vector_variable}{i}` (7 values) and the correlation
/// tensor as `{matrix_variable}{i}` (49 values, row-major). Encoding the same
/// state twice yields the same element.
///
/// # Arguments
///
/// * `state` - The beam state to encode.
/// * `existing` - The source element to update, if any. Its other properties are kept.
///
/// # Return
///
/// Returns the updated source element.
///
/// # Errors
///
/// Propagates [`StateAccessError`] from reading the mapped state attributes.
pub fn encode_source(
    state: &BeamState,
    existing: Option<&LatticeElement>,
) -> Result<LatticeElement, StateAccessError> {
    let mut element = match existing {
        Some(element) => element.clone(),
        None => LatticeElement::new(DEFAULT_SOURCE_NAME, SOURCE_TYPE),
    };

    for (key, attribute) in SOURCE_KEY_MAPPING.entries() {
        let value = observable_to_value(state.get(attribute)?);
        element.properties.insert(key.to_string(), value);
    }

    let vector_variable = element
        .vector_variable()
        .unwrap_or(DEFAULT_VECTOR_VARIABLE)
        .to_string();
    let matrix_variable = element
        .matrix_variable()
        .unwrap_or(DEFAULT_MATRIX_VARIABLE)
        .to_string();
    element
        .properties
        .insert(VECTOR_VARIABLE_KEY.to_string(), Value::from(vector_variable.as_str()));
    element
        .properties
        .insert(MATRIX_VARIABLE_KEY.to_string(), Value::from(matrix_variable.as_str()));

    for (i, (m0, m1)) in state.moment0().iter().zip(state.moment1()).enumerate() {
        element.properties.insert(
            format!("{vector_variable}{i}"),
            Value::Array(m0.iter().copied().collect()),
        );
        element
            .properties
            .insert(format!("{matrix_variable}{i}"), Value::Array(row_major(m1)));
    }
    Ok(element)
}
