use crate::core::io::latfile::LatticeError;
use crate::core::models::beam::BeamState;
use crate::core::models::element::{ElementRecord, LatticeElement, declaration_keys};
use crate::core::models::lattice::{ElementFilter, ElementSelector, LatticeDocument};
use crate::core::models::snapshot::MomentState;
use crate::core::models::value::Properties;
use crate::engine::config::ConfigError;
use crate::engine::diagnostics::DiagnosticReporter;
use crate::engine::error::EngineError;
use crate::engine::transport::Machine;
use tracing::{debug, info, instrument};

/// Which elements to record the beam state after during [`propagate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Monitor {
    #[default]
    None,
    /// Only the last propagated element.
    Last,
    Indices(Vec<usize>),
}

#[derive(Debug, Clone)]
pub struct PropagationResult {
    /// Beam states after each monitored element, in transport order.
    pub monitored: Vec<(usize, BeamState)>,
    /// The beam state after the last propagated element.
    pub state: BeamState,
}

/// Builds the initial [`BeamState`].
///
/// The state comes from the first usable input, in order: `initial`, a clone of
/// `template`, or a freshly allocated state from `machine`. A state whose
/// centroids are all zero is advanced through element 0 (the source) when a
/// machine is available; without one it is kept as is and a warning is reported.
///
/// # Errors
///
/// Returns [`EngineError::Initialization`] when no input is given, and
/// [`EngineError::Transport`] if advancing through the source fails.
#[instrument(skip_all, name = "init_beam_state")]
pub fn init_beam_state<M: Machine>(
    initial: Option<MomentState>,
    template: Option<&BeamState>,
    machine: Option<&M>,
    reporter: &DiagnosticReporter,
) -> Result<BeamState, EngineError> {
    let mut state = match (initial, template, machine) {
        (Some(state), _, _) => state,
        (None, Some(template), _) => template.state().clone(),
        (None, None, Some(machine)) => machine.allocate_state(),
        (None, None, None) => {
            return Err(EngineError::Initialization(
                "no initial state, beam state or machine was given".to_string(),
            ));
        }
    };

    if state.is_uninitialized() {
        match machine {
            Some(machine) => {
                debug!("Seeding zero state through the source element.");
                machine
                    .propagate(&mut state, 0, 1, &[])
                    .map_err(EngineError::transport)?;
            }
            None => reporter.warn(
                "BeamState: moment0 is all zero and no machine is available to seed it.",
            ),
        }
    }
    Ok(BeamState::new(state))
}

/// Propagates a beam state through elements `from..=to`.
///
/// `from` defaults to 0 and `to` to the last element. Without a `state`, a
/// freshly allocated one is used; it is seeded only if the range includes the
/// source element.
///
/// # Errors
///
/// Returns [`EngineError::Initialization`] for an empty machine,
/// [`EngineError::ElementNotFound`] when `to` is past the end, a
/// [`ConfigError::InvalidRange`] when `from > to`, and
/// [`EngineError::Transport`] if the engine fails.
#[instrument(skip_all, name = "propagate")]
pub fn propagate<M: Machine>(
    machine: &M,
    state: Option<BeamState>,
    from: Option<usize>,
    to: Option<usize>,
    monitor: &Monitor,
) -> Result<PropagationResult, EngineError> {
    let last = machine
        .len()
        .checked_sub(1)
        .ok_or_else(|| EngineError::Initialization("machine has no elements".to_string()))?;
    let start = from.unwrap_or(0);
    let end = to.unwrap_or(last);
    if end > last {
        return Err(EngineError::ElementNotFound(format!("index {end}")));
    }
    if start > end {
        return Err(ConfigError::InvalidRange { start, end }.into());
    }

    let observe = match monitor {
        Monitor::None => Vec::new(),
        Monitor::Last => vec![end],
        Monitor::Indices(indices) => indices.clone(),
    };

    let mut raw = match state {
        Some(state) => state.into_inner(),
        None => machine.allocate_state(),
    };
    let observed = machine
        .propagate(&mut raw, start, end - start + 1, &observe)
        .map_err(EngineError::transport)?;

    info!(start, end, monitored = observed.len(), "Propagation finished.");
    Ok(PropagationResult {
        monitored: observed
            .into_iter()
            .map(|(index, s)| (index, BeamState::new(s)))
            .collect(),
        state: BeamState::new(raw),
    })
}

/// Applies `patch` to every element matched by `selector` and returns their
/// indices. A selector that matches nothing leaves the machine untouched.
///
/// # Errors
///
/// Returns [`EngineError::Transport`] if the engine rejects the patch.
pub fn configure<M: Machine>(
    machine: &mut M,
    selector: &ElementSelector,
    patch: &Properties,
) -> Result<Vec<usize>, EngineError> {
    let indices = machine.conf().select(selector);
    for &index in &indices {
        machine
            .reconfigure(index, patch)
            .map_err(EngineError::transport)?;
    }
    debug!(?selector, elements = indices.len(), "Reconfigured elements.");
    Ok(indices)
}

/// A configuration snapshot carrying the live values of every element.
///
/// Engines report build-time values through [`Machine::conf`]; this copies each
/// element's current declaration properties (see
/// [`declaration_keys`]) over them.
///
/// # Errors
///
/// Returns [`LatticeError::MissingSource`] (wrapped) when the lattice has no
/// source element, and [`EngineError::ElementNotFound`] if the engine cannot
/// report an element it lists.
pub fn conf_update<M: Machine>(machine: &M) -> Result<LatticeDocument, EngineError> {
    let mut document = machine.conf();
    let source = document
        .indices_by_type("source")
        .first()
        .and_then(|&i| machine.element_conf(i))
        .ok_or(LatticeError::MissingSource)?;

    for index in 0..machine.len() {
        let live = machine
            .element_conf(index)
            .ok_or_else(|| EngineError::ElementNotFound(format!("index {index}")))?;
        let keys = declaration_keys(&live, &source.properties);
        document.set_properties(index, &live.subset(&keys));
    }
    Ok(document)
}

/// Inserts `element` before `before` and builds a new machine from the result.
///
/// The lattice is refreshed with [`conf_update`] first, so reconfigured values
/// survive. The machine passed in is stale afterwards.
///
/// # Errors
///
/// Returns [`EngineError::ElementNotFound`] for an unknown element name, and
/// [`EngineError::Transport`] if the engine cannot build the new lattice.
#[instrument(skip_all, name = "insert_element", fields(element = %element.name))]
pub fn insert_element<M: Machine>(
    machine: &M,
    before: &ElementSelector,
    element: LatticeElement,
) -> Result<M, EngineError> {
    let mut document = conf_update(machine)?;
    let index = match before {
        ElementSelector::Index(index) => *index,
        ElementSelector::Token(name) => document
            .first_index_of(name)
            .ok_or_else(|| EngineError::ElementNotFound(name.clone()))?,
    };
    document.insert(index, element);
    let rebuilt = M::build(&document).map_err(EngineError::transport)?;
    info!(index, elements = rebuilt.len(), "Rebuilt machine with inserted element.");
    Ok(rebuilt)
}

/// The engine's configuration with every element carrying its live merged
/// properties.
pub fn live_document<M: Machine>(machine: &M) -> LatticeDocument {
    let mut document = machine.conf();
    for (index, element) in document.elements.iter_mut().enumerate() {
        if let Some(live) = machine.element_conf(index) {
            element.properties = live.properties;
        }
    }
    document
}

/// Looks up elements by the supplied filters against the live configuration.
/// An empty result is reported as a warning.
///
/// # Errors
///
/// Returns a lookup error for an invalid name pattern.
pub fn get_element<M: Machine>(
    machine: &M,
    filter: &ElementFilter,
    reporter: &DiagnosticReporter,
) -> Result<Vec<ElementRecord>, EngineError> {
    let records = live_document(machine).lookup(filter)?;
    if records.is_empty() {
        reporter.warn(format!("No element matches {filter:?}."));
    }
    Ok(records)
}
