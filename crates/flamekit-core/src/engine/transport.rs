use super::diagnostics::DiagnosticReporter;
use crate::core::models::element::LatticeElement;
use crate::core::models::lattice::LatticeDocument;
use crate::core::models::snapshot::MomentState;
use crate::core::models::value::Properties;
use tracing::debug;

/// Seam to an external moment-matrix transport engine.
///
/// A machine is built from a lattice configuration and owns its elements. The
/// transport computation itself is opaque; this crate only relies on the
/// operations below.
///
/// After any structural rebuild (see
/// [`insert_element`](crate::workflows::model::insert_element)) the previous
/// machine is stale and must not be used anymore.
pub trait Machine: Sized {
    /// The error type reported by the engine.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds a machine from a lattice configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the configuration.
    fn build(document: &LatticeDocument) -> Result<Self, Self::Error>;

    /// The configuration the machine was built from.
    ///
    /// Engines are allowed to keep returning the build-time element properties
    /// after [`reconfigure`](Machine::reconfigure); use
    /// [`element_conf`](Machine::element_conf) for live values.
    fn conf(&self) -> LatticeDocument;

    /// The live, merged configuration (header defaults plus own properties) of
    /// element `index`, or `None` if there is no such element.
    fn element_conf(&self, index: usize) -> Option<LatticeElement>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overlays `patch` onto the properties of element `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the element does not exist or rejects the values.
    fn reconfigure(&mut self, index: usize, patch: &Properties) -> Result<(), Self::Error>;

    /// Allocates an all-zero state with the engine's charge-state layout.
    fn allocate_state(&self) -> MomentState;

    /// Advances `state` through at most `max` elements starting at `start`.
    ///
    /// Returns a copy of the state after every element listed in `observe`
    /// that was passed, paired with the element index.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to propagate the state.
    fn propagate(
        &self,
        state: &mut MomentState,
        start: usize,
        max: usize,
        observe: &[usize],
    ) -> Result<Vec<(usize, MomentState)>, Self::Error>;
}

/// Picks the machine to work on, preferring a fresh build from `document`.
///
/// # Arguments
///
/// * `document` - The lattice configuration to build from, if any.
/// * `machine` - An already built machine to fall back on.
/// * `reporter` - Receives a warning when the build fails and `machine` is used
///   instead, or an error when there is nothing to fall back on.
///
/// # Return
///
/// Returns the freshly built machine, `machine` when there is no document or the
/// build fails, and `None` when neither yields a machine.
pub fn resolve_machine<M: Machine>(
    document: Option<&LatticeDocument>,
    machine: Option<M>,
    reporter: &DiagnosticReporter,
) -> Option<M> {
    let Some(document) = document else {
        return machine;
    };
    match M::build(document) {
        Ok(built) => {
            debug!(elements = built.len(), "Built machine from lattice document.");
            Some(built)
        }
        Err(e) if machine.is_some() => {
            reporter.warn(format!(
                "Failed to initialize machine from lattice '{}' ({e}), using the given machine instead.",
                document.name
            ));
            machine
        }
        Err(e) => {
            reporter.error(format!(
                "Failed to initialize machine from lattice '{}': {e}",
                document.name
            ));
            None
        }
    }
}
