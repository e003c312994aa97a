use super::model::conf_update;
use crate::core::io::latfile::{FreshLattice, LatticeError, PatchedLattice};
use crate::core::io::source::encode_source;
use crate::core::io::traits::LatticeRender;
use crate::core::models::beam::BeamState;
use crate::core::models::lattice::{ElementSelector, LatticeDocument};
use crate::engine::config::{ConfigError, LatticeOutputConfig, OutputTarget};
use crate::engine::diagnostics::DiagnosticReporter;
use crate::engine::error::EngineError;
use crate::engine::transport::Machine;
use std::io;
use std::path::Path;
use tracing::{info, instrument};

pub const STREAM_DESTINATION: &str = "string";
pub const STDOUT_DESTINATION: &str = "<stdout>";

/// Where [`generate_latfile`] put its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLattice {
    /// `"string"` for stream output, `"<stdout>"`, or the file path.
    pub destination: String,
    /// The lattice text, for stream output only.
    pub text: Option<String>,
}

/// Writes the machine's current lattice as text.
///
/// The lattice is refreshed with [`conf_update`], and the first `source`
/// element carries the beam parameters. When `state` is given it is encoded into
/// that source. With `config.original` set, the original file is patched in
/// place of generating a fresh one. A fresh lattice always starts with the
/// source element, followed by elements `start..=end`.
///
/// # Errors
///
/// Returns an error if the lattice has no source, a range bound cannot be
/// resolved, the state cannot be encoded, or the lattice cannot be read,
/// rendered or written.
#[instrument(skip_all, name = "generate_latfile")]
pub fn generate_latfile<M: Machine>(
    machine: &M,
    state: Option<&BeamState>,
    config: &LatticeOutputConfig,
    reporter: &DiagnosticReporter,
) -> Result<GeneratedLattice, EngineError> {
    let document = conf_update(machine)?;
    let source_index = document
        .indices_by_type("source")
        .first()
        .copied()
        .ok_or(LatticeError::MissingSource)?;
    let mut source = machine
        .element_conf(source_index)
        .ok_or(LatticeError::UnresolvedElement {
            index: source_index,
        })?;
    if let Some(state) = state {
        source = encode_source(state, Some(&source))?;
    }

    let generated = match &config.original {
        Some(path) => {
            let original = std::fs::read_to_string(path).map_err(|e| LatticeError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            info!(original = %path.display(), "Patching existing lattice.");
            let lattice = PatchedLattice {
                original: &original,
                document: &document,
                source: &source,
            };
            emit(&lattice, &config.target)?
        }
        None => {
            let section = fresh_section(&document, config, state.is_some(), reporter)?;
            info!(elements = section.len(), "Generating fresh lattice.");
            let lattice = FreshLattice {
                document: &document,
                source: &source,
                section,
            };
            emit(&lattice, &config.target)?
        }
    };

    info!(destination = %generated.destination, "Lattice written.");
    Ok(generated)
}

/// Element 0 followed by `start..=end`, with `start` defaulting to 1 and `end`
/// to the last element.
fn fresh_section(
    document: &LatticeDocument,
    config: &LatticeOutputConfig,
    has_state: bool,
    reporter: &DiagnosticReporter,
) -> Result<Vec<usize>, EngineError> {
    let last = document.len().saturating_sub(1);
    let start = match &config.start {
        Some(selector) => resolve(document, selector)?,
        None => last.min(1),
    };
    let end = match &config.end {
        Some(selector) => resolve(document, selector)?,
        None => last,
    };
    if start > end {
        return Err(ConfigError::InvalidRange { start, end }.into());
    }
    if config.start.is_some() && start != 1 && !has_state {
        reporter.warn(format!(
            "Lattice starts at element {start} but no initial beam state was given; \
             the source keeps its original beam parameters."
        ));
    }
    Ok(std::iter::once(0).chain(start.max(1)..=end).collect())
}

fn resolve(document: &LatticeDocument, selector: &ElementSelector) -> Result<usize, EngineError> {
    match selector {
        ElementSelector::Index(index) if *index < document.len() => Ok(*index),
        ElementSelector::Index(index) => Err(EngineError::ElementNotFound(format!("index {index}"))),
        ElementSelector::Token(name) => document
            .first_index_of(name)
            .ok_or_else(|| EngineError::ElementNotFound(name.clone())),
    }
}

fn emit<R>(lattice: &R, target: &OutputTarget) -> Result<GeneratedLattice, LatticeError>
where
    R: LatticeRender<Error = LatticeError>,
{
    match target {
        OutputTarget::Stream => Ok(GeneratedLattice {
            destination: STREAM_DESTINATION.to_string(),
            text: Some(lattice.render()?),
        }),
        OutputTarget::File(path) => {
            lattice
                .write_to_path(path)
                .map_err(|e| with_path(e, path))?;
            Ok(GeneratedLattice {
                destination: path.display().to_string(),
                text: None,
            })
        }
        OutputTarget::Stdout => {
            lattice.write_to(&mut io::stdout().lock())?;
            Ok(GeneratedLattice {
                destination: STDOUT_DESTINATION.to_string(),
                text: None,
            })
        }
    }
}

fn with_path(error: LatticeError, path: &Path) -> LatticeError {
    match error {
        LatticeError::Write(source) => LatticeError::Io {
            path: path.display().to_string(),
            source,
        },
        other => other,
    }
}
