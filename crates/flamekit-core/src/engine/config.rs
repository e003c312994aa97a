use crate::core::models::lattice::ElementSelector;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid element range: start {start} is after end {end}")]
    InvalidRange { start: usize, end: usize },
}

/// Where generated lattice text goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Hand the text back to the caller.
    Stream,
    File(PathBuf),
    Stdout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatticeOutputConfig {
    /// First element written after the source; defaults to element 1.
    pub start: Option<ElementSelector>,
    /// Last element written (inclusive); defaults to the last element.
    pub end: Option<ElementSelector>,
    /// Existing lattice file to patch instead of generating from scratch.
    pub original: Option<PathBuf>,
    pub target: OutputTarget,
}

#[derive(Default)]
pub struct LatticeOutputConfigBuilder {
    start: Option<ElementSelector>,
    end: Option<ElementSelector>,
    original: Option<PathBuf>,
    latfile: Option<PathBuf>,
    stream: bool,
}

impl LatticeOutputConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: impl Into<ElementSelector>) -> Self {
        self.start = Some(start.into());
        self
    }
    pub fn end(mut self, end: impl Into<ElementSelector>) -> Self {
        self.end = Some(end.into());
        self
    }
    pub fn original(mut self, path: PathBuf) -> Self {
        self.original = Some(path);
        self
    }
    pub fn latfile(mut self, path: PathBuf) -> Self {
        self.latfile = Some(path);
        self
    }
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Builds the configuration. A stream target takes precedence over a file,
    /// and standard output is used when neither is set.
    pub fn build(self) -> Result<LatticeOutputConfig, ConfigError> {
        if let (Some(ElementSelector::Index(start)), Some(ElementSelector::Index(end))) =
            (&self.start, &self.end)
        {
            if start > end {
                return Err(ConfigError::InvalidRange {
                    start: *start,
                    end: *end,
                });
            }
        }
        let target = match (self.stream, self.latfile) {
            (true, _) => OutputTarget::Stream,
            (false, Some(path)) => OutputTarget::File(path),
            (false, None) => OutputTarget::Stdout,
        };
        Ok(LatticeOutputConfig {
            start: self.start,
            end: self.end,
            original: self.original,
            target,
        })
    }
}
