use super::element::{ElementRecord, LatticeElement, effective_property_keys};
use super::value::Properties;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const RESERVED_HEADER_KEYS: [&str; 2] = ["elements", "name"];

#[derive(Debug, Error)]
pub enum LatticeLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    #[error("Invalid element name pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Selects elements either by position or by a token matched against names and types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementSelector {
    Index(usize),
    Token(String),
}

impl From<usize> for ElementSelector {
    fn from(index: usize) -> Self {
        ElementSelector::Index(index)
    }
}

impl From<&str> for ElementSelector {
    fn from(token: &str) -> Self {
        ElementSelector::Token(token.to_string())
    }
}

/// Filters for [`LatticeDocument::lookup`]. Every supplied filter narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementFilter {
    pub indices: Option<Vec<usize>>,
    pub names: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
    pub pattern: Option<String>,
}

impl ElementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: usize) -> Self {
        self.indices.get_or_insert_with(Vec::new).push(index);
        self
    }
    pub fn indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.get_or_insert_with(Vec::new).extend(indices);
        self
    }
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.get_or_insert_with(Vec::new).push(name.into());
        self
    }
    pub fn element_type(mut self, element_type: impl Into<String>) -> Self {
        self.types.get_or_insert_with(Vec::new).push(element_type.into());
        self
    }
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

/// One row of the element-type census.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCount {
    pub element_type: String,
    pub count: usize,
    pub fraction: f64,
}

/// Configuration snapshot of a whole lattice: the beamline name, the lattice-wide
/// header defaults and the ordered element list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatticeDocument {
    pub name: String,
    #[serde(default)]
    pub header: Properties,
    #[serde(default)]
    pub elements: Vec<LatticeElement>,
}

impl LatticeDocument {
    pub fn new(name: impl Into<String>, header: Properties, elements: Vec<LatticeElement>) -> Self {
        Self {
            name: name.into(),
            header,
            elements,
        }
    }

    /// Loads a lattice snapshot from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the TOML snapshot.
    ///
    /// # Return
    ///
    /// Returns the parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeLoadError::Io`] if the file cannot be read, or
    /// [`LatticeLoadError::Toml`] if its content is not a valid snapshot.
    pub fn load(path: &Path) -> Result<Self, LatticeLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LatticeLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| LatticeLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Parses a lattice snapshot from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a valid snapshot.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, index: usize) -> Option<&LatticeElement> {
        self.elements.get(index)
    }

    /// Header keys every element inherits.
    pub fn shared_keys(&self) -> BTreeSet<String> {
        self.header
            .keys()
            .filter(|k| !RESERVED_HEADER_KEYS.contains(&k.as_str()))
            .cloned()
            .collect()
    }

    /// The merged configuration of element `index`: header defaults overlaid with
    /// the element's own properties.
    ///
    /// # Arguments
    ///
    /// * `index` - The position of the element in the beamline.
    ///
    /// # Return
    ///
    /// Returns the merged element, or `None` if `index` is out of range. The
    /// reserved header keys (`name`, `elements`) are never included.
    pub fn element_conf(&self, index: usize) -> Option<LatticeElement> {
        let element = self.elements.get(index)?;
        let mut properties: Properties = self
            .header
            .iter()
            .filter(|(k, _)| !RESERVED_HEADER_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        properties.extend(element.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(LatticeElement {
            name: element.name.clone(),
            element_type: element.element_type.clone(),
            properties,
        })
    }

    /// Overlays `patch` onto the own properties of element `index`.
    ///
    /// Keys already present are replaced, new keys are added and keys missing from
    /// `patch` are kept.
    ///
    /// # Arguments
    ///
    /// * `index` - The position of the element to update.
    /// * `patch` - The properties to write.
    ///
    /// # Return
    ///
    /// Returns `false` when the index is out of range, leaving the document unchanged.
    pub fn set_properties(&mut self, index: usize, patch: &Properties) -> bool {
        match self.elements.get_mut(index) {
            Some(element) => {
                element
                    .properties
                    .extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
                true
            }
            None => false,
        }
    }

    /// Inserts `element` before position `index`.
    ///
    /// # Arguments
    ///
    /// * `index` - The position the new element will occupy. An index past the end
    ///   appends the element.
    /// * `element` - The element to insert, with its own (non-header) properties.
    pub fn insert(&mut self, index: usize, element: LatticeElement) {
        let index = index.min(self.elements.len());
        self.elements.insert(index, element);
    }

    /// Unique element names, in order of first appearance.
    pub fn all_names(&self) -> Vec<String> {
        unique(self.elements.iter().map(|e| e.name.as_str()))
    }

    /// Unique element types, in order of first appearance.
    pub fn all_types(&self) -> Vec<String> {
        unique(self.elements.iter().map(|e| e.element_type.as_str()))
    }

    pub fn indices_by_name(&self, name: &str) -> Vec<usize> {
        self.positions(|e| e.name == name)
    }

    pub fn indices_by_type(&self, element_type: &str) -> Vec<usize> {
        self.positions(|e| e.element_type == element_type)
    }

    /// Position of the first element called `name`.
    pub fn first_index_of(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    /// Names of all elements whose name contains a match of `pattern` (regex search
    /// semantics, not a full match). Repeated names are reported once per element.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn names_by_pattern(&self, pattern: &str) -> Result<Vec<String>, LookupError> {
        let re = compile(pattern)?;
        Ok(self
            .elements
            .iter()
            .filter(|e| re.is_match(&e.name))
            .map(|e| e.name.clone())
            .collect())
    }

    /// Resolves a selector to element indices.
    ///
    /// # Arguments
    ///
    /// * `selector` - An index, or a token matched against both element names and
    ///   element types.
    ///
    /// # Return
    ///
    /// Returns the matching indices in ascending order. A token yields the union of
    /// its name and type matches; an out-of-range index yields nothing.
    pub fn select(&self, selector: &ElementSelector) -> Vec<usize> {
        match selector {
            ElementSelector::Index(i) if *i < self.len() => vec![*i],
            ElementSelector::Index(_) => Vec::new(),
            ElementSelector::Token(token) => {
                self.positions(|e| e.name == *token || e.element_type == *token)
            }
        }
    }

    /// Finds elements matching every supplied filter.
    ///
    /// The first supplied filter seeds the candidate set and each further supplied
    /// filter intersects it. With no filters at all the result is empty. Unknown
    /// names, types or out-of-range indices simply match nothing. Each record
    /// carries the element's effective (non-shared) properties.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidPattern`] if the name pattern is not a valid regex.
    pub fn lookup(&self, filter: &ElementFilter) -> Result<Vec<ElementRecord>, LookupError> {
        let mut candidates: Option<BTreeSet<usize>> = None;
        let mut narrow = |found: BTreeSet<usize>| {
            candidates = Some(match candidates.take() {
                None => found,
                Some(current) => current.intersection(&found).copied().collect(),
            });
        };

        if let Some(indices) = &filter.indices {
            narrow(indices.iter().copied().filter(|i| *i < self.len()).collect());
        }
        if let Some(names) = &filter.names {
            narrow(names.iter().flat_map(|n| self.indices_by_name(n)).collect());
        }
        if let Some(types) = &filter.types {
            narrow(types.iter().flat_map(|t| self.indices_by_type(t)).collect());
        }
        if let Some(pattern) = &filter.pattern {
            let re = compile(pattern)?;
            narrow(self.positions(|e| re.is_match(&e.name)).into_iter().collect());
        }

        let shared = self.shared_keys();
        let records: Vec<ElementRecord> = candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|i| {
                let conf = self.element_conf(i)?;
                let keys = effective_property_keys(&conf, &shared);
                Some(ElementRecord {
                    index: i,
                    properties: conf.subset(&keys),
                    name: conf.name,
                    element_type: conf.element_type,
                })
            })
            .collect();
        debug!(matches = records.len(), "Element lookup finished.");
        Ok(records)
    }

    /// Element-type census, sorted ascending by count (ties by type name).
    pub fn type_counts(&self) -> Vec<TypeCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for element in &self.elements {
            *counts.entry(element.element_type.as_str()).or_default() += 1;
        }
        let total = self.len() as f64;
        let mut table: Vec<TypeCount> = counts
            .into_iter()
            .map(|(t, n)| TypeCount {
                element_type: t.to_string(),
                count: n,
                fraction: n as f64 / total,
            })
            .collect();
        table.sort_by_key(|row| row.count);
        table
    }

    fn positions(&self, predicate: impl Fn(&LatticeElement) -> bool) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| predicate(e))
            .map(|(i, _)| i)
            .collect()
    }
}

fn compile(pattern: &str) -> Result<Regex, LookupError> {
    Regex::new(pattern).map_err(|e| LookupError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .filter(|item| seen.insert(*item))
        .map(str::to_string)
        .collect()
}
