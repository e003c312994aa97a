use super::format::{LineMarks, is_passive, squeezed};
use super::traits::LatticeRender;
use crate::core::models::beam::StateAccessError;
use crate::core::models::element::{LatticeElement, declaration_keys};
use crate::core::models::lattice::LatticeDocument;
use crate::core::models::value::{Value, write_list};
use std::collections::HashSet;
use std::io;
use thiserror::Error;
use tracing::{debug, instrument};

/// Key whose assignment is always passed through untouched in patch mode.
const PRESERVED_KEY: &str = "Eng_Data_Dir";

#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: io::Error,
    },
    #[error("Failed to write lattice output: {0}")]
    Write(#[from] io::Error),
    #[error("Lattice has no source element")]
    MissingSource,
    #[error("Element at index {index} cannot be resolved")]
    UnresolvedElement { index: usize },
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: LatticeParseErrorKind,
    },
    #[error("Failed to encode beam state: {0}")]
    State(#[from] StateAccessError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LatticeParseErrorKind {
    #[error("Statement '{key}' is never terminated by ';'")]
    UnterminatedStatement { key: String },
}

fn format_fmt_error(_: std::fmt::Error) -> LatticeError {
    LatticeError::Write(io::Error::other("formatting failed"))
}

/// Renders `key = value` with lattice literal syntax.
fn assignment(key: &str, value: &Value) -> String {
    format!("{key} = {value}")
}

/// Renders `name: type, k1 = v1, ...` for the keys of `conf` that `reference`
/// does not already define.
fn declaration(conf: &LatticeElement, reference: &LatticeElement) -> String {
    let mut line = format!("{}: {}", conf.name, conf.element_type);
    for key in declaration_keys(conf, &reference.properties) {
        if let Some(value) = conf.get(&key) {
            line.push_str(", ");
            line.push_str(&assignment(&key, value));
        }
    }
    line
}

/// A lattice generated from scratch.
///
/// The header assignments take their values from `source`, the merged
/// configuration of the source element (with any beam state already encoded
/// into it). Elements of `section` are declared once per name, in order, and
/// the beamline lists every element of `section`.
#[derive(Debug, Clone)]
pub struct FreshLattice<'a> {
    pub document: &'a LatticeDocument,
    pub source: &'a LatticeElement,
    pub section: Vec<usize>,
}

impl LatticeRender for FreshLattice<'_> {
    type Error = LatticeError;

    #[instrument(skip_all, name = "render_fresh_lattice", fields(elements = self.section.len()))]
    fn render(&self) -> Result<String, Self::Error> {
        let doc = self.document;
        let mut lines = Vec::with_capacity(doc.header.len() + self.section.len() + 2);

        for key in doc.shared_keys() {
            let value = self.source.get(&key).or_else(|| doc.header.get(&key));
            if let Some(value) = value {
                lines.push(format!("{};", assignment(&key, value)));
            }
        }

        let mut declared = HashSet::new();
        let mut members = Vec::with_capacity(self.section.len());
        for &index in &self.section {
            let conf = doc
                .element_conf(index)
                .ok_or(LatticeError::UnresolvedElement { index })?;
            if declared.insert(conf.name.clone()) {
                lines.push(format!("{};", declaration(&conf, self.source)));
            }
            members.push(conf.name);
        }

        lines.push(format!("{}: LINE = ({});", doc.name, members.join(", ")));
        lines.push(format!("USE: {};", doc.name));

        let mut text = lines.join("\n");
        text.push('\n');
        debug!(lines = lines.len(), "Rendered fresh lattice.");
        Ok(text)
    }
}

/// An existing lattice text with its live values patched in.
///
/// Assignments of known keys and declarations of known elements are regenerated
/// from the current configuration; everything else (comments, blank lines,
/// unknown statements, `Eng_Data_Dir`) passes through byte-identical. A
/// regenerated statement keeps the original trailing comment and line ending.
/// A statement spanning several lines is handled as one block: a regenerated
/// one drops its continuation lines, a verbatim one keeps them untouched.
#[derive(Debug, Clone)]
pub struct PatchedLattice<'a> {
    pub original: &'a str,
    pub document: &'a LatticeDocument,
    pub source: &'a LatticeElement,
}

impl PatchedLattice<'_> {
    fn is_variable_field(key: &str, variable: Option<&str>) -> bool {
        variable
            .and_then(|v| key.strip_prefix(v))
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }

    fn rewrite_assignment(&self, key: &str) -> Result<Option<String>, LatticeError> {
        let Some(value) = self.source.get(key) else {
            return Ok(None);
        };
        if key == PRESERVED_KEY {
            return Ok(None);
        }
        if Self::is_variable_field(key, self.source.matrix_variable()) {
            if let Value::Array(values) = value {
                return matrix_block(key, values).map(Some);
            }
        }
        // Vector fields and plain keys both render as `key = value`.
        Ok(Some(assignment(key, value)))
    }

    fn rewrite_declaration(&self, name: &str, names: &HashSet<String>) -> Option<String> {
        if !names.contains(name) {
            return None;
        }
        let index = self.document.first_index_of(name)?;
        let conf = self.document.element_conf(index)?;
        Some(declaration(&conf, self.source))
    }
}

/// Splits a raw line into its content and its `\n` or `\r\n` terminator.
fn split_ending(raw: &str) -> (&str, &str) {
    let line = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw);
    (line, &raw[line.len()..])
}

/// Renders a flattened tensor as a bracketed block with 7 values per row.
fn matrix_block(key: &str, values: &[f64]) -> Result<String, LatticeError> {
    let mut block = format!("{key} = [\n");
    for (r, row) in values.chunks(7).enumerate() {
        if r > 0 {
            block.push_str(",\n");
        }
        block.push_str("    ");
        let mut rendered = String::new();
        write_list(&mut rendered, row).map_err(format_fmt_error)?;
        block.push_str(&rendered[1..rendered.len() - 1]);
    }
    block.push(']');
    Ok(block)
}

impl LatticeRender for PatchedLattice<'_> {
    type Error = LatticeError;

    #[instrument(skip_all, name = "render_patched_lattice")]
    fn render(&self) -> Result<String, Self::Error> {
        let names: HashSet<String> = self.document.all_names().into_iter().collect();
        let lines: Vec<&str> = self.original.split_inclusive('\n').collect();
        let mut out = String::with_capacity(self.original.len());
        let mut rewritten = 0usize;

        let mut n = 0;
        while n < lines.len() {
            let raw = lines[n];
            let (line, ending) = split_ending(raw);
            n += 1;

            if is_passive(line) {
                out.push_str(raw);
                continue;
            }

            let marks = LineMarks::scan(line);
            let (key, replacement) = if marks.is_assignment() {
                let eq = marks.equals.unwrap_or(0);
                let key = squeezed(line, eq);
                let replacement = self.rewrite_assignment(&key)?;
                (key, replacement)
            } else if let Some(colon) = marks.colon.filter(|_| marks.is_declaration()) {
                let name = squeezed(line, colon);
                let replacement = self.rewrite_declaration(&name, &names);
                (name, replacement)
            } else {
                (String::new(), None)
            };

            let Some(replacement) = replacement else {
                out.push_str(raw);
                if !marks.is_terminated() {
                    // Continuation lines belong to this statement; copy them as they are.
                    while let Some(next) = lines.get(n) {
                        n += 1;
                        out.push_str(next);
                        if LineMarks::scan(split_ending(next).0).is_terminated() {
                            break;
                        }
                    }
                }
                continue;
            };

            rewritten += 1;
            out.push_str(&replacement);
            out.push(';');
            let comment = &line[marks.comment..];
            if !comment.is_empty() {
                out.push(' ');
                out.push_str(comment);
            }

            let mut ending = ending;
            if !marks.is_terminated() {
                let start_line = n;
                loop {
                    let Some(next) = lines.get(n) else {
                        return Err(LatticeError::Parse {
                            line: start_line,
                            kind: LatticeParseErrorKind::UnterminatedStatement { key },
                        });
                    };
                    n += 1;
                    let (next_line, next_ending) = split_ending(next);
                    if LineMarks::scan(next_line).is_terminated() {
                        ending = next_ending;
                        break;
                    }
                }
            }
            out.push_str(ending);
        }

        debug!(rewritten, lines = lines.len(), "Patched lattice text.");
        Ok(out)
    }
}
