//! Line-level helpers for the lattice text format.

/// Positions of the structural markers within the code part of one line.
///
/// Markers inside double-quoted strings are ignored, so a `#` or `;` inside a
/// file path never splits a statement. The code part ends at the first unquoted
/// `#`; markers in the trailing comment are not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineMarks {
    /// Start of the trailing comment, or the line length when there is none.
    pub comment: usize,
    /// First `: ` (declaration separator).
    pub colon: Option<usize>,
    pub semicolon: Option<usize>,
    pub equals: Option<usize>,
}

impl LineMarks {
    pub fn scan(line: &str) -> Self {
        let mut marks = LineMarks {
            comment: line.len(),
            colon: None,
            semicolon: None,
            equals: None,
        };
        let bytes = line.as_bytes();
        let mut in_string = false;
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'"' {
                in_string = !in_string;
                continue;
            }
            if in_string {
                continue;
            }
            match b {
                b'#' => {
                    marks.comment = i;
                    break;
                }
                b':' if bytes.get(i + 1) == Some(&b' ') => {
                    marks.colon.get_or_insert(i);
                }
                b';' => {
                    marks.semicolon.get_or_insert(i);
                }
                b'=' => {
                    marks.equals.get_or_insert(i);
                }
                _ => {}
            }
        }
        marks
    }

    /// `key = value` form: an `=` with no declaration separator before it.
    pub fn is_assignment(&self) -> bool {
        match (self.equals, self.colon) {
            (Some(_), None) => true,
            (Some(eq), Some(colon)) => eq < colon,
            (None, _) => false,
        }
    }

    /// `name: type, ...` form.
    pub fn is_declaration(&self) -> bool {
        self.colon.is_some() && !self.is_assignment()
    }

    pub fn is_terminated(&self) -> bool {
        self.semicolon.is_some()
    }
}

/// `true` for blank lines and lines whose first non-blank character starts a comment.
pub(crate) fn is_passive(line: &str) -> bool {
    let trimmed = line.trim_start_matches(' ');
    trimmed.trim().is_empty() || trimmed.starts_with('#')
}

/// Text before `end` with every space removed, e.g. the key of an assignment.
pub(crate) fn squeezed(line: &str, end: usize) -> String {
    line[..end].chars().filter(|c| *c != ' ').collect()
}
