//! Normalisation of the source ranges engines attach to issues.
//!
//! Engines describe where an issue lives either as a line range or as a pair
//! of positions. A position carries a line directly or a character offset
//! that has to be resolved against the source text. [`LocationDescription`]
//! turns either shape into a canonical range such as `3` or `3-5`.

use std::fmt;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

/// Rejection reasons for malformed location descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    /// Neither `lines` nor `positions` was given.
    #[error("location must contain either 'lines' or 'positions'")]
    MissingRange,
    /// Both `lines` and `positions` were given.
    #[error("location must not contain both 'lines' and 'positions'")]
    AmbiguousRange,
    /// A position had neither `line` nor `offset`.
    #[error("position must contain either 'line' or 'offset'")]
    MissingCoordinate,
}

/// Resolves character offsets to 1-based `(line, column)` pairs.
pub trait SourceBuffer {
    /// Returns the line and column containing `offset`.
    fn decompose_position(&self, offset: usize) -> (usize, usize);
}

/// In-memory source text with a precomputed table of line starts.
///
/// Offsets count characters, not bytes. Offsets past the end of the text
/// resolve to the last line.
///
/// ```
/// use gauntlet_engines::{SourceBuffer, SourceText};
///
/// let source = SourceText::new("fn main() {\n    run();\n}\n");
/// assert_eq!(source.decompose_position(0), (1, 1));
/// assert_eq!(source.decompose_position(16), (2, 5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    line_starts: Vec<usize>,
    char_count: usize,
}

impl SourceText {
    /// Indexes `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut char_count = 0;
        for (index, ch) in text.chars().enumerate() {
            if ch == '\n' {
                line_starts.push(index + 1);
            }
            char_count = index + 1;
        }
        Self {
            line_starts,
            char_count,
        }
    }

    /// Number of lines, counting a trailing empty line after a final newline.
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

impl SourceBuffer for SourceText {
    fn decompose_position(&self, offset: usize) -> (usize, usize) {
        let clamped = offset.min(self.char_count);
        let line = self
            .line_starts
            .partition_point(|start| *start <= clamped)
            .max(1);
        let line_start = self.line_starts.get(line - 1).copied().unwrap_or_default();
        (line, clamped - line_start + 1)
    }
}

/// One end of a position range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPosition")]
pub enum Position {
    /// A line given directly, optionally with a column.
    Line {
        /// 1-based line.
        line: usize,
        /// 1-based column, if given.
        column: Option<usize>,
    },
    /// A character offset into the source.
    Offset(usize),
}

impl Position {
    /// Resolves this position to a line number.
    #[must_use]
    pub fn line<B: SourceBuffer + ?Sized>(self, source: &B) -> usize {
        match self {
            Self::Line { line, .. } => line,
            Self::Offset(offset) => source.decompose_position(offset).0,
        }
    }
}

#[derive(Deserialize)]
struct RawPosition {
    line: Option<usize>,
    column: Option<usize>,
    offset: Option<usize>,
}

impl TryFrom<RawPosition> for Position {
    type Error = LocationError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        match (raw.line, raw.offset) {
            (Some(line), _) => Ok(Self::Line {
                line,
                column: raw.column,
            }),
            (None, Some(offset)) => Ok(Self::Offset(offset)),
            (None, None) => Err(LocationError::MissingCoordinate),
        }
    }
}

/// The range an engine attached to an issue.
///
/// Deserialises from `{"lines": {"begin": n, "end": n}}` or
/// `{"positions": {"begin": P, "end": P}}`; any other shape is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub enum LocationDescriptor {
    /// Explicit line numbers.
    Lines {
        /// First line.
        begin: usize,
        /// Last line.
        end: usize,
    },
    /// Positions that may need offset resolution.
    Positions {
        /// Start of the range.
        begin: Position,
        /// End of the range.
        end: Position,
    },
}

#[derive(Deserialize)]
struct LineRange {
    begin: usize,
    end: usize,
}

#[derive(Deserialize)]
struct PositionRange {
    begin: Position,
    end: Position,
}

#[derive(Deserialize)]
struct RawDescriptor {
    lines: Option<LineRange>,
    positions: Option<PositionRange>,
}

impl TryFrom<RawDescriptor> for LocationDescriptor {
    type Error = LocationError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        match (raw.lines, raw.positions) {
            (Some(lines), None) => Ok(Self::Lines {
                begin: lines.begin,
                end: lines.end,
            }),
            (None, Some(positions)) => Ok(Self::Positions {
                begin: positions.begin,
                end: positions.end,
            }),
            (Some(_), Some(_)) => Err(LocationError::AmbiguousRange),
            (None, None) => Err(LocationError::MissingRange),
        }
    }
}

impl LocationDescriptor {
    /// Resolves the descriptor to `(begin, end)` line numbers.
    #[must_use]
    pub fn line_range<B: SourceBuffer + ?Sized>(&self, source: &B) -> (usize, usize) {
        match *self {
            Self::Lines { begin, end } => (begin, end),
            Self::Positions { begin, end } => (begin.line(source), end.line(source)),
        }
    }

    /// Renders the line range as `begin` or `begin-end`.
    #[must_use]
    pub fn render<B: SourceBuffer + ?Sized>(&self, source: &B) -> String {
        let (begin, end) = self.line_range(source);
        if begin == end {
            begin.to_string()
        } else {
            format!("{begin}-{end}")
        }
    }
}

/// Lazily rendered, cached description of an issue location.
///
/// The suffix is appended only when there is a range to describe.
///
/// ```
/// use gauntlet_engines::{LocationDescription, LocationDescriptor, SourceText};
///
/// let descriptor: LocationDescriptor =
///     serde_json::from_str(r#"{"lines":{"begin":3,"end":5}}"#).expect("valid");
/// let source = SourceText::new("");
/// let description = LocationDescription::new(&source, Some(descriptor), ": ");
/// assert_eq!(description.to_string(), "3-5: ");
/// ```
#[derive(Debug)]
pub struct LocationDescription<'a, B: ?Sized> {
    source: &'a B,
    descriptor: Option<LocationDescriptor>,
    suffix: String,
    rendered: OnceLock<String>,
}

impl<'a, B: SourceBuffer + ?Sized> LocationDescription<'a, B> {
    /// Describes `descriptor` against `source`. `None` describes an issue
    /// with no range, which renders empty.
    #[must_use]
    pub fn new(
        source: &'a B,
        descriptor: Option<LocationDescriptor>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            source,
            descriptor,
            suffix: suffix.into(),
            rendered: OnceLock::new(),
        }
    }

    /// Rendered range without the suffix; empty when there is no range.
    #[must_use]
    pub fn lines(&self) -> &str {
        self.rendered.get_or_init(|| {
            self.descriptor
                .map(|descriptor| descriptor.render(self.source))
                .unwrap_or_default()
        })
    }
}

impl<B: SourceBuffer + ?Sized> fmt::Display for LocationDescription<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.lines();
        if lines.trim().is_empty() {
            return Ok(());
        }
        write!(f, "{lines}{}", self.suffix)
    }
}

#[cfg(test)]
mod tests;
