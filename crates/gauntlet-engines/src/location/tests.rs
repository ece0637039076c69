//! Unit tests for location descriptors and their rendering.

use std::cell::Cell;

use rstest::{fixture, rstest};

use super::*;

/// Counts offset lookups and maps offsets to lines in blocks of ten.
#[derive(Default)]
struct CountingBuffer {
    lookups: Cell<usize>,
}

impl SourceBuffer for CountingBuffer {
    fn decompose_position(&self, offset: usize) -> (usize, usize) {
        self.lookups.set(self.lookups.get() + 1);
        (offset.div_euclid(10) + 1, offset.rem_euclid(10) + 1)
    }
}

fn descriptor(json: &str) -> LocationDescriptor {
    serde_json::from_str(json).expect("valid descriptor")
}

#[fixture]
fn source() -> SourceText {
    // Lines start at offsets 0, 6, 12, 18, 24 and 30; offset 36 opens an empty seventh line.
    SourceText::new("line1\nline2\nline3\nline4\nline5\nline6\n")
}

// ---------------------------------------------------------------------------
// Source text
// ---------------------------------------------------------------------------

#[rstest]
#[case::start(0, (1, 1))]
#[case::end_of_first_line(5, (1, 6))]
#[case::second_line(6, (2, 1))]
#[case::inside_third(14, (3, 3))]
#[case::past_end(1_000, (7, 1))]
fn decomposes_offsets(source: SourceText, #[case] offset: usize, #[case] expected: (usize, usize)) {
    assert_eq!(source.decompose_position(offset), expected);
}

#[test]
fn offsets_count_characters() {
    let source = SourceText::new("é\nb");
    assert_eq!(source.decompose_position(2), (2, 1));
    assert_eq!(source.line_count(), 2);
}

#[test]
fn empty_text_has_one_line() {
    let source = SourceText::new("");
    assert_eq!(source.decompose_position(5), (1, 1));
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[rstest]
#[case::single_line(r#"{"lines":{"begin":3,"end":3}}"#, "3")]
#[case::line_range(r#"{"lines":{"begin":3,"end":5}}"#, "3-5")]
#[case::explicit_positions(
    r#"{"positions":{"begin":{"line":4,"column":2},"end":{"line":4,"column":9}}}"#,
    "4"
)]
#[case::offsets(r#"{"positions":{"begin":{"offset":10},"end":{"offset":28}}}"#, "2-5")]
#[case::mixed(r#"{"positions":{"begin":{"line":1},"end":{"offset":13}}}"#, "1-3")]
fn renders_ranges(source: SourceText, #[case] json: &str, #[case] expected: &str) {
    let description = LocationDescription::new(&source, Some(descriptor(json)), "");
    assert_eq!(description.to_string(), expected);
}

#[test]
fn offsets_resolve_through_the_buffer() {
    let buffer = CountingBuffer::default();
    let positions = descriptor(r#"{"positions":{"begin":{"offset":10},"end":{"offset":50}}}"#);
    assert_eq!(positions.render(&buffer), "2-6");
    assert_eq!(buffer.lookups.get(), 2);
}

#[test]
fn line_takes_precedence_over_offset() {
    let buffer = CountingBuffer::default();
    let positions = descriptor(
        r#"{"positions":{"begin":{"line":7,"offset":0},"end":{"line":7,"offset":99}}}"#,
    );
    assert_eq!(positions.render(&buffer), "7");
    assert_eq!(buffer.lookups.get(), 0);
}

#[rstest]
fn suffix_follows_a_range(source: SourceText) {
    let description = LocationDescription::new(
        &source,
        Some(descriptor(r#"{"lines":{"begin":2,"end":2}}"#)),
        " (structure)",
    );
    assert_eq!(description.to_string(), "2 (structure)");
}

#[rstest]
fn missing_range_never_gets_a_suffix(source: SourceText) {
    let description = LocationDescription::new(&source, None, " (structure)");
    assert_eq!(description.lines(), "");
    assert_eq!(description.to_string(), "");
}

#[test]
fn rendering_is_cached() {
    let buffer = CountingBuffer::default();
    let description = LocationDescription::new(
        &buffer,
        Some(descriptor(r#"{"positions":{"begin":{"offset":0},"end":{"offset":25}}}"#)),
        "",
    );
    let first = description.to_string();
    let second = description.to_string();
    assert_eq!(first, "1-3");
    assert_eq!(first, second);
    assert_eq!(buffer.lookups.get(), 2);
}

// ---------------------------------------------------------------------------
// Rejected shapes
// ---------------------------------------------------------------------------

#[rstest]
#[case::empty("{}", "either 'lines' or 'positions'")]
#[case::both(
    r#"{"lines":{"begin":1,"end":1},"positions":{"begin":{"line":1},"end":{"line":1}}}"#,
    "not contain both"
)]
#[case::bare_position(
    r#"{"positions":{"begin":{"column":3},"end":{"line":1}}}"#,
    "either 'line' or 'offset'"
)]
fn rejects_other_shapes(#[case] json: &str, #[case] expected: &str) {
    let err = serde_json::from_str::<LocationDescriptor>(json).expect_err("shape should be rejected");
    let message = err.to_string();
    assert!(
        message.contains(expected),
        "expected '{expected}' in message: {message}"
    );
}
