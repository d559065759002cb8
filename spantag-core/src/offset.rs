//! Offset mapper between view selections and absolute character offsets.
//!
//! A view point addresses a position the way a host surface does: which
//! projected segment it sits in and how many characters into it. The absolute
//! offset is the length of all text painted before that point, so the mapping
//! stays correct however literal and annotated segments interleave.

use crate::model::{char_slice, Entity, EntityClass, TextRange};
use crate::projection::Segment;

/// A position inside the projected view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPoint {
    pub segment: usize,
    /// Character offset inside the segment, `0..=len`
    pub offset: usize,
}

impl ViewPoint {
    pub fn new(segment: usize, offset: usize) -> Self {
        Self { segment, offset }
    }
}

/// A host selection; `anchor` may come after `focus`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSelection {
    pub anchor: ViewPoint,
    pub focus: ViewPoint,
}

impl ViewSelection {
    pub fn new(anchor: ViewPoint, focus: ViewPoint) -> Self {
        Self { anchor, focus }
    }
}

/// Absolute offset of `point`, or `None` when it lies outside the view.
pub fn point_offset(segments: &[Segment], point: ViewPoint) -> Option<usize> {
    let target = segments.get(point.segment)?;
    if point.offset > target.len() {
        return None;
    }

    let before: usize = segments[..point.segment].iter().map(Segment::len).sum();
    Some(before + point.offset)
}

/// View point for an absolute offset.
///
/// An offset on a boundary belongs to the segment that starts there; the end of
/// the text maps to the end of the last segment.
pub fn locate(segments: &[Segment], offset: usize) -> Option<ViewPoint> {
    let mut start = 0;
    for (index, segment) in segments.iter().enumerate() {
        let end = start + segment.len();
        if offset < end {
            return Some(ViewPoint::new(index, offset - start));
        }
        start = end;
    }

    match segments.last() {
        Some(last) if offset == start => Some(ViewPoint::new(segments.len() - 1, last.len())),
        _ => None,
    }
}

/// Normalized absolute range covered by `selection`.
pub fn selection_range(segments: &[Segment], selection: &ViewSelection) -> Option<TextRange> {
    let anchor = point_offset(segments, selection.anchor)?;
    let focus = point_offset(segments, selection.focus)?;
    Some(TextRange::new(anchor, focus))
}

/// Entity for a selected range of `text`, or `None` for blank selections.
pub fn entity_for_range(text: &str, range: TextRange, class: &EntityClass) -> Option<Entity> {
    if char_slice(text, range).trim().is_empty() {
        return None;
    }
    Entity::from_range(text, range, class)
}

/// Turn a host selection into a new entity under `class`.
///
/// Yields nothing when no class is active, when either end of the selection
/// escaped the view, or when the selection is empty or whitespace only.
pub fn map_selection(
    text: &str,
    segments: &[Segment],
    selection: &ViewSelection,
    class: Option<&EntityClass>,
) -> Option<Entity> {
    let class = class?;
    let range = selection_range(segments, selection)?;
    entity_for_range(text, range, class)
}
