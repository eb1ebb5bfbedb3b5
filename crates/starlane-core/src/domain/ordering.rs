//! Drag-and-drop insertion heuristic for the group list.
//!
//! While a group slot is dragged over the list, the editor needs to know
//! where it would land if dropped right now.  The rule is purely geometric:
//! the slot is inserted before the first sibling whose vertical midpoint lies
//! below the pointer, or at the end when no sibling qualifies.
//!
//! Keeping this a pure function over plain numbers means the rule can be
//! tested without any rendering surface, and the same pointer position always
//! produces the same answer.

/// Vertical extent of one sibling slot, in the same coordinate space as the
/// pointer (for a browser: `getBoundingClientRect().top` / `.height`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotBox {
    pub top: f64,
    pub height: f64,
}

impl SlotBox {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Returns the index in `siblings` before which the dragged slot should be
/// inserted, or `siblings.len()` to append it at the end.
///
/// `siblings` must not include the slot being dragged.
///
/// The chosen sibling is the one whose midpoint is the closest one strictly
/// below `pointer_y`.  For a list laid out top to bottom that is simply the
/// first sibling below the pointer; for an unsorted list it is still
/// well-defined.  Ties go to the earlier sibling.  A non-finite pointer
/// coordinate never matches anything and so yields the end position.
///
/// # Example
///
/// ```rust
/// use starlane_core::{insertion_index, SlotBox};
///
/// let slots = [SlotBox::new(0.0, 40.0), SlotBox::new(40.0, 40.0)];
/// assert_eq!(insertion_index(10.0, &slots), 0); // above first midpoint (20)
/// assert_eq!(insertion_index(30.0, &slots), 1); // between midpoints
/// assert_eq!(insertion_index(70.0, &slots), 2); // below everything → end
/// ```
pub fn insertion_index(pointer_y: f64, siblings: &[SlotBox]) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (index, slot) in siblings.iter().enumerate() {
        // Negative offset = the sibling's midpoint is below the pointer.
        let offset = pointer_y - slot.midpoint();
        if offset < 0.0 && best.map_or(true, |(_, closest)| offset > closest) {
            best = Some((index, offset));
        }
    }
    best.map_or(siblings.len(), |(index, _)| index)
}
