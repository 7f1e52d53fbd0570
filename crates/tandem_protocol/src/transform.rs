//! Pairwise operational transform.

use crate::change::{Change, Delete, Insert};
use std::cmp::Ordering;

/// Reconciles two concurrent changes made against the same document.
///
/// Returns `(a', b')` such that applying `b` then `a'` produces the same text
/// as applying `a` then `b'`. A `Noop` on either side passes both inputs
/// through unchanged.
///
/// # Precondition
///
/// Both changes must have been computed against the same base state. This
/// cannot be detected here; violating it produces well-formed but
/// meaningless output. Offsets near `usize::MAX` saturate instead of
/// overflowing.
///
/// # Example
///
/// ```
/// use tandem_protocol::{reconcile, Change};
///
/// let x = Change::insert(0, "Z", "X");
/// let y = Change::insert(0, "Z", "Y");
///
/// let (x2, y2) = reconcile(x.clone(), y);
/// assert_eq!(x2, x);
/// assert_eq!(y2, Change::insert(1, "Z", "Y"));
/// ```
pub fn reconcile(a: Change, b: Change) -> (Change, Change) {
    match (a, b) {
        (Change::Insert(a), Change::Insert(b)) => insert_insert(a, b),
        (Change::Insert(a), Change::Delete(b)) => insert_delete(a, b),
        (Change::Delete(a), Change::Insert(b)) => {
            let (b, a) = insert_delete(b, a);
            (a, b)
        }
        (Change::Delete(a), Change::Delete(b)) => delete_delete(a, b),
        (a, b) => (a, b),
    }
}

/// The insert that sorts greater by `(position, text, from)` moves right past
/// the other one. Exact duplicates cancel each other out.
fn insert_insert(a: Insert, b: Insert) -> (Change, Change) {
    let order = a
        .position
        .cmp(&b.position)
        .then_with(|| a.text.cmp(&b.text))
        .then_with(|| a.from.cmp(&b.from));

    match order {
        Ordering::Greater => {
            let shift = b.text_len();
            (
                Change::Insert(Insert {
                    position: a.position.saturating_add(shift),
                    ..a
                }),
                Change::Insert(b),
            )
        }
        Ordering::Less => {
            let shift = a.text_len();
            (
                Change::Insert(a),
                Change::Insert(Insert {
                    position: b.position.saturating_add(shift),
                    ..b
                }),
            )
        }
        Ordering::Equal => (Change::Noop, Change::Noop),
    }
}

/// Returns `(insert', delete')`.
fn insert_delete(insert: Insert, delete: Delete) -> (Change, Change) {
    if insert.position <= delete.position {
        let shift = insert.text_len();
        return (
            Change::Insert(insert),
            Change::Delete(Delete {
                position: delete.position.saturating_add(shift),
                ..delete
            }),
        );
    }

    if insert.position >= delete.end() {
        let position = insert.position.saturating_sub(delete.amount);
        return (
            Change::Insert(Insert { position, ..insert }),
            Change::Delete(delete),
        );
    }

    // Inserted strictly inside the deleted span: the delete swallows it.
    let amount = delete.amount.saturating_add(insert.text_len());
    (Change::Noop, Change::Delete(Delete { amount, ..delete }))
}

/// Treats both deletes as half-open intervals and subtracts their overlap.
fn delete_delete(a: Delete, b: Delete) -> (Change, Change) {
    let overlap = a
        .end()
        .min(b.end())
        .saturating_sub(a.position.max(b.position));

    if overlap == 0 {
        // Zero-length deletes can sit inside the other range; saturate so
        // they stay at a valid offset.
        return if a.position > b.position {
            let position = a.position.saturating_sub(b.amount);
            (Change::Delete(Delete { position, ..a }), Change::Delete(b))
        } else {
            let position = b.position.saturating_sub(a.amount);
            (Change::Delete(a), Change::Delete(Delete { position, ..b }))
        };
    }

    if a.position <= b.position && a.end() >= b.end() {
        let amount = a.amount.saturating_sub(b.amount);
        return (Change::Delete(Delete { amount, ..a }), Change::Noop);
    }

    if a.position >= b.position && a.end() <= b.end() {
        let amount = b.amount.saturating_sub(a.amount);
        return (Change::Noop, Change::Delete(Delete { amount, ..b }));
    }

    let start = a.position.min(b.position);
    let a_amount = a.amount.saturating_sub(overlap);
    let b_amount = b.amount.saturating_sub(overlap);
    (
        Change::Delete(Delete {
            position: start,
            amount: a_amount,
            ..a
        }),
        Change::Delete(Delete {
            position: start,
            amount: b_amount,
            ..b
        }),
    )
}
