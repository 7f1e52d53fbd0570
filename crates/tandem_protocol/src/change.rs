//! Edit operations.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// Inserts `text` before the character at `position`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Insert {
    /// Character offset in the base document.
    pub position: usize,
    /// Inserted text.
    pub text: String,
    /// Originating client.
    pub from: String,
}

impl Insert {
    /// Returns the inserted text length in characters.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Removes `amount` characters starting at `position`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delete {
    /// Character offset in the base document.
    pub position: usize,
    /// Number of characters removed.
    pub amount: usize,
    /// Originating client.
    pub from: String,
}

impl Delete {
    /// Returns the exclusive end of the deleted range.
    ///
    /// Saturates at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.position.saturating_add(self.amount)
    }
}

/// A single edit against a flat character document.
///
/// `Noop` is what a transform leaves behind when an operation has been
/// cancelled out, and it travels on the wire as `null`. The `from` field is
/// only ever a tie-break key; it carries no authority.
///
/// # Wire format
///
/// ```json
/// {"type": "insert", "position": 0, "text": "Z", "from": "client-a"}
/// {"type": "delete", "position": 2, "amount": 3, "from": "client-b"}
/// null
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<WireChange>", into = "Option<WireChange>")]
pub enum Change {
    /// Text insertion.
    Insert(Insert),
    /// Range deletion.
    Delete(Delete),
    /// No-op.
    #[default]
    Noop,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireChange {
    Insert(Insert),
    Delete(Delete),
}

impl From<Option<WireChange>> for Change {
    fn from(wire: Option<WireChange>) -> Self {
        match wire {
            Some(WireChange::Insert(insert)) => Change::Insert(insert),
            Some(WireChange::Delete(delete)) => Change::Delete(delete),
            None => Change::Noop,
        }
    }
}

impl From<Change> for Option<WireChange> {
    fn from(change: Change) -> Self {
        match change {
            Change::Insert(insert) => Some(WireChange::Insert(insert)),
            Change::Delete(delete) => Some(WireChange::Delete(delete)),
            Change::Noop => None,
        }
    }
}

impl Change {
    /// Creates an insert.
    pub fn insert(position: usize, text: impl Into<String>, from: impl Into<String>) -> Self {
        Change::Insert(Insert {
            position,
            text: text.into(),
            from: from.into(),
        })
    }

    /// Creates a delete.
    pub fn delete(position: usize, amount: usize, from: impl Into<String>) -> Self {
        Change::Delete(Delete {
            position,
            amount,
            from: from.into(),
        })
    }

    /// Returns true for the no-op.
    pub fn is_noop(&self) -> bool {
        matches!(self, Change::Noop)
    }

    /// Returns the originating client, if any.
    pub fn from(&self) -> Option<&str> {
        match self {
            Change::Insert(insert) => Some(&insert.from),
            Change::Delete(delete) => Some(&delete.from),
            Change::Noop => None,
        }
    }

    /// Returns the character offset the change applies at.
    pub fn position(&self) -> Option<usize> {
        match self {
            Change::Insert(insert) => Some(insert.position),
            Change::Delete(delete) => Some(delete.position),
            Change::Noop => None,
        }
    }

    /// Returns how many characters the change adds (positive) or removes.
    pub fn len_delta(&self) -> isize {
        match self {
            Change::Insert(insert) => insert.text_len() as isize,
            Change::Delete(delete) => -(delete.amount as isize),
            Change::Noop => 0,
        }
    }

    /// Checks that the change fits a text of `len` characters and returns
    /// the length after applying it.
    pub fn resulting_len(&self, len: usize) -> ProtocolResult<usize> {
        match self {
            Change::Insert(insert) if insert.position <= len => {
                Ok(len.saturating_add(insert.text_len()))
            }
            Change::Insert(insert) => Err(ProtocolError::PositionOutOfRange {
                position: insert.position,
                len,
            }),
            Change::Delete(delete)
                if delete.position <= len && delete.amount <= len - delete.position =>
            {
                Ok(len - delete.amount)
            }
            Change::Delete(delete) => Err(ProtocolError::RangeOutOfBounds {
                position: delete.position,
                amount: delete.amount,
                len,
            }),
            Change::Noop => Ok(len),
        }
    }

    /// Applies the change to `text` in place.
    ///
    /// Offsets count Unicode scalar values. The text is left untouched when
    /// the change does not fit.
    pub fn apply(&self, text: &mut String) -> ProtocolResult<()> {
        match self {
            Change::Insert(insert) => {
                let at = byte_offset(text, insert.position).ok_or_else(|| {
                    ProtocolError::PositionOutOfRange {
                        position: insert.position,
                        len: text.chars().count(),
                    }
                })?;
                text.insert_str(at, &insert.text);
            }
            Change::Delete(delete) => {
                let out_of_bounds = || ProtocolError::RangeOutOfBounds {
                    position: delete.position,
                    amount: delete.amount,
                    len: text.chars().count(),
                };
                let start = byte_offset(text, delete.position).ok_or_else(out_of_bounds)?;
                let end = byte_offset(text, delete.end()).ok_or_else(out_of_bounds)?;
                text.replace_range(start..end, "");
            }
            Change::Noop => {}
        }
        Ok(())
    }
}

/// Applies `changes` to `text` in order.
///
/// Stops at the first change that does not fit; changes before it stay
/// applied.
pub fn apply_all<'a>(
    text: &mut String,
    changes: impl IntoIterator<Item = &'a Change>,
) -> ProtocolResult<()> {
    for change in changes {
        change.apply(text)?;
    }
    Ok(())
}

/// Maps a character offset to a byte offset; `None` when past the end.
fn byte_offset(text: &str, position: usize) -> Option<usize> {
    text.char_indices()
        .map(|(at, _)| at)
        .chain(std::iter::once(text.len()))
        .nth(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format() {
        let insert = Change::insert(0, "Z", "x");
        assert_eq!(
            serde_json::to_value(&insert).unwrap(),
            json!({"type": "insert", "position": 0, "text": "Z", "from": "x"})
        );

        let delete = Change::delete(2, 3, "y");
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            json!({"type": "delete", "position": 2, "amount": 3, "from": "y"})
        );

        assert_eq!(serde_json::to_value(Change::Noop).unwrap(), json!(null));
    }

    #[test]
    fn decode_from_wire() {
        let changes: Vec<Change> = serde_json::from_value(json!([
            {"type": "delete", "position": 1, "amount": 2, "from": "a"},
            null,
            {"type": "insert", "position": 4, "text": "hi", "from": "b"}
        ]))
        .unwrap();

        assert_eq!(
            changes,
            vec![
                Change::delete(1, 2, "a"),
                Change::Noop,
                Change::insert(4, "hi", "b"),
            ]
        );
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let result: Result<Change, _> =
            serde_json::from_value(json!({"type": "replace", "position": 0, "from": "a"}));
        assert!(result.is_err());
    }

    #[test]
    fn apply_insert_and_delete() {
        let mut text = String::from("abc");

        Change::insert(1, "XY", "a").apply(&mut text).unwrap();
        assert_eq!(text, "aXYbc");

        Change::delete(0, 2, "a").apply(&mut text).unwrap();
        assert_eq!(text, "Ybc");

        Change::insert(3, "!", "a").apply(&mut text).unwrap();
        assert_eq!(text, "Ybc!");

        Change::Noop.apply(&mut text).unwrap();
        assert_eq!(text, "Ybc!");
    }

    #[test]
    fn apply_counts_characters_not_bytes() {
        let mut text = String::from("héllo");
        Change::delete(1, 1, "a").apply(&mut text).unwrap();
        assert_eq!(text, "hllo");

        Change::insert(1, "é", "a").apply(&mut text).unwrap();
        assert_eq!(text, "héllo");
    }

    #[test]
    fn apply_out_of_range() {
        let mut text = String::from("abc");

        let err = Change::insert(4, "x", "a").apply(&mut text).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PositionOutOfRange { position: 4, len: 3 }
        ));

        let err = Change::delete(2, 2, "a").apply(&mut text).unwrap_err();
        assert!(matches!(err, ProtocolError::RangeOutOfBounds { .. }));
        assert_eq!(text, "abc");
    }

    #[test]
    fn resulting_len_checks_bounds() {
        assert_eq!(Change::insert(3, "é!", "a").resulting_len(3).unwrap(), 5);
        assert_eq!(Change::delete(1, 2, "a").resulting_len(3).unwrap(), 1);
        assert_eq!(Change::Noop.resulting_len(0).unwrap(), 0);

        assert!(matches!(
            Change::insert(4, "x", "a").resulting_len(3),
            Err(ProtocolError::PositionOutOfRange { position: 4, len: 3 })
        ));
        assert!(matches!(
            Change::delete(usize::MAX - 1, 5, "a").resulting_len(3),
            Err(ProtocolError::RangeOutOfBounds { .. })
        ));
        assert!(Change::delete(2, usize::MAX, "a").resulting_len(3).is_err());
    }

    #[test]
    fn apply_all_in_order() {
        let mut text = String::from("hello");
        apply_all(
            &mut text,
            &[
                Change::delete(0, 1, "a"),
                Change::insert(0, "J", "a"),
                Change::insert(5, "!", "b"),
            ],
        )
        .unwrap();
        assert_eq!(text, "Jello!");
    }

    #[test]
    fn accessors() {
        let insert = Change::insert(3, "abc", "x");
        assert_eq!(insert.from(), Some("x"));
        assert_eq!(insert.position(), Some(3));
        assert_eq!(insert.len_delta(), 3);

        let delete = Change::delete(1, 4, "y");
        assert_eq!(delete.len_delta(), -4);

        assert!(Change::Noop.is_noop());
        assert_eq!(Change::Noop.from(), None);
        assert_eq!(Change::default(), Change::Noop);
    }
}
