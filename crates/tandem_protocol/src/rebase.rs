//! Reconciliation of pending queues.

use crate::change::Change;
use crate::transform::reconcile;

/// The incoming and outgoing queues after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rebased {
    /// Remote changes, rebased to apply on top of the local outgoing changes.
    pub incoming: Vec<Change>,
    /// Local changes, rebased to apply on top of the remote incoming changes.
    pub outgoing: Vec<Change>,
}

/// Rebases the `incoming` and `outgoing` queues against each other.
///
/// Incoming changes are folded one at a time, in order, through the whole
/// outgoing queue. Each step calls `reconcile(outgoing[i], carried)`: the
/// first output replaces `outgoing[i]` and the second is carried on to
/// `outgoing[i + 1]`. The next incoming change then sees the outgoing queue
/// as already rewritten by every incoming change before it.
///
/// Both outputs keep the length and order of their inputs.
///
/// # Example
///
/// ```
/// use tandem_protocol::{reconcile_against, Change};
///
/// let incoming = vec![Change::insert(0, "Q", "Y")];
/// let outgoing = vec![Change::insert(0, "Z", "X")];
///
/// let rebased = reconcile_against(&incoming, &outgoing);
/// assert_eq!(rebased.incoming, incoming);
/// assert_eq!(rebased.outgoing, vec![Change::insert(1, "Z", "X")]);
/// ```
pub fn reconcile_against(incoming: &[Change], outgoing: &[Change]) -> Rebased {
    let mut outgoing = outgoing.to_vec();

    let incoming = incoming
        .iter()
        .map(|change| {
            outgoing.iter_mut().fold(change.clone(), |carried, slot| {
                let (rebased_outgoing, rebased_incoming) =
                    reconcile(std::mem::take(slot), carried);
                *slot = rebased_outgoing;
                rebased_incoming
            })
        })
        .collect();

    Rebased { incoming, outgoing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::apply_all;

    fn converges(base: &str, incoming: &[Change], outgoing: &[Change]) -> String {
        let rebased = reconcile_against(incoming, outgoing);

        let mut local = base.to_string();
        apply_all(&mut local, outgoing).unwrap();
        apply_all(&mut local, &rebased.incoming).unwrap();

        let mut remote = base.to_string();
        apply_all(&mut remote, incoming).unwrap();
        apply_all(&mut remote, &rebased.outgoing).unwrap();

        assert_eq!(local, remote);
        local
    }

    #[test]
    fn empty_queues() {
        let rebased = reconcile_against(&[], &[]);
        assert!(rebased.incoming.is_empty());
        assert!(rebased.outgoing.is_empty());

        let only_incoming = vec![Change::insert(0, "a", "x")];
        let rebased = reconcile_against(&only_incoming, &[]);
        assert_eq!(rebased.incoming, only_incoming);
        assert!(rebased.outgoing.is_empty());

        let only_outgoing = vec![Change::delete(0, 1, "x")];
        let rebased = reconcile_against(&[], &only_outgoing);
        assert!(rebased.incoming.is_empty());
        assert_eq!(rebased.outgoing, only_outgoing);
    }

    #[test]
    fn preserves_length_and_order() {
        let incoming = vec![
            Change::insert(0, "a", "r"),
            Change::Noop,
            Change::delete(0, 1, "r"),
        ];
        let outgoing = vec![Change::insert(2, "xy", "l"), Change::delete(1, 1, "l")];

        let rebased = reconcile_against(&incoming, &outgoing);
        assert_eq!(rebased.incoming.len(), 3);
        assert_eq!(rebased.outgoing.len(), 2);
        assert_eq!(rebased.incoming[1], Change::Noop);
        assert_eq!(rebased.incoming[0].from(), Some("r"));
        assert_eq!(rebased.outgoing[0].from(), Some("l"));
    }

    #[test]
    fn later_incoming_sees_earlier_incoming() {
        // Remote typed "ab" one character at a time; we typed "Z" at the start.
        let incoming = vec![Change::insert(3, "a", "r"), Change::insert(4, "b", "r")];
        let outgoing = vec![Change::insert(0, "Z", "l")];

        let rebased = reconcile_against(&incoming, &outgoing);
        assert_eq!(
            rebased.incoming,
            vec![Change::insert(4, "a", "r"), Change::insert(5, "b", "r")]
        );
        assert_eq!(rebased.outgoing, outgoing);
        assert_eq!(converges("xyz", &incoming, &outgoing), "Zxyzab");
    }

    #[test]
    fn multiple_outgoing_against_multiple_incoming() {
        let base = "hello world";
        let incoming = vec![Change::delete(0, 6, "r"), Change::insert(5, "!", "r")];
        let outgoing = vec![Change::insert(5, ",", "l"), Change::delete(7, 4, "l")];

        let rebased = reconcile_against(&incoming, &outgoing);
        // Our comma landed inside the remote delete and is swallowed by it.
        assert_eq!(rebased.outgoing, vec![Change::Noop, Change::delete(0, 4, "l")]);
        assert_eq!(
            rebased.incoming,
            vec![Change::delete(0, 7, "r"), Change::insert(1, "!", "r")]
        );
        assert_eq!(converges(base, &incoming, &outgoing), "d!");
    }

    #[test]
    fn inputs_are_not_modified() {
        let incoming = vec![Change::insert(0, "a", "r")];
        let outgoing = vec![Change::insert(0, "b", "l")];
        let before = (incoming.clone(), outgoing.clone());

        let _ = reconcile_against(&incoming, &outgoing);
        assert_eq!((incoming, outgoing), before);
    }
}
