//! Local copy of a shared document and its outgoing queue.

use crate::change::{apply_all, Change};
use crate::error::ProtocolResult;
use crate::rebase::{reconcile_against, Rebased};

/// A client's local copy of the document.
///
/// Local edits are applied immediately and queued as outgoing until they are
/// taken for a push. Remote changes are rebased over whatever is still
/// queued before they touch the text, and the queue is rebased over them in
/// turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    client_id: String,
    text: String,
    outgoing: Vec<Change>,
}

impl Replica {
    /// Creates a replica of `text` owned by `client_id`.
    pub fn new(client_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            text: text.into(),
            outgoing: Vec::new(),
        }
    }

    /// Returns the client id stamped on local changes.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the local changes not yet taken for a push.
    pub fn outgoing(&self) -> &[Change] {
        &self.outgoing
    }

    /// Returns true if there are local changes waiting to be pushed.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Inserts `text` at `position` as a local edit.
    pub fn insert(&mut self, position: usize, text: impl Into<String>) -> ProtocolResult<()> {
        let change = Change::insert(position, text, self.client_id.as_str());
        self.apply_local(change)
    }

    /// Deletes `amount` characters at `position` as a local edit.
    pub fn delete(&mut self, position: usize, amount: usize) -> ProtocolResult<()> {
        let change = Change::delete(position, amount, self.client_id.as_str());
        self.apply_local(change)
    }

    /// Applies a local change and queues it for pushing.
    ///
    /// The change is not queued if it does not fit the current text.
    pub fn apply_local(&mut self, change: Change) -> ProtocolResult<()> {
        change.apply(&mut self.text)?;
        if !change.is_noop() {
            self.outgoing.push(change);
        }
        Ok(())
    }

    /// Integrates changes pulled from the sequencer.
    ///
    /// Changes stamped with this replica's own client id are echoes of edits
    /// already applied here and are skipped. The rest are rebased against the
    /// outgoing queue and applied. Returns the changes as they were applied.
    ///
    /// Remote changes are checked against the sequencer's length before they
    /// are rebased. On error the replica is left as it was.
    pub fn integrate(&mut self, incoming: &[Change]) -> ProtocolResult<Vec<Change>> {
        let remote: Vec<Change> = incoming
            .iter()
            .filter(|change| change.from() != Some(self.client_id.as_str()))
            .cloned()
            .collect();

        let mut len = self.sequenced_len();
        for change in &remote {
            len = change.resulting_len(len)?;
        }

        let Rebased { incoming, outgoing } = reconcile_against(&remote, &self.outgoing);

        let mut text = self.text.clone();
        apply_all(&mut text, &incoming)?;

        self.text = text;
        self.outgoing = outgoing;
        Ok(incoming)
    }

    /// Length of the text without the outgoing changes, which is the length
    /// the sequencer's next changes start from.
    fn sequenced_len(&self) -> usize {
        let local: isize = self.outgoing.iter().map(Change::len_delta).sum();
        let len = self.text.chars().count() as isize - local;
        usize::try_from(len).unwrap_or(0)
    }

    /// Drains the outgoing queue for a push.
    ///
    /// Changes that were cancelled out by reconciliation are dropped.
    pub fn take_outgoing(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.outgoing)
            .into_iter()
            .filter(|change| !change.is_noop())
            .collect()
    }

    /// Puts changes from a failed push back at the head of the queue.
    ///
    /// Anything queued since they were taken stays behind them.
    pub fn requeue(&mut self, mut changes: Vec<Change>) {
        changes.append(&mut self.outgoing);
        self.outgoing = changes;
    }
}
