//! Property-based test generators using proptest.
//!
//! Changes are generated against a known document length so that every
//! generated change, and every change in a generated sequence, is valid for
//! the text it will be applied to.

use proptest::prelude::*;
use tandem_protocol::Change;

/// Strategy for generating base documents.
///
/// Mixes ASCII with multi-byte and astral characters so that character
/// offsets and byte offsets disagree.
pub fn base_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ab cé漢😀]{0,12}").expect("Invalid regex")
}

/// Strategy for generating inserted text.
pub fn insert_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[xyé😀]{1,3}").expect("Invalid regex")
}

/// Strategy for generating client ids from a small pool, so that ties on
/// position and text are common.
pub fn client_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["ann", "bob", "cy"]).prop_map(String::from)
}

/// An edit whose offsets are fitted to a document length later.
#[derive(Debug, Clone)]
pub enum RawEdit {
    /// Insert `text` at `seed` modulo the available positions.
    Insert {
        /// Position seed.
        seed: usize,
        /// Text to insert.
        text: String,
    },
    /// Delete starting at `seed`, removing `span` modulo what is left.
    Delete {
        /// Position seed.
        seed: usize,
        /// Amount seed.
        span: usize,
    },
    /// No change.
    Noop,
}

/// Strategy for generating raw edits.
pub fn raw_edit_strategy() -> impl Strategy<Value = RawEdit> {
    prop_oneof![
        3 => (any::<usize>(), insert_text_strategy())
            .prop_map(|(seed, text)| RawEdit::Insert { seed, text }),
        3 => (any::<usize>(), any::<usize>())
            .prop_map(|(seed, span)| RawEdit::Delete { seed, span }),
        1 => Just(RawEdit::Noop),
    ]
}

/// Fits `raw` to a document of `len` characters and updates `len` to the
/// length after the change.
pub fn realize(len: &mut usize, raw: RawEdit, from: &str) -> Change {
    match raw {
        RawEdit::Insert { seed, text } => {
            let position = seed % (*len + 1);
            *len += text.chars().count();
            Change::insert(position, text, from)
        }
        RawEdit::Delete { seed, span } => {
            let position = seed % (*len + 1);
            let amount = span % (*len - position + 1);
            *len -= amount;
            Change::delete(position, amount, from)
        }
        RawEdit::Noop => Change::Noop,
    }
}

/// Strategy for a single change valid on a document of `len` characters.
pub fn change_strategy(len: usize) -> impl Strategy<Value = Change> {
    (raw_edit_strategy(), client_id_strategy()).prop_map(move |(raw, from)| {
        let mut len = len;
        realize(&mut len, raw, &from)
    })
}

/// Strategy for a sequence of changes by `from`, each valid on the text
/// produced by the ones before it, starting from `base_len` characters.
pub fn change_sequence_strategy(
    base_len: usize,
    from: impl Into<String>,
    max_changes: usize,
) -> impl Strategy<Value = Vec<Change>> {
    let from = from.into();
    prop::collection::vec(raw_edit_strategy(), 0..=max_changes).prop_map(move |raw| {
        let mut len = base_len;
        raw.into_iter()
            .map(|edit| realize(&mut len, edit, &from))
            .collect()
    })
}

/// Strategy for a base document and two changes made concurrently on it.
pub fn concurrent_pair_strategy() -> impl Strategy<Value = (String, Change, Change)> {
    base_text_strategy().prop_flat_map(|base| {
        let len = base.chars().count();
        (Just(base), change_strategy(len), change_strategy(len))
    })
}

/// Strategy for a base document, a remote queue and a local queue, both
/// made concurrently on the base.
pub fn concurrent_queues_strategy(
    max_changes: usize,
) -> impl Strategy<Value = (String, Vec<Change>, Vec<Change>)> {
    base_text_strategy().prop_flat_map(move |base| {
        let len = base.chars().count();
        (
            Just(base),
            change_sequence_strategy(len, "remote", max_changes),
            change_sequence_strategy(len, "local", max_changes),
        )
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 512,
            max_shrink_iters: 2000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 64,
            max_shrink_iters: 200,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
