//! CLI command implementations.

pub mod apply;
pub mod rebase;
pub mod transform;

use tandem_protocol::Change;

/// Renders a change for text output.
pub fn describe(change: &Change) -> String {
    match change {
        Change::Insert(insert) => format!(
            "insert {:?} at {} (from {})",
            insert.text, insert.position, insert.from
        ),
        Change::Delete(delete) => format!(
            "delete {} at {} (from {})",
            delete.amount, delete.position, delete.from
        ),
        Change::Noop => "noop".to_string(),
    }
}

/// Parses a JSON array of changes.
pub fn parse_changes(json: &str) -> Result<Vec<Change>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_changes() {
        assert_eq!(
            describe(&Change::insert(2, "hi", "ann")),
            r#"insert "hi" at 2 (from ann)"#
        );
        assert_eq!(describe(&Change::delete(0, 3, "bob")), "delete 3 at 0 (from bob)");
        assert_eq!(describe(&Change::Noop), "noop");
    }

    #[test]
    fn parse_change_array() {
        let changes =
            parse_changes(r#"[null, {"type":"delete","position":1,"amount":2,"from":"x"}]"#)
                .unwrap();
        assert_eq!(changes, vec![Change::Noop, Change::delete(1, 2, "x")]);
        assert!(parse_changes("{}").is_err());
    }
}
