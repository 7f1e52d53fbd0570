//! Apply command implementation.

use super::parse_changes;
use tandem_protocol::apply_all;
use tracing::debug;

/// Runs the apply command.
pub fn run(base: &str, changes: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let changes = parse_changes(changes)?;
    debug!(count = changes.len(), "cli.apply");

    let mut text = base.to_string();
    apply_all(&mut text, &changes)?;

    match format {
        "json" => {
            println!("{}", serde_json::json!({ "text": text }));
        }
        _ => {
            println!("{text}");
        }
    }

    Ok(())
}
