//! Rebase command implementation.

use super::describe;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tandem_protocol::{reconcile_against, Change, Rebased};
use tracing::debug;

/// Input file layout.
#[derive(Debug, Deserialize)]
pub struct RebaseInput {
    /// Changes received from the sequencer.
    #[serde(default)]
    pub incoming: Vec<Change>,
    /// Local changes not yet acknowledged.
    #[serde(default)]
    pub outgoing: Vec<Change>,
}

/// Runs the rebase command.
pub fn run(file: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = if file == Path::new("-") {
        let mut json = String::new();
        std::io::stdin().read_to_string(&mut json)?;
        json
    } else {
        std::fs::read_to_string(file)?
    };
    let input: RebaseInput = serde_json::from_str(&json)?;
    debug!(
        incoming = input.incoming.len(),
        outgoing = input.outgoing.len(),
        "cli.rebase"
    );

    let rebased = reconcile_against(&input.incoming, &input.outgoing);

    match format {
        "json" => {
            let output = serde_json::json!({
                "incoming": rebased.incoming,
                "outgoing": rebased.outgoing,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_text_output(&rebased),
    }

    Ok(())
}

fn print_text_output(rebased: &Rebased) {
    println!("incoming:");
    for change in &rebased.incoming {
        println!("  {}", describe(change));
    }
    println!("outgoing:");
    for change in &rebased.outgoing {
        println!("  {}", describe(change));
    }
}
