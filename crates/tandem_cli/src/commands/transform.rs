//! Transform command implementation.

use super::describe;
use serde::Serialize;
use tandem_protocol::{reconcile, Change, ProtocolResult};
use tracing::debug;

/// Result of reconciling two changes.
#[derive(Debug, Serialize)]
pub struct TransformResult {
    /// First change, rebased to apply after the second.
    pub a: Change,
    /// Second change, rebased to apply after the first.
    pub b: Change,
    /// Convergence check, if a base text was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence: Option<Convergence>,
}

/// Both application orders on a base text.
#[derive(Debug, Serialize)]
pub struct Convergence {
    /// Text after `a` then the rebased `b`.
    pub a_first: String,
    /// Text after `b` then the rebased `a`.
    pub b_first: String,
    /// Whether the two orders agree.
    pub converged: bool,
}

/// Reconciles `a` and `b`, checking convergence on `base` if given.
pub fn transform(a: Change, b: Change, base: Option<&str>) -> ProtocolResult<TransformResult> {
    let (a2, b2) = reconcile(a.clone(), b.clone());

    let convergence = match base {
        Some(base) => {
            let mut a_first = base.to_string();
            a.apply(&mut a_first)?;
            b2.apply(&mut a_first)?;

            let mut b_first = base.to_string();
            b.apply(&mut b_first)?;
            a2.apply(&mut b_first)?;

            let converged = a_first == b_first;
            Some(Convergence {
                a_first,
                b_first,
                converged,
            })
        }
        None => None,
    };

    Ok(TransformResult {
        a: a2,
        b: b2,
        convergence,
    })
}

/// Runs the transform command.
pub fn run(
    a: &str,
    b: &str,
    base: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let a: Change = serde_json::from_str(a)?;
    let b: Change = serde_json::from_str(b)?;
    debug!(a = %describe(&a), b = %describe(&b), "cli.transform");

    let result = transform(a, b, base)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("a' = {}", describe(&result.a));
            println!("b' = {}", describe(&result.b));
            if let Some(check) = &result.convergence {
                println!("a, b' -> {:?}", check.a_first);
                println!("b, a' -> {:?}", check.b_first);
                println!("converged: {}", check.converged);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_with_base() {
        let result = transform(
            Change::delete(2, 3, "a"),
            Change::delete(4, 2, "b"),
            Some("abcdefgh"),
        )
        .unwrap();

        assert_eq!(result.a, Change::delete(2, 2, "a"));
        assert_eq!(result.b, Change::delete(2, 1, "b"));
        let check = result.convergence.unwrap();
        assert!(check.converged);
        assert_eq!(check.a_first, "abgh");
    }

    #[test]
    fn transform_without_base() {
        let result = transform(Change::Noop, Change::insert(0, "x", "b"), None).unwrap();
        assert_eq!(result.a, Change::Noop);
        assert_eq!(result.b, Change::insert(0, "x", "b"));
        assert!(result.convergence.is_none());
    }

    #[test]
    fn change_that_does_not_fit_the_base() {
        assert!(transform(Change::delete(0, 9, "a"), Change::Noop, Some("abc")).is_err());
    }
}
