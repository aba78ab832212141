//! Strictest-wins combination of per-item decisions into one result.

use crate::parse::{Origin, label};

use super::decision::{Decision, RuleMatch, Source};

/// One classified item of an invocation: a command, a redirect, or an
/// unsupported construct.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Display label, already decorated with its origin.
    pub label: String,
    pub result: RuleMatch,
}

impl Verdict {
    pub fn new(text: &str, origin: Origin, result: RuleMatch) -> Self {
        Self {
            label: origin.decorate(&label(text)),
            result,
        }
    }
}

/// Combine verdicts in traversal order.
///
/// The most severe decision wins. The first item carrying it drives the
/// reason and source. A single verdict passes through unchanged; with several,
/// the reason names the driver and lists every item.
pub fn combine(verdicts: Vec<Verdict>) -> RuleMatch {
    let Some(worst) = verdicts.iter().map(|v| v.result.decision).max() else {
        return RuleMatch::new(Decision::Allow, "nothing to run", Source::Default);
    };
    if verdicts.len() == 1 {
        return verdicts
            .into_iter()
            .next()
            .map(|v| v.result)
            .unwrap_or_else(|| RuleMatch::default_ask("nothing to classify"));
    }

    let lines: Vec<String> = verdicts
        .iter()
        .map(|v| {
            format!(
                "  [{}] -> {}: {}",
                v.label,
                v.result.decision.label(),
                v.result.reason.replace('\n', "; ")
            )
        })
        .collect();

    let Some(driver) = verdicts.into_iter().find(|v| v.result.decision == worst) else {
        return RuleMatch::default_ask("nothing to classify");
    };
    let header = format!(
        "{} -> {}: {}",
        driver.label,
        worst.label(),
        driver.result.reason.replace('\n', "; ")
    );
    RuleMatch::new(
        worst,
        format!("{header}\n{}", lines.join("\n")),
        driver.result.source,
    )
}
