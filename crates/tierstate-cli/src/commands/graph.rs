//! Transition table rendering

use std::fmt::Write;
use tierstate_core::{TierMode, TransitionKind};

/// Render the transition graph as a text table, rows are source modes
pub fn render() -> String {
    let width = TierMode::ALL
        .iter()
        .map(|mode| mode.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = write!(out, "{:width$}", "from \\ to");
    for to in TierMode::ALL {
        let _ = write!(out, "  {:width$}", to.as_str());
    }
    out.push('\n');

    for from in TierMode::ALL {
        let _ = write!(out, "{:width$}", from.as_str());
        for to in TierMode::ALL {
            let cell = match TransitionKind::classify(from, to) {
                Some(kind) => kind.as_str(),
                None if from == to => "-",
                None => "x",
            };
            let _ = write!(out, "  {cell:width$}");
        }
        out.push('\n');
    }
    out
}
