//! Per-step outcomes.
//!
//! Every step attempt produces exactly one `StepOutcome`, never mutated
//! afterwards. Callers distinguish "skip optional step" from "abort the
//! flow" by variant, not by inspecting error text.

use std::fmt;
use std::time::Duration;

/// How an element was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A selector from the book, proven in a previous run.
    Stored,
    /// A semantic attribute-pattern heuristic.
    Attribute,
    /// A text-content heuristic.
    TextContent,
    /// An explicit target needing no resolution (navigation, URL
    /// waits, acting on an already-resolved locator).
    Direct,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Stored => "stored",
            Strategy::Attribute => "attribute",
            Strategy::TextContent => "text",
            Strategy::Direct => "direct",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Exactly one usable element; `selector` is the concrete
    /// expression that worked and feeds back into the findings.
    Resolved { selector: String, strategy: Strategy },
    /// More than one element matched; the first in document order was
    /// used. Flagged for review, never blocking.
    Ambiguous {
        selector: String,
        strategy: Strategy,
        matches: usize,
    },
    /// Every candidate strategy was exhausted without a visible match.
    NotFound { attempted: Vec<String> },
    /// A bounded wait expired.
    Timeout { waited: Duration },
    /// The step failed below the resolution layer (browser/session).
    Failed { reason: String },
}

impl StepOutcome {
    /// Whether the step may proceed (an element was located, possibly
    /// ambiguously).
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            StepOutcome::Resolved { .. } | StepOutcome::Ambiguous { .. }
        )
    }

    /// The concrete selector that worked, if any.
    pub fn selector(&self) -> Option<&str> {
        match self {
            StepOutcome::Resolved { selector, .. } | StepOutcome::Ambiguous { selector, .. } => {
                Some(selector)
            }
            _ => None,
        }
    }

    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            StepOutcome::Resolved { strategy, .. } | StepOutcome::Ambiguous { strategy, .. } => {
                Some(*strategy)
            }
            _ => None,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Resolved { selector, strategy } => {
                write!(f, "resolved via {strategy}: {selector}")
            }
            StepOutcome::Ambiguous {
                selector,
                strategy,
                matches,
            } => write!(
                f,
                "resolved via {strategy} ({matches} matches, used first): {selector}"
            ),
            StepOutcome::NotFound { attempted } => {
                write!(f, "not found after {}", attempted.join(", "))
            }
            StepOutcome::Timeout { waited } => write!(f, "timed out after {:?}", waited),
            StepOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
