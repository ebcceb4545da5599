//! Locator resolution: try candidate strategies in priority order until
//! one yields a live, visible element.
//!
//! Third-party DOM structure is neither contractually stable nor known
//! ahead of time, so resolution degrades through a priority list —
//! stored selector first, then attribute patterns, then text content —
//! and reports which strategy won. That winning selector is the
//! artifact that feeds the findings and lets the system self-heal
//! across site changes without code edits.

use crate::browser::Browser;
use scout_common::{Locator, StepOutcome, Strategy};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One strategy in a role's candidate list.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub strategy: Strategy,
    pub locator: Locator,
}

impl Candidate {
    pub fn stored(selector: &str) -> Self {
        Self {
            strategy: Strategy::Stored,
            locator: Locator::parse(selector),
        }
    }
}

/// Outcome of a resolution plus the locator to act on when successful.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub outcome: StepOutcome,
    /// The locator that actually matched; interaction steps target
    /// this, not the derived selector string.
    pub locator: Option<Locator>,
}

impl Resolution {
    fn miss(outcome: StepOutcome) -> Self {
        Self {
            outcome,
            locator: None,
        }
    }
}

pub struct LocatorResolver {
    poll: Duration,
}

impl Default for LocatorResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LocatorResolver {
    pub fn new() -> Self {
        Self {
            poll: Duration::from_millis(250),
        }
    }

    pub fn with_poll(poll: Duration) -> Self {
        Self { poll }
    }

    /// Try each candidate in declared order within one bounded wait.
    ///
    /// A candidate succeeds iff it matches at least one element and the
    /// first match is displayed. Multiple matches proceed with the
    /// first in document order, flagged `Ambiguous`. Exhausting every
    /// candidate until the deadline yields `NotFound` — resolution
    /// failures never escape as errors.
    pub async fn resolve<B: Browser + ?Sized>(
        &self,
        candidates: &[Candidate],
        browser: &mut B,
        wait: Duration,
    ) -> Resolution {
        if candidates.is_empty() {
            return Resolution::miss(StepOutcome::NotFound { attempted: vec![] });
        }

        let deadline = Instant::now() + wait;
        let mut attempted: Vec<String> = Vec::new();
        let mut last_error: Option<String> = None;

        loop {
            attempted.clear();
            let mut errors = 0usize;

            for candidate in candidates {
                attempted.push(format!("{} {}", candidate.strategy, candidate.locator));

                let snapshots = match browser.query(&candidate.locator).await {
                    Ok(s) => s,
                    Err(e) => {
                        debug!(locator = %candidate.locator, error = %e, "query failed");
                        last_error = Some(e.to_string());
                        errors += 1;
                        continue;
                    }
                };

                let Some(first) = snapshots.first() else {
                    continue;
                };
                if !first.displayed {
                    continue;
                }

                let selector = first.derived_selector(&candidate.locator);
                let outcome = if snapshots.len() > 1 {
                    warn!(
                        %selector,
                        matches = snapshots.len(),
                        "ambiguous match, using first in document order"
                    );
                    StepOutcome::Ambiguous {
                        selector,
                        strategy: candidate.strategy,
                        matches: snapshots.len(),
                    }
                } else {
                    StepOutcome::Resolved {
                        selector,
                        strategy: candidate.strategy,
                    }
                };
                return Resolution {
                    outcome,
                    locator: Some(candidate.locator.clone()),
                };
            }

            if Instant::now() >= deadline {
                // Every query erroring out is a session problem, not a
                // missing element.
                if errors == candidates.len()
                    && let Some(reason) = last_error
                {
                    return Resolution::miss(StepOutcome::Failed { reason });
                }
                return Resolution::miss(StepOutcome::NotFound { attempted });
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// Assemble a role's full candidate list: the stored selector (when the
/// book has one) ahead of the built-in heuristics.
pub fn candidates_for(
    stored: Option<&str>,
    heuristics: Vec<Candidate>,
) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(heuristics.len() + 1);
    if let Some(sel) = stored
        && !sel.is_empty()
    {
        out.push(Candidate::stored(sel));
    }
    out.extend(heuristics);
    out
}
