//! Bounded single-step execution.
//!
//! One action per call, every action under an explicit timeout; expiry
//! returns a `Timeout` outcome rather than hanging. Side effects happen
//! only when the target resolved — a miss never half-applies a step.
//! Retry policy does not live here; the flow controller decides whether
//! to re-attempt, always with a fresh resolution pass.

use crate::browser::Browser;
use regex::Regex;
use scout_common::{Locator, StepOutcome, Strategy};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub enum StepKind<'v> {
    Navigate(&'v str),
    Click,
    Fill(&'v str),
    WaitVisible,
    WaitHidden,
    /// Wait until the page URL matches a glob-style pattern
    /// (`**/cart`).
    WaitUrlPattern(&'v str),
}

pub struct StepRunner {
    pub timeout: Duration,
    pub slow_mo: Duration,
    poll: Duration,
}

impl StepRunner {
    pub fn new(timeout: Duration, slow_mo: Duration) -> Self {
        Self {
            timeout,
            slow_mo,
            poll: Duration::from_millis(250),
        }
    }

    /// Perform exactly one bounded action. `target` is required for
    /// every kind except `Navigate` and `WaitUrlPattern`.
    pub async fn run<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        kind: StepKind<'_>,
        target: Option<&Locator>,
    ) -> StepOutcome {
        match kind {
            StepKind::Navigate(url) => self.navigate(browser, url).await,
            StepKind::Click => {
                let Some(locator) = target else {
                    return missing_target("click");
                };
                self.act(browser, locator, |b, l| b.click(l)).await
            }
            StepKind::Fill(value) => {
                let Some(locator) = target else {
                    return missing_target("fill");
                };
                self.act(browser, locator, |b, l| b.fill(l, value)).await
            }
            StepKind::WaitVisible => {
                let Some(locator) = target else {
                    return missing_target("wait-visible");
                };
                self.wait_visibility(browser, locator, true).await
            }
            StepKind::WaitHidden => {
                let Some(locator) = target else {
                    return missing_target("wait-hidden");
                };
                self.wait_visibility(browser, locator, false).await
            }
            StepKind::WaitUrlPattern(pattern) => self.wait_url(browser, pattern).await,
        }
    }

    async fn navigate<B: Browser + ?Sized>(&self, browser: &mut B, url: &str) -> StepOutcome {
        match tokio::time::timeout(self.timeout, browser.navigate(url)).await {
            Ok(Ok(())) => {
                self.pace().await;
                StepOutcome::Resolved {
                    selector: url.to_string(),
                    strategy: Strategy::Direct,
                }
            }
            Ok(Err(e)) => StepOutcome::Failed {
                reason: e.to_string(),
            },
            Err(_) => StepOutcome::Timeout {
                waited: self.timeout,
            },
        }
    }

    async fn act<'b, B, F, Fut>(
        &self,
        browser: &'b mut B,
        locator: &'b Locator,
        op: F,
    ) -> StepOutcome
    where
        B: Browser + ?Sized,
        F: FnOnce(&'b mut B, &'b Locator) -> Fut,
        Fut: Future<Output = Result<(), crate::browser::BrowserError>>,
    {
        match tokio::time::timeout(self.timeout, op(browser, locator)).await {
            Ok(Ok(())) => {
                self.pace().await;
                StepOutcome::Resolved {
                    selector: locator.as_stored(),
                    strategy: Strategy::Direct,
                }
            }
            Ok(Err(e)) => StepOutcome::Failed {
                reason: e.to_string(),
            },
            Err(_) => StepOutcome::Timeout {
                waited: self.timeout,
            },
        }
    }

    async fn wait_visibility<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        locator: &Locator,
        want_visible: bool,
    ) -> StepOutcome {
        let deadline = Instant::now() + self.timeout;
        loop {
            let visible = match browser.query(locator).await {
                Ok(snaps) => snaps.first().map(|s| s.displayed).unwrap_or(false),
                Err(e) => {
                    return StepOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            };
            if visible == want_visible {
                return StepOutcome::Resolved {
                    selector: locator.as_stored(),
                    strategy: Strategy::Direct,
                };
            }
            if Instant::now() >= deadline {
                return StepOutcome::Timeout {
                    waited: self.timeout,
                };
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    async fn wait_url<B: Browser + ?Sized>(&self, browser: &mut B, pattern: &str) -> StepOutcome {
        let re = match url_pattern_to_regex(pattern) {
            Ok(re) => re,
            Err(e) => {
                return StepOutcome::Failed {
                    reason: format!("bad url pattern '{pattern}': {e}"),
                };
            }
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            match browser.current_url().await {
                Ok(url) => {
                    if re.is_match(url.trim_end_matches('/')) {
                        return StepOutcome::Resolved {
                            selector: url,
                            strategy: Strategy::Direct,
                        };
                    }
                }
                Err(e) => {
                    return StepOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            }
            if Instant::now() >= deadline {
                return StepOutcome::Timeout {
                    waited: self.timeout,
                };
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }
}

fn missing_target(kind: &str) -> StepOutcome {
    StepOutcome::Failed {
        reason: format!("{kind} step requires a resolved target"),
    }
}

/// Compile a glob-style URL pattern to an anchored regex: `**` crosses
/// path separators, `*` does not.
pub fn url_pattern_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut out = String::with_capacity(pattern.len() * 2);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out)
}
