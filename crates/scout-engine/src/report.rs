//! Run reporting: one record per executed step plus the selectors
//! confirmed along the way.
//!
//! The findings snapshot is consumed exactly once by the store merge at
//! run end; the step records become the narrated summary an operator
//! reads to see exactly where a third-party UI change broke resolution.

use crate::flow::FlowStage;
use scout_common::{RunFindings, Section, StepOutcome};

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub stage: FlowStage,
    pub step: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Default)]
pub struct RunReport {
    steps: Vec<StepRecord>,
    findings: RunFindings,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: FlowStage, step: &str, outcome: &StepOutcome) {
        self.steps.push(StepRecord {
            stage,
            step: step.to_string(),
            outcome: outcome.clone(),
        });
    }

    /// Note a confirmed selector. Last resolution wins when a role is
    /// visited twice in one run.
    pub fn confirm(&mut self, section: Section, role: &str, selector: &str) {
        self.findings.record(section, role, selector);
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn findings(&self) -> &RunFindings {
        &self.findings
    }

    pub fn last_stage(&self) -> Option<FlowStage> {
        self.steps.last().map(|r| r.stage)
    }

    /// Number of steps that ended ambiguous, surfaced for review.
    pub fn ambiguous_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Ambiguous { .. }))
            .count()
    }

    /// Human-readable end-of-run summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("steps:\n");
        for rec in &self.steps {
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                rec.stage, rec.step, rec.outcome
            ));
        }
        if self.findings.is_empty() {
            out.push_str("selectors discovered: none\n");
        } else {
            out.push_str("selectors discovered:\n");
            match serde_json::to_string_pretty(&self.findings.to_value()) {
                Ok(json) => {
                    for line in json.lines() {
                        out.push_str("  ");
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                Err(_) => out.push_str("  (unprintable)\n"),
            }
        }
        out
    }
}
