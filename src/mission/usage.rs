//! Append-only usage ledger for external agent calls.

use std::iter::Sum;
use std::ops::Add;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Phase;

/// Token and cost counters for one agent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub phase: Phase,
    pub call_id: Uuid,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub cost_usd: f64,
    pub recorded_at: DateTime<Utc>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl UsageRecord {
    pub fn new(phase: Phase, model: &str) -> Self {
        Self {
            phase,
            call_id: Uuid::new_v4(),
            model: model.to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            recorded_at: Utc::now(),
            success: true,
            error: None,
        }
    }

    pub fn with_tokens(mut self, prompt_tokens: u64, completion_tokens: u64, cost_usd: f64) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self.total_tokens = prompt_tokens + completion_tokens;
        self.cost_usd = cost_usd;
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Aggregate counters derived from ledger entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageTotals {
    pub runs: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

impl Add for UsageTotals {
    type Output = UsageTotals;

    fn add(self, other: UsageTotals) -> UsageTotals {
        UsageTotals {
            runs: self.runs + other.runs,
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            cost_usd: self.cost_usd + other.cost_usd,
        }
    }
}

impl Sum for UsageTotals {
    fn sum<I: Iterator<Item = UsageTotals>>(iter: I) -> Self {
        iter.fold(UsageTotals::default(), Add::add)
    }
}

impl From<&UsageRecord> for UsageTotals {
    fn from(record: &UsageRecord) -> Self {
        UsageTotals {
            runs: 1,
            prompt_tokens: record.prompt_tokens,
            completion_tokens: record.completion_tokens,
            total_tokens: record.total_tokens,
            cost_usd: record.cost_usd,
        }
    }
}

/// Ledger entries are only ever appended; totals are always recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLedger {
    #[serde(default)]
    runs: Vec<UsageRecord>,
}

impl UsageLedger {
    pub fn append(&mut self, record: UsageRecord) {
        self.runs.push(record);
    }

    pub fn runs(&self) -> &[UsageRecord] {
        &self.runs
    }

    pub fn totals(&self) -> UsageTotals {
        self.runs.iter().map(UsageTotals::from).sum()
    }

    pub fn totals_for(&self, phase: Phase) -> UsageTotals {
        self.runs
            .iter()
            .filter(|r| r.phase == phase)
            .map(UsageTotals::from)
            .sum()
    }
}
