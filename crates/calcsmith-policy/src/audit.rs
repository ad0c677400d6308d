//! Arbiter decision audit log
//!
//! Every override-capable decision is worth a record: who armed what, and
//! whether an override was actually used. In-memory and bounded; a
//! deployment that wants durable audit ships these entries elsewhere.
//! Observability only; the arbiter never reads the log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::arbiter::{ScanOverrideDecision, ScanPolicyMode};

const MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbiterAuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    pub mode: ScanPolicyMode,
    pub capability: bool,
    pub armed: bool,
    pub proceed: bool,
    pub prompt_denied: bool,
    pub decision: ScanOverrideDecision,
    pub override_used: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbiterAuditStats {
    pub total: usize,
    pub blocks: usize,
    pub warns: usize,
    pub skips: usize,
    pub overrides_used: usize,
}

#[derive(Debug, Default)]
pub struct ArbiterAuditLog {
    entries: Vec<ArbiterAuditEntry>,
}

impl ArbiterAuditLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Record one arbiter decision.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        trace_id: impl Into<String>,
        mode: ScanPolicyMode,
        capability: bool,
        armed: bool,
        proceed: bool,
        prompt_denied: bool,
        decision: ScanOverrideDecision,
    ) -> &ArbiterAuditEntry {
        let override_used = matches!(
            decision,
            ScanOverrideDecision::Continue { override_used: true, .. }
        );
        self.entries.push(ArbiterAuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            trace_id: trace_id.into(),
            mode,
            capability,
            armed,
            proceed,
            prompt_denied,
            decision,
            override_used,
        });
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(0..excess);
        }
        self.entries.last().expect("just pushed")
    }

    pub fn entries(&self) -> &[ArbiterAuditEntry] {
        &self.entries
    }

    pub fn stats(&self) -> ArbiterAuditStats {
        let mut stats = ArbiterAuditStats { total: self.entries.len(), ..Default::default() };
        for entry in &self.entries {
            match entry.decision {
                ScanOverrideDecision::ScanBlock => stats.blocks += 1,
                ScanOverrideDecision::ScanWarn => stats.warns += 1,
                ScanOverrideDecision::ScanSkipped => stats.skips += 1,
                ScanOverrideDecision::Continue { .. } => {}
            }
            if entry.override_used {
                stats.overrides_used += 1;
            }
        }
        stats
    }
}
