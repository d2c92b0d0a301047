// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation policy: pure decision functions that decide human handoff.
//!
//! Consulted by `process_refund` (amount threshold, fraud signals in the
//! reason) and available to `escalate_to_human`. Policy never touches
//! storage.

use macrodesk_config::model::EscalationConfig;

/// Why a refund was forced to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationTrigger {
    /// Refund amount exceeds the approval limit.
    OverRefundLimit,
    /// The request text carried a fraud/dispute keyword.
    FraudSignal,
}

/// Outcome of assessing a refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundDecision {
    /// The tool may mutate the order directly.
    Proceed,
    /// Forced handoff: no mutation, create an escalated ticket.
    Escalate(EscalationTrigger),
}

/// Escalation thresholds and fraud keywords.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    refund_limit_cents: i64,
    fraud_keywords: Vec<String>,
}

impl EscalationPolicy {
    pub fn new(refund_limit_cents: i64, fraud_keywords: Vec<String>) -> Self {
        Self {
            refund_limit_cents,
            fraud_keywords: fraud_keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &EscalationConfig) -> Self {
        Self::new(config.refund_limit_cents, config.fraud_keywords.clone())
    }

    /// The refund approval limit in cents.
    pub fn refund_limit_cents(&self) -> i64 {
        self.refund_limit_cents
    }

    /// Decide whether a refund may proceed.
    ///
    /// Fraud signals win over the amount check so the trigger reported to
    /// the operator names the stronger reason.
    pub fn assess_refund(&self, amount_cents: i64, reason: &str) -> RefundDecision {
        if self.has_fraud_signal(reason) {
            return RefundDecision::Escalate(EscalationTrigger::FraudSignal);
        }
        if amount_cents > self.refund_limit_cents {
            return RefundDecision::Escalate(EscalationTrigger::OverRefundLimit);
        }
        RefundDecision::Proceed
    }

    /// Case-insensitive keyword scan.
    pub fn has_fraud_signal(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.fraud_keywords.iter().any(|k| lowered.contains(k))
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from_config(&EscalationConfig::default())
    }
}
