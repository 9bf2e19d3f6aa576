//! Process-wide cost accounting

use crate::error::Error;
use crate::error::Result;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Micro-USD per USD; spend is tracked in integer micro-dollars so the
/// accumulator can be a plain atomic.
const MICRO: f64 = 1_000_000.0;

/// Shared cost ledger across all concurrently processed interviews.
///
/// The accumulator is an explicit atomic counter rather than ambient global
/// state. Admission is checked before every LLM call; usage is recorded
/// with a single `fetch_add` after the call returns. Two calls already in
/// flight when the ceiling is crossed may both complete; only new work is
/// refused.
#[derive(Debug)]
pub struct CostLedger {
    spent_micro_usd: AtomicU64,
    limit_micro_usd: Option<u64>,
    api_calls: AtomicU64,
    total_tokens: AtomicU64,
}

impl CostLedger {
    /// Create a ledger with an optional cost ceiling in USD
    pub fn new(limit_usd: Option<f64>) -> Self {
        Self {
            spent_micro_usd: AtomicU64::new(0),
            limit_micro_usd: limit_usd.map(|l| (l * MICRO) as u64),
            api_calls: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
        }
    }

    /// Refuse new work once the ceiling has been reached.
    ///
    /// Returns `Error::BudgetExceeded` when spend has met or passed the
    /// limit; callers must not issue further LLM calls after that.
    pub fn check_admission(&self) -> Result<()> {
        let Some(limit) = self.limit_micro_usd else {
            return Ok(());
        };
        let spent = self.spent_micro_usd.load(Ordering::Acquire);
        if spent >= limit {
            return Err(Error::BudgetExceeded {
                spent_usd: spent as f64 / MICRO,
                limit_usd: limit as f64 / MICRO,
            });
        }
        Ok(())
    }

    /// Record the actual usage of a completed call
    pub fn record(&self, cost_usd: f64, tokens: u64) {
        let micro = (cost_usd.max(0.0) * MICRO).round() as u64;
        self.spent_micro_usd.fetch_add(micro, Ordering::AcqRel);
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.total_tokens.fetch_add(tokens, Ordering::Relaxed);
    }

    /// Count attempts that produced no usable response, so the call total
    /// reflects every request actually issued.
    pub fn record_failed_calls(&self, count: u64) {
        self.api_calls.fetch_add(count, Ordering::Relaxed);
    }

    /// Total spend so far in USD
    pub fn spent_usd(&self) -> f64 {
        self.spent_micro_usd.load(Ordering::Acquire) as f64 / MICRO
    }

    /// Number of API calls recorded
    pub fn api_calls(&self) -> u64 {
        self.api_calls.load(Ordering::Relaxed)
    }

    /// Total tokens recorded
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unlimited_ledger_always_admits() {
        let ledger = CostLedger::new(None);
        ledger.record(1000.0, 1_000_000);
        assert!(ledger.check_admission().is_ok());
        assert_eq!(ledger.api_calls(), 1);
    }

    #[test]
    fn test_ceiling_refuses_new_work() {
        let ledger = CostLedger::new(Some(0.10));
        assert!(ledger.check_admission().is_ok());

        ledger.record(0.06, 1200);
        assert!(ledger.check_admission().is_ok());

        ledger.record(0.05, 900);
        let err = ledger.check_admission().unwrap_err();
        assert!(err.is_budget_exceeded());
    }

    #[test]
    fn test_spend_accumulates_exactly() {
        let ledger = CostLedger::new(None);
        ledger.record(0.0125, 500);
        ledger.record(0.0075, 300);
        assert!((ledger.spent_usd() - 0.02).abs() < 1e-9);
        assert_eq!(ledger.total_tokens(), 800);
    }

    #[tokio::test]
    async fn test_concurrent_recording_loses_nothing() {
        let ledger = Arc::new(CostLedger::new(None));
        let mut handles = Vec::new();
        for _ in 0..32 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    ledger.record(0.000_1, 10);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(ledger.api_calls(), 3200);
        assert_eq!(ledger.total_tokens(), 32_000);
        assert!((ledger.spent_usd() - 0.32).abs() < 1e-6);
    }
}
