//! Per-account batch execution.
//!
//! One failing account never aborts the batch: a batch over N resolved
//! accounts always attempts exactly N operations and reports one entry per
//! account, in registry index order. There is no cross-account rollback;
//! once an account's order is placed it stays placed regardless of what
//! later accounts do.

use std::future::Future;
use std::sync::Arc;

use gateway::{BrokerSession, SessionError};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Failed,
}

/// Outcome of one account's leg of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct PerAccountResult {
    pub trader_index: usize,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerAccountResult {
    pub fn success(trader_index: usize, result: Value) -> Self {
        Self {
            trader_index,
            status: EntryStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(trader_index: usize, error: impl Into<String>) -> Self {
        Self {
            trader_index,
            status: EntryStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Whether a batch succeeded on all, some, or none of its accounts.
/// Exposed so callers need not re-scan the entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    Full,
    Partial,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub message: String,
    pub results: Vec<PerAccountResult>,
    pub executed_count: usize,
    pub failed_count: usize,
    pub outcome: BatchOutcome,
}

impl BatchResult {
    pub fn new(message: impl Into<String>, results: Vec<PerAccountResult>) -> Self {
        let executed_count = results
            .iter()
            .filter(|r| r.status == EntryStatus::Success)
            .count();
        let failed_count = results.len() - executed_count;
        let outcome = if failed_count == 0 {
            BatchOutcome::Full
        } else if executed_count == 0 {
            BatchOutcome::Failed
        } else {
            BatchOutcome::Partial
        };
        Self {
            message: message.into(),
            results,
            executed_count,
            failed_count,
            outcome,
        }
    }
}

/// Run `op` against every resolved account, gathering per-account results.
///
/// Accounts are processed sequentially in the order the registry resolved
/// them; account counts are small and the underlying sessions bound each
/// call themselves.
pub async fn execute<F, Fut>(
    operation: &str,
    accounts: Vec<(usize, Arc<dyn BrokerSession>)>,
    op: F,
) -> BatchResult
where
    F: Fn(Arc<dyn BrokerSession>) -> Fut,
    Fut: Future<Output = Result<Value, SessionError>>,
{
    let mut results = Vec::with_capacity(accounts.len());
    for (index, session) in accounts {
        match op(Arc::clone(&session)).await {
            Ok(value) => {
                info!("trader {}: {} succeeded", index, operation);
                results.push(PerAccountResult::success(index, value));
            }
            Err(e) => {
                let message = format!("trader {}: {} failed: {}", index, operation, e);
                error!("{}", message);
                results.push(PerAccountResult::failed(index, message));
            }
        }
    }
    BatchResult::new(format!("{} execution complete", operation), results)
}
