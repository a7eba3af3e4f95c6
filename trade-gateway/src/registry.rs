use std::sync::Arc;

use gateway::BrokerSession;
use serde::Serialize;

use crate::params::ValidationError;

/// Registry entry describing one account, as exposed by `GET /accounts`.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerAccount {
    pub index: usize,
    pub account_id: String,
    pub display_name: Option<String>,
}

/// Ordered, process-lifetime collection of broker sessions.
///
/// `resolve` is the single implementation of the optional-selector policy
/// (absent selector means all accounts, present means one); every
/// batch-capable endpoint goes through it so the behavior cannot drift
/// between endpoints.
pub struct TraderRegistry {
    sessions: Vec<Arc<dyn BrokerSession>>,
}

impl TraderRegistry {
    pub fn new(sessions: Vec<Arc<dyn BrokerSession>>) -> Self {
        Self { sessions }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn accounts(&self) -> Vec<BrokerAccount> {
        self.sessions
            .iter()
            .enumerate()
            .map(|(index, s)| BrokerAccount {
                index,
                account_id: s.account_id().to_string(),
                display_name: s.display_name().map(str::to_string),
            })
            .collect()
    }

    /// Resolve an optional account selector to the subset it denotes, in
    /// registry index order.
    pub fn resolve(
        &self,
        trader_index: Option<i64>,
    ) -> Result<Vec<(usize, Arc<dyn BrokerSession>)>, ValidationError> {
        match trader_index {
            None => Ok(self
                .sessions
                .iter()
                .cloned()
                .enumerate()
                .collect()),
            Some(idx) => {
                let (index, session) = self.get(idx)?;
                Ok(vec![(index, session)])
            }
        }
    }

    /// Look up a single account by required index.
    pub fn get(
        &self,
        trader_index: i64,
    ) -> Result<(usize, Arc<dyn BrokerSession>), ValidationError> {
        if trader_index < 0 || trader_index as usize >= self.sessions.len() {
            return Err(ValidationError::InvalidTraderIndex(trader_index));
        }
        let index = trader_index as usize;
        Ok((index, Arc::clone(&self.sessions[index])))
    }
}
