use std::sync::Arc;

use crate::services::{DecisionStore, StoreError};

/// Records like/pass decisions and detects mutual likes
#[derive(Clone)]
pub struct DecisionEngine {
    store: Arc<dyn DecisionStore>,
}

impl DecisionEngine {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self { store }
    }

    /// Record `actor`'s decision on `recipient` and report whether it made a mutual like.
    ///
    /// The opposite direction is only consulted for a like; a pass is never
    /// mutual. A missing opposite decision is simply `false`.
    ///
    /// `StoreError::MatchCheck` means the decision was stored but the match
    /// status is unknown. Callers must not treat it as a failed write.
    pub async fn put_decision(
        &self,
        actor: &str,
        recipient: &str,
        liked: bool,
    ) -> Result<bool, StoreError> {
        let outcome = self
            .store
            .record_decision(actor, recipient, liked, liked)
            .await?;

        let mutual = outcome.is_mutual();
        if mutual {
            tracing::info!("Mutual like between {} and {}", actor, recipient);
        }

        Ok(mutual)
    }
}
