use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Actor, Decision, DecisionOutcome, LikesRows};

/// Errors that can occur when talking to the decision store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Gave up connecting after {attempts} attempts: {source}")]
    ConnectExhausted {
        attempts: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    /// The decision was written but the opposite-direction lookup failed.
    /// The write is not rolled back; the match status is unknown.
    #[error("Decision {decision_id} recorded but mutual match check failed: {source}")]
    MatchCheck {
        decision_id: i64,
        #[source]
        source: Box<StoreError>,
    },
}

/// Persistent relation store backing the likes and decision engines
///
/// Every method is a single round trip against the store. Identifiers are
/// passed through unvalidated; a malformed one comes back as a query error.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Insert one decision row, applying the store's duplicate policy
    async fn insert_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
        liked: bool,
    ) -> Result<Decision, StoreError>;

    /// First page of actors who liked `recipient`, ordered by actor id
    async fn query_likes_start(
        &self,
        recipient: &str,
        page_size: usize,
    ) -> Result<LikesRows, StoreError>;

    /// Page of actors who liked `recipient` with ids strictly after `cursor`
    async fn query_likes_after(
        &self,
        recipient: &str,
        cursor: &str,
        page_size: usize,
    ) -> Result<LikesRows, StoreError>;

    /// Every actor who liked `recipient`, ordered by actor id
    async fn query_likes_received(&self, recipient: &str) -> Result<Vec<Actor>, StoreError>;

    /// Every actor `actor` has liked, ordered by actor id
    async fn query_likes_sent(&self, actor: &str) -> Result<Vec<Actor>, StoreError>;

    /// Number of actors whose effective decision toward `recipient` is a like
    async fn query_like_count(&self, recipient: &str) -> Result<u64, StoreError>;

    /// Effective (most recent) decision from `from_actor` to `to_actor`
    async fn query_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
    ) -> Result<Option<Decision>, StoreError>;

    /// Record a decision and, when asked, fetch the opposite-direction decision.
    ///
    /// The default body issues two independent round trips. A decision from
    /// the other actor landing between them can be missed or counted twice,
    /// and a failed lookup leaves the insert committed (`MatchCheck`).
    /// Backends that can do better override this with an atomic version.
    async fn record_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
        liked: bool,
        check_opposite: bool,
    ) -> Result<DecisionOutcome, StoreError> {
        let decision = self.insert_decision(from_actor, to_actor, liked).await?;

        if !check_opposite {
            return Ok(DecisionOutcome { decision, opposite: None });
        }

        match self.query_decision(to_actor, from_actor).await {
            Ok(opposite) => Ok(DecisionOutcome { decision, opposite }),
            Err(e) => Err(StoreError::MatchCheck {
                decision_id: decision.id,
                source: Box::new(e),
            }),
        }
    }

    /// Health check for the store
    async fn health_check(&self) -> Result<bool, StoreError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
