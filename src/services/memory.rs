use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Actor, Decision, DecisionOutcome, DecisionPolicy, LikesRows};
use crate::services::store::{DecisionStore, StoreError};

#[derive(Debug, Clone)]
struct DecisionRow {
    id: i64,
    created_at: DateTime<Utc>,
    from_actor: Uuid,
    to_actor: Uuid,
    liked: bool,
}

impl DecisionRow {
    fn to_decision(&self) -> Decision {
        Decision {
            id: self.id,
            created_at: self.created_at,
            from_actor: self.from_actor.to_string(),
            to_actor: self.to_actor.to_string(),
            liked: self.liked,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    actors: BTreeMap<Uuid, DateTime<Utc>>,
    decisions: Vec<DecisionRow>,
    next_id: i64,
}

impl State {
    /// Most recent row per ordered pair
    fn effective(&self) -> HashMap<(Uuid, Uuid), &DecisionRow> {
        let mut effective: HashMap<(Uuid, Uuid), &DecisionRow> = HashMap::new();
        for row in &self.decisions {
            let key = (row.from_actor, row.to_actor);
            match effective.get(&key) {
                Some(existing) if existing.id > row.id => {}
                _ => {
                    effective.insert(key, row);
                }
            }
        }
        effective
    }

    fn actor(&self, id: Uuid) -> Actor {
        Actor {
            id: id.to_string(),
            created_at: self.actors.get(&id).copied().unwrap_or_default(),
        }
    }

    /// Actors whose effective decision toward `recipient` is a like, ordered by id
    fn likers_of(&self, recipient: Uuid) -> Vec<Actor> {
        let mut ids: Vec<Uuid> = self
            .effective()
            .values()
            .filter(|row| row.to_actor == recipient && row.liked)
            .map(|row| row.from_actor)
            .collect();
        ids.sort();
        ids.into_iter().map(|id| self.actor(id)).collect()
    }

    /// Actors that `actor` currently likes, ordered by id
    fn liked_by(&self, actor: Uuid) -> Vec<Actor> {
        let mut ids: Vec<Uuid> = self
            .effective()
            .values()
            .filter(|row| row.from_actor == actor && row.liked)
            .map(|row| row.to_actor)
            .collect();
        ids.sort();
        ids.into_iter().map(|id| self.actor(id)).collect()
    }

    fn lookup(&self, from_actor: Uuid, to_actor: Uuid) -> Option<Decision> {
        self.decisions
            .iter()
            .filter(|row| row.from_actor == from_actor && row.to_actor == to_actor)
            .max_by_key(|row| row.id)
            .map(DecisionRow::to_decision)
    }

    fn insert(
        &mut self,
        policy: DecisionPolicy,
        from_actor: Uuid,
        to_actor: Uuid,
        liked: bool,
    ) -> Result<Decision, StoreError> {
        for id in [from_actor, to_actor] {
            if !self.actors.contains_key(&id) {
                return Err(StoreError::UnknownActor(id.to_string()));
            }
        }

        if policy == DecisionPolicy::Replace {
            self.decisions
                .retain(|row| !(row.from_actor == from_actor && row.to_actor == to_actor));
        }

        self.next_id += 1;
        let row = DecisionRow {
            id: self.next_id,
            created_at: Utc::now(),
            from_actor,
            to_actor,
            liked,
        };
        let decision = row.to_decision();
        self.decisions.push(row);

        Ok(decision)
    }
}

fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|e| StoreError::InvalidInput(format!("'{}' is not a uuid: {}", id, e)))
}

/// Decision store kept entirely in process memory
///
/// Mirrors the PostgreSQL backend's contract: identifiers must be UUIDs,
/// decisions may only reference registered actors, and `record_decision`
/// is atomic because it runs under a single write lock.
pub struct InMemoryStore {
    state: RwLock<State>,
    policy: DecisionPolicy,
}

impl InMemoryStore {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self {
            state: RwLock::new(State::default()),
            policy,
        }
    }

    /// Register a new actor with a fresh identifier
    pub async fn register_actor(&self) -> Actor {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        self.state.write().await.actors.insert(id, created_at);

        Actor {
            id: id.to_string(),
            created_at,
        }
    }

    /// Total number of stored decision rows, including superseded ones
    pub async fn decision_rows(&self) -> usize {
        self.state.read().await.decisions.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DecisionPolicy::default())
    }
}

#[async_trait]
impl DecisionStore for InMemoryStore {
    async fn insert_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
        liked: bool,
    ) -> Result<Decision, StoreError> {
        let (from_actor, to_actor) = (parse_id(from_actor)?, parse_id(to_actor)?);
        self.state.write().await.insert(self.policy, from_actor, to_actor, liked)
    }

    async fn query_likes_start(
        &self,
        recipient: &str,
        page_size: usize,
    ) -> Result<LikesRows, StoreError> {
        let recipient = parse_id(recipient)?;
        let mut rows = self.state.read().await.likers_of(recipient);
        rows.truncate(page_size);
        Ok(LikesRows::from_rows(rows))
    }

    async fn query_likes_after(
        &self,
        recipient: &str,
        cursor: &str,
        page_size: usize,
    ) -> Result<LikesRows, StoreError> {
        let recipient = parse_id(recipient)?;
        let cursor = parse_id(cursor)?;
        let rows: Vec<Actor> = self
            .state
            .read()
            .await
            .likers_of(recipient)
            .into_iter()
            .filter(|actor| parse_id(&actor.id).map_or(false, |id| id > cursor))
            .take(page_size)
            .collect();
        Ok(LikesRows::from_rows(rows))
    }

    async fn query_likes_received(&self, recipient: &str) -> Result<Vec<Actor>, StoreError> {
        let recipient = parse_id(recipient)?;
        Ok(self.state.read().await.likers_of(recipient))
    }

    async fn query_likes_sent(&self, actor: &str) -> Result<Vec<Actor>, StoreError> {
        let actor = parse_id(actor)?;
        Ok(self.state.read().await.liked_by(actor))
    }

    async fn query_like_count(&self, recipient: &str) -> Result<u64, StoreError> {
        let recipient = parse_id(recipient)?;
        Ok(self.state.read().await.likers_of(recipient).len() as u64)
    }

    async fn query_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
    ) -> Result<Option<Decision>, StoreError> {
        let (from_actor, to_actor) = (parse_id(from_actor)?, parse_id(to_actor)?);
        Ok(self.state.read().await.lookup(from_actor, to_actor))
    }

    async fn record_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
        liked: bool,
        check_opposite: bool,
    ) -> Result<DecisionOutcome, StoreError> {
        let (from_actor, to_actor) = (parse_id(from_actor)?, parse_id(to_actor)?);

        let mut state = self.state.write().await;
        let decision = state.insert(self.policy, from_actor, to_actor, liked)?;
        let opposite = if check_opposite {
            state.lookup(to_actor, from_actor)
        } else {
            None
        };

        Ok(DecisionOutcome { decision, opposite })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
