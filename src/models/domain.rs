use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person using the app
///
/// Actors are registered elsewhere; this service only reads them. The
/// identifier is a UUID carried as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// A directional like/pass from one actor toward another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub from_actor: String,
    pub to_actor: String,
    pub liked: bool,
}

/// What to do when an ordered pair already has a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionPolicy {
    /// The new decision replaces the previous one for the pair
    #[default]
    Replace,
    /// Every decision is kept; the most recent one is effective
    Append,
}

/// Result of recording a decision together with the opposite-direction lookup
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub decision: Decision,
    /// Effective decision from recipient back to actor, when one was looked up and exists
    pub opposite: Option<Decision>,
}

impl DecisionOutcome {
    pub fn is_mutual(&self) -> bool {
        self.decision.liked && self.opposite.as_ref().map_or(false, |d| d.liked)
    }
}

/// A batch of liker rows plus the watermark of the last row
#[derive(Debug, Clone, Default)]
pub struct LikesRows {
    pub rows: Vec<Actor>,
    /// Identifier of the last actor in `rows`, if any
    pub watermark: Option<String>,
}

impl LikesRows {
    pub fn from_rows(rows: Vec<Actor>) -> Self {
        let watermark = rows.last().map(|a| a.id.clone());
        Self { rows, watermark }
    }
}

/// One page of likers returned by the pagination engine
#[derive(Debug, Clone, Default)]
pub struct LikesPage {
    pub likers: Vec<Actor>,
    /// Absent once a short page signals the end of results
    pub next_cursor: Option<String>,
}

/// Liker entry as exposed on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liker {
    pub actor_id: String,
    pub unix_timestamp: u64,
}

impl From<&Actor> for Liker {
    fn from(actor: &Actor) -> Self {
        Self {
            actor_id: actor.id.clone(),
            unix_timestamp: actor.created_at.timestamp().max(0) as u64,
        }
    }
}
