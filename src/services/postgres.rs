use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

use crate::config::DatabaseSettings;
use crate::models::{Actor, Decision, DecisionOutcome, DecisionPolicy, LikesRows};
use crate::services::store::{DecisionStore, StoreError};

const DEFAULT_CONNECT_ATTEMPTS: usize = 15;
const DEFAULT_CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// PostgreSQL-backed decision store
///
/// Decisions live in a single `decisions` table; reads go through the
/// `effective_decisions` view which keeps only the most recent row per
/// ordered pair. Identifiers are bound as text and cast to `uuid` in SQL,
/// so malformed ids and cursors fail inside the query.
pub struct PostgresClient {
    pool: PgPool,
    policy: DecisionPolicy,
}

impl PostgresClient {
    /// Connect using the database settings, retrying while the server comes up
    pub async fn connect(
        settings: &DatabaseSettings,
        policy: DecisionPolicy,
    ) -> Result<Self, StoreError> {
        let options = PgPoolOptions::new()
            .max_connections(settings.max_connections.unwrap_or(10))
            .min_connections(settings.min_connections.unwrap_or(1))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)))
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)))
            .test_before_acquire(true);

        let attempts = settings
            .connect_attempts
            .unwrap_or(DEFAULT_CONNECT_ATTEMPTS)
            .max(1);
        let delay_ms = settings
            .connect_retry_delay_ms
            .unwrap_or(DEFAULT_CONNECT_RETRY_DELAY_MS);

        tracing::info!("Connecting to PostgreSQL (up to {} attempts)", attempts);

        let pool = connect_with_retry(options, &settings.url, attempts, delay_ms).await?;

        Self::from_pool(pool, policy).await
    }

    /// Wrap an existing pool, running migrations on it first
    pub async fn from_pool(pool: PgPool, policy: DecisionPolicy) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool, policy })
    }

    /// Create an actor row. Registration normally happens outside this service.
    pub async fn insert_actor(&self) -> Result<Actor, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO actors DEFAULT VALUES
            RETURNING id::text AS id, created_at
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        actor_from_row(&row)
    }

    async fn fetch_actors(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Actor>, StoreError> {
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(actor_from_row).collect()
    }
}

async fn connect_with_retry(
    options: PgPoolOptions,
    url: &str,
    attempts: usize,
    delay_ms: u64,
) -> Result<PgPool, StoreError> {
    let strategy = FixedInterval::from_millis(delay_ms).take(attempts - 1);
    let mut attempt = 0usize;

    Retry::spawn(strategy, || {
        attempt += 1;
        let current = attempt;
        let options = options.clone();
        async move {
            options.connect(url).await.map_err(|e| {
                tracing::warn!(attempt = current, error = %e, "Failed to connect to PostgreSQL, will retry");
                e
            })
        }
    })
    .await
    .map_err(|source| StoreError::ConnectExhausted { attempts, source })
}

fn actor_from_row(row: &PgRow) -> Result<Actor, StoreError> {
    Ok(Actor {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn decision_from_row(row: &PgRow) -> Result<Decision, StoreError> {
    Ok(Decision {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        from_actor: row.try_get("from_actor")?,
        to_actor: row.try_get("to_actor")?,
        liked: row.try_get("liked")?,
    })
}

async fn insert_in(
    conn: &mut PgConnection,
    policy: DecisionPolicy,
    from_actor: &str,
    to_actor: &str,
    liked: bool,
) -> Result<Decision, StoreError> {
    if policy == DecisionPolicy::Replace {
        sqlx::query(
            r#"
            DELETE FROM decisions
            WHERE from_actor = $1::uuid AND to_actor = $2::uuid
            "#,
        )
        .bind(from_actor)
        .bind(to_actor)
        .execute(&mut *conn)
        .await?;
    }

    let row = sqlx::query(
        r#"
        INSERT INTO decisions (from_actor, to_actor, liked)
        VALUES ($1::uuid, $2::uuid, $3)
        RETURNING id, created_at, from_actor::text AS from_actor, to_actor::text AS to_actor, liked
        "#,
    )
    .bind(from_actor)
    .bind(to_actor)
    .bind(liked)
    .fetch_one(&mut *conn)
    .await?;

    decision_from_row(&row)
}

async fn lookup_in(
    conn: &mut PgConnection,
    from_actor: &str,
    to_actor: &str,
) -> Result<Option<Decision>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT id, created_at, from_actor::text AS from_actor, to_actor::text AS to_actor, liked
        FROM decisions
        WHERE from_actor = $1::uuid AND to_actor = $2::uuid
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(from_actor)
    .bind(to_actor)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(decision_from_row).transpose()
}

#[async_trait]
impl DecisionStore for PostgresClient {
    async fn insert_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
        liked: bool,
    ) -> Result<Decision, StoreError> {
        // Replace needs its delete and insert to land together
        let mut tx = self.pool.begin().await?;
        let decision = insert_in(&mut tx, self.policy, from_actor, to_actor, liked).await?;
        tx.commit().await?;

        tracing::debug!(
            "Inserted decision {}: {} -> {} (liked={})",
            decision.id,
            decision.from_actor,
            decision.to_actor,
            decision.liked
        );

        Ok(decision)
    }

    async fn query_likes_start(
        &self,
        recipient: &str,
        page_size: usize,
    ) -> Result<LikesRows, StoreError> {
        let query = sqlx::query(
            r#"
            SELECT a.id::text AS id, a.created_at
            FROM effective_decisions d
            JOIN actors a ON a.id = d.from_actor
            WHERE d.to_actor = $1::uuid AND d.liked
            ORDER BY a.id
            LIMIT $2
            "#,
        )
        .bind(recipient)
        .bind(page_size as i64);

        Ok(LikesRows::from_rows(self.fetch_actors(query).await?))
    }

    async fn query_likes_after(
        &self,
        recipient: &str,
        cursor: &str,
        page_size: usize,
    ) -> Result<LikesRows, StoreError> {
        let query = sqlx::query(
            r#"
            SELECT a.id::text AS id, a.created_at
            FROM effective_decisions d
            JOIN actors a ON a.id = d.from_actor
            WHERE d.to_actor = $1::uuid AND d.liked AND a.id > $2::uuid
            ORDER BY a.id
            LIMIT $3
            "#,
        )
        .bind(recipient)
        .bind(cursor)
        .bind(page_size as i64);

        Ok(LikesRows::from_rows(self.fetch_actors(query).await?))
    }

    async fn query_likes_received(&self, recipient: &str) -> Result<Vec<Actor>, StoreError> {
        let query = sqlx::query(
            r#"
            SELECT a.id::text AS id, a.created_at
            FROM effective_decisions d
            JOIN actors a ON a.id = d.from_actor
            WHERE d.to_actor = $1::uuid AND d.liked
            ORDER BY a.id
            "#,
        )
        .bind(recipient);

        self.fetch_actors(query).await
    }

    async fn query_likes_sent(&self, actor: &str) -> Result<Vec<Actor>, StoreError> {
        let query = sqlx::query(
            r#"
            SELECT a.id::text AS id, a.created_at
            FROM effective_decisions d
            JOIN actors a ON a.id = d.to_actor
            WHERE d.from_actor = $1::uuid AND d.liked
            ORDER BY a.id
            "#,
        )
        .bind(actor);

        self.fetch_actors(query).await
    }

    async fn query_like_count(&self, recipient: &str) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS liked_count
            FROM effective_decisions
            WHERE to_actor = $1::uuid AND liked
            "#,
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("liked_count")?;
        Ok(count.max(0) as u64)
    }

    async fn query_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
    ) -> Result<Option<Decision>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        lookup_in(&mut conn, from_actor, to_actor).await
    }

    /// Insert and opposite lookup in one transaction.
    ///
    /// A transaction-scoped advisory lock on the unordered pair serializes
    /// the two directions, so the second of two concurrent likes always sees
    /// the first. A failed lookup rolls the insert back.
    async fn record_decision(
        &self,
        from_actor: &str,
        to_actor: &str,
        liked: bool,
        check_opposite: bool,
    ) -> Result<DecisionOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            SELECT pg_advisory_xact_lock(
                hashtextextended(LEAST($1::uuid, $2::uuid)::text || ':' || GREATEST($1::uuid, $2::uuid)::text, 0)
            )
            "#,
        )
        .bind(from_actor)
        .bind(to_actor)
        .execute(&mut *tx)
        .await?;

        let decision = insert_in(&mut tx, self.policy, from_actor, to_actor, liked).await?;
        let opposite = if check_opposite {
            lookup_in(&mut tx, to_actor, from_actor).await?
        } else {
            None
        };

        tx.commit().await?;

        Ok(DecisionOutcome { decision, opposite })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
