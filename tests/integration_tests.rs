// Integration tests for the likes and decision engines over the in-memory store

use async_trait::async_trait;
use explore_service::core::{DecisionEngine, LikesEngine};
use explore_service::models::{Actor, Decision, DecisionPolicy, LikesRows};
use explore_service::services::{DecisionStore, InMemoryStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Barrier;

async fn recipient_with_likers(
    store: &InMemoryStore,
    likers: usize,
) -> (Actor, Vec<Actor>) {
    let recipient = store.register_actor().await;
    let mut created = Vec::with_capacity(likers);
    for _ in 0..likers {
        let liker = store.register_actor().await;
        store.insert_decision(&liker.id, &recipient.id, true).await.unwrap();
        created.push(liker);
    }
    (recipient, created)
}

async fn drain(engine: &LikesEngine, recipient: &str) -> (Vec<String>, usize) {
    let mut seen = Vec::new();
    let mut calls = 0;
    let mut cursor: Option<String> = None;

    loop {
        let page = engine.list_likers(recipient, cursor.as_deref()).await.unwrap();
        calls += 1;
        seen.extend(page.likers.into_iter().map(|a| a.id));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    (seen, calls)
}

#[tokio::test]
async fn test_full_first_page_returns_cursor() {
    let store = Arc::new(InMemoryStore::default());
    let (recipient, _) = recipient_with_likers(&store, 10).await;
    let engine = LikesEngine::new(store, 10);

    let page = engine.list_likers(&recipient.id, None).await.unwrap();

    assert_eq!(page.likers.len(), 10);
    assert!(page.next_cursor.is_some());
}

#[tokio::test]
async fn test_short_first_page_returns_everything_without_cursor() {
    let store = Arc::new(InMemoryStore::default());
    let (recipient, likers) = recipient_with_likers(&store, 7).await;
    let engine = LikesEngine::new(store, 10);

    let page = engine.list_likers(&recipient.id, None).await.unwrap();

    let expected: HashSet<String> = likers.into_iter().map(|a| a.id).collect();
    let got: HashSet<String> = page.likers.into_iter().map(|a| a.id).collect();
    assert_eq!(got, expected);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn test_paging_to_exhaustion_matches_unpaginated_fetch() {
    for total in [0usize, 1, 3, 4, 5, 8, 13] {
        let store = Arc::new(InMemoryStore::default());
        let (recipient, _) = recipient_with_likers(&store, total).await;
        let engine = LikesEngine::new(store.clone(), 4);

        let (paged, _) = drain(&engine, &recipient.id).await;
        let all: Vec<String> = store
            .query_likes_received(&recipient.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();

        let unique: HashSet<&String> = paged.iter().collect();
        assert_eq!(unique.len(), paged.len(), "duplicates with {} likers", total);
        assert_eq!(paged, all, "paged listing differs with {} likers", total);
    }
}

#[tokio::test]
async fn test_five_likers_with_page_size_two_take_three_calls() {
    let store = Arc::new(InMemoryStore::default());
    let (u0, likers) = recipient_with_likers(&store, 5).await;
    let engine = LikesEngine::new(store, 2);

    let first = engine.list_likers(&u0.id, None).await.unwrap();
    assert_eq!(first.likers.len(), 2);
    let second = engine
        .list_likers(&u0.id, first.next_cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(second.likers.len(), 2);
    let third = engine
        .list_likers(&u0.id, second.next_cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(third.likers.len(), 1);
    assert!(third.next_cursor.is_none());

    let got: Vec<String> = [first.likers, second.likers, third.likers]
        .concat()
        .into_iter()
        .map(|a| a.id)
        .collect();
    let unique: HashSet<&String> = got.iter().collect();
    let expected: HashSet<String> = likers.into_iter().map(|a| a.id).collect();

    assert_eq!(got.len(), 5);
    assert_eq!(unique.into_iter().cloned().collect::<HashSet<_>>(), expected);
}

#[tokio::test]
async fn test_garbage_cursor_is_propagated_as_store_error() {
    let store = Arc::new(InMemoryStore::default());
    let (recipient, _) = recipient_with_likers(&store, 1).await;
    let engine = LikesEngine::new(store, 10);

    let result = engine.list_likers(&recipient.id, Some("%%garbage%%")).await;
    assert!(matches!(result, Err(StoreError::InvalidInput(_))));
}

#[tokio::test]
async fn test_new_likers_exclude_liked_back() {
    let store = Arc::new(InMemoryStore::default());
    let (recipient, likers) = recipient_with_likers(&store, 4).await;

    // Recipient likes two back and passes on a third
    store.insert_decision(&recipient.id, &likers[0].id, true).await.unwrap();
    store.insert_decision(&recipient.id, &likers[2].id, true).await.unwrap();
    store.insert_decision(&recipient.id, &likers[3].id, false).await.unwrap();

    let engine = LikesEngine::new(store, 10);
    let fresh: HashSet<String> = engine
        .list_new_likers(&recipient.id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();

    assert!(!fresh.contains(&likers[0].id));
    assert!(!fresh.contains(&likers[2].id));
    assert!(fresh.contains(&likers[1].id));
    assert!(fresh.contains(&likers[3].id));
    assert_eq!(fresh.len(), 2);
}

#[tokio::test]
async fn test_mutual_like_reported_on_second_decision_only() {
    let store = Arc::new(InMemoryStore::default());
    let a = store.register_actor().await;
    let b = store.register_actor().await;
    let engine = DecisionEngine::new(store);

    assert!(!engine.put_decision(&a.id, &b.id, true).await.unwrap());
    assert!(engine.put_decision(&b.id, &a.id, true).await.unwrap());
}

#[tokio::test]
async fn test_pass_never_mutual_even_after_incoming_like() {
    let store = Arc::new(InMemoryStore::default());
    let a = store.register_actor().await;
    let b = store.register_actor().await;
    let engine = DecisionEngine::new(store);

    engine.put_decision(&b.id, &a.id, true).await.unwrap();
    assert!(!engine.put_decision(&a.id, &b.id, false).await.unwrap());
}

#[tokio::test]
async fn test_count_is_distinct_positive_decisions() {
    for policy in [DecisionPolicy::Replace, DecisionPolicy::Append] {
        let store = Arc::new(InMemoryStore::new(policy));
        let (recipient, likers) = recipient_with_likers(&store, 3).await;

        // Repeat likes must not inflate the count
        store.insert_decision(&likers[0].id, &recipient.id, true).await.unwrap();
        store.insert_decision(&likers[0].id, &recipient.id, true).await.unwrap();
        // A later pass withdraws a like
        store.insert_decision(&likers[1].id, &recipient.id, false).await.unwrap();

        let engine = LikesEngine::new(store, 10);
        assert_eq!(engine.count_likers(&recipient.id).await.unwrap(), 2, "{:?}", policy);
    }
}

#[tokio::test]
async fn test_append_policy_keeps_history_and_uses_latest() {
    let store = Arc::new(InMemoryStore::new(DecisionPolicy::Append));
    let a = store.register_actor().await;
    let b = store.register_actor().await;
    let engine = DecisionEngine::new(store.clone());

    engine.put_decision(&b.id, &a.id, true).await.unwrap();
    engine.put_decision(&b.id, &a.id, false).await.unwrap();
    assert_eq!(store.decision_rows().await, 2);

    // b's latest decision is a pass, so a's like is not mutual
    assert!(!engine.put_decision(&a.id, &b.id, true).await.unwrap());

    engine.put_decision(&b.id, &a.id, true).await.unwrap();
    assert!(engine.put_decision(&a.id, &b.id, true).await.unwrap());
}

/// Store that uses the non-atomic `record_decision` and parks every insert
/// at a barrier, forcing two opposite likes to interleave.
struct InterleavingStore {
    inner: InMemoryStore,
    barrier: Barrier,
}

#[async_trait]
impl DecisionStore for InterleavingStore {
    async fn insert_decision(&self, from: &str, to: &str, liked: bool) -> Result<Decision, StoreError> {
        let decision = self.inner.insert_decision(from, to, liked).await?;
        self.barrier.wait().await;
        Ok(decision)
    }

    async fn query_likes_start(&self, recipient: &str, page_size: usize) -> Result<LikesRows, StoreError> {
        self.inner.query_likes_start(recipient, page_size).await
    }

    async fn query_likes_after(&self, recipient: &str, cursor: &str, page_size: usize) -> Result<LikesRows, StoreError> {
        self.inner.query_likes_after(recipient, cursor, page_size).await
    }

    async fn query_likes_received(&self, recipient: &str) -> Result<Vec<Actor>, StoreError> {
        self.inner.query_likes_received(recipient).await
    }

    async fn query_likes_sent(&self, actor: &str) -> Result<Vec<Actor>, StoreError> {
        self.inner.query_likes_sent(actor).await
    }

    async fn query_like_count(&self, recipient: &str) -> Result<u64, StoreError> {
        self.inner.query_like_count(recipient).await
    }

    async fn query_decision(&self, from: &str, to: &str) -> Result<Option<Decision>, StoreError> {
        self.inner.query_decision(from, to).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "interleaving"
    }
}

// Known race: without an atomic record_decision both sides see each other
// and the match is reported twice.
#[tokio::test]
async fn test_non_atomic_decisions_can_double_count_a_match() {
    let inner = InMemoryStore::default();
    let a = inner.register_actor().await;
    let b = inner.register_actor().await;
    let store = Arc::new(InterleavingStore { inner, barrier: Barrier::new(2) });
    let engine = DecisionEngine::new(store);

    let (first, second) = tokio::join!(
        engine.put_decision(&a.id, &b.id, true),
        engine.put_decision(&b.id, &a.id, true),
    );

    assert!(first.unwrap());
    assert!(second.unwrap());
}

#[tokio::test]
async fn test_atomic_decisions_report_match_exactly_once() {
    let store = Arc::new(InMemoryStore::default());
    let a = store.register_actor().await;
    let b = store.register_actor().await;
    let engine = DecisionEngine::new(store);

    let (first, second) = tokio::join!(
        engine.put_decision(&a.id, &b.id, true),
        engine.put_decision(&b.id, &a.id, true),
    );

    let reported = [first.unwrap(), second.unwrap()];
    assert_eq!(reported.iter().filter(|m| **m).count(), 1);
}

/// Store whose opposite-direction lookup always fails
struct BrokenLookupStore {
    inner: InMemoryStore,
}

#[async_trait]
impl DecisionStore for BrokenLookupStore {
    async fn insert_decision(&self, from: &str, to: &str, liked: bool) -> Result<Decision, StoreError> {
        self.inner.insert_decision(from, to, liked).await
    }

    async fn query_likes_start(&self, recipient: &str, page_size: usize) -> Result<LikesRows, StoreError> {
        self.inner.query_likes_start(recipient, page_size).await
    }

    async fn query_likes_after(&self, recipient: &str, cursor: &str, page_size: usize) -> Result<LikesRows, StoreError> {
        self.inner.query_likes_after(recipient, cursor, page_size).await
    }

    async fn query_likes_received(&self, recipient: &str) -> Result<Vec<Actor>, StoreError> {
        self.inner.query_likes_received(recipient).await
    }

    async fn query_likes_sent(&self, actor: &str) -> Result<Vec<Actor>, StoreError> {
        self.inner.query_likes_sent(actor).await
    }

    async fn query_like_count(&self, recipient: &str) -> Result<u64, StoreError> {
        self.inner.query_like_count(recipient).await
    }

    async fn query_decision(&self, _from: &str, _to: &str) -> Result<Option<Decision>, StoreError> {
        Err(StoreError::InvalidInput("lookup unavailable".to_string()))
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "broken-lookup"
    }
}

#[tokio::test]
async fn test_failed_match_check_keeps_the_decision() {
    let inner = InMemoryStore::default();
    let a = inner.register_actor().await;
    let b = inner.register_actor().await;
    let store = Arc::new(BrokenLookupStore { inner });
    let engine = DecisionEngine::new(store.clone());

    let err = engine.put_decision(&a.id, &b.id, true).await.unwrap_err();
    let decision_id = match err {
        StoreError::MatchCheck { decision_id, .. } => decision_id,
        other => panic!("expected MatchCheck, got {:?}", other),
    };

    // The decision is durably recorded despite the error
    assert_eq!(store.inner.query_like_count(&b.id).await.unwrap(), 1);
    assert!(decision_id > 0);

    // A pass never looks up the opposite direction
    assert!(!engine.put_decision(&a.id, &b.id, false).await.unwrap());
}
