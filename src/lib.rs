//! Explore service - likes listings and mutual match detection
//!
//! Exposes four operations over JSON endpoints: list everyone who liked an
//! actor (cursor paginated), list likers not yet liked back, count likes
//! received, and record a like/pass while detecting mutual likes.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{DecisionEngine, LikesEngine};
pub use models::{Actor, Decision, DecisionPolicy, Liker, LikesPage};
pub use services::{DecisionStore, InMemoryStore, PostgresClient, StoreError};
