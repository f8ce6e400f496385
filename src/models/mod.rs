// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Actor, Decision, DecisionOutcome, DecisionPolicy, Liker, LikesPage, LikesRows};
pub use requests::{CountLikedYouRequest, ListLikedYouRequest, ListNewLikedYouRequest, PutDecisionRequest};
pub use responses::{CountLikedYouResponse, ErrorResponse, HealthResponse, ListLikedYouResponse, PutDecisionResponse};
