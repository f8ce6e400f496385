use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to list everyone who liked the recipient, one page at a time
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListLikedYouRequest {
    #[validate(length(min = 1))]
    pub recipient_user_id: String,
    #[serde(default)]
    pub pagination_token: Option<String>,
}

/// Request to list likers the recipient has not liked back
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListNewLikedYouRequest {
    #[validate(length(min = 1))]
    pub recipient_user_id: String,
}

/// Request to count likes received
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CountLikedYouRequest {
    #[validate(length(min = 1))]
    pub recipient_user_id: String,
}

/// Request to record a like or pass
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PutDecisionRequest {
    #[validate(length(min = 1))]
    pub actor_user_id: String,
    #[validate(length(min = 1))]
    pub recipient_user_id: String,
    pub liked_recipient: bool,
}
