// Core engine exports
pub mod decisions;
pub mod filters;
pub mod likes;

pub use decisions::DecisionEngine;
pub use filters::unreciprocated;
pub use likes::LikesEngine;
