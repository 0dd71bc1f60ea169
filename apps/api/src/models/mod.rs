pub mod message;
pub mod plan;
pub mod posting;
pub mod tag;
pub mod user;
