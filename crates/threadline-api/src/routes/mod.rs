pub mod health;
pub mod messages;
pub mod summaries;
pub mod threads;
