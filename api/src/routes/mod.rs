//! API Routes

pub mod dashboard;
pub mod events;
pub mod forms;
pub mod health;
pub mod submissions;
