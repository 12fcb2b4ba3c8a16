pub mod booking;
pub mod health;
pub mod pipeline;
pub mod slot;
pub mod template;
