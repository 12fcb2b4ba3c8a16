pub mod booking;
pub mod job;
pub mod lead;
pub mod message;
pub mod slot;
pub mod template;
