pub mod capacity;
pub mod lifecycle;
pub mod materializer;
pub mod messaging;
pub mod pipeline;
pub mod retry;
pub mod scheduling;
