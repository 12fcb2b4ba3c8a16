pub mod sqlite_template_repo;
pub mod sqlite_slot_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_job_repo;
pub mod sqlite_message_log_repo;

pub mod postgres_template_repo;
pub mod postgres_slot_repo;
pub mod postgres_booking_repo;
pub mod postgres_job_repo;
pub mod postgres_message_log_repo;
