pub mod audit_logs;
pub mod users;
