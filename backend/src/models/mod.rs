pub mod account;
pub mod api_token;
pub mod audit_log;
pub mod principal;
pub mod session;
