pub mod account;
pub mod api_token;
pub mod audit;
pub mod session;
pub mod transaction;
