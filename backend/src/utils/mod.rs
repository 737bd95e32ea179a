pub mod api_token;
pub mod csv;
pub mod email;
pub mod jwt;
pub mod net;
pub mod password;
pub mod recovery;
