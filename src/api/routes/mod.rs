pub mod auth;
pub mod images;
pub mod middleware;
pub mod upload;
pub mod users;
