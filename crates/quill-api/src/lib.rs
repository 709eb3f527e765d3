pub mod auth;
pub mod cache;
pub mod comments;
pub mod error;
pub mod feeds;
pub mod follows;
pub mod media;
pub mod middleware;
pub mod pagination;
pub mod posts;
pub mod routes;
