pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{Database, DbError};
pub use repository::Repository;
