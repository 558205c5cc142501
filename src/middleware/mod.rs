pub mod auth;
pub mod context;
pub mod response;

pub use auth::session_auth;
pub use context::request_context;
pub use response::{ApiResponse, ApiResult};
