mod auth;
mod bearer;
mod config;
mod error;
mod handlers;
mod object_id;
mod repository;
mod routes;
mod store;
mod telemetry;
mod types;

pub use auth::*;
pub use config::*;
pub use error::*;
pub use object_id::*;
pub use repository::*;
pub use routes::*;
pub use store::*;
pub use telemetry::*;
pub use types::*;
