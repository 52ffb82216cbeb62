pub mod auth;
pub mod health;
pub mod task;

pub use auth::auth_config;
pub use health::health_config;
pub use task::task_config;
