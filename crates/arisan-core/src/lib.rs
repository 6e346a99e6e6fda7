pub mod announcements;
pub mod auth;
pub mod config;
pub mod error;
pub mod expenses;
pub mod groups;
pub mod lottery;
pub mod members;
pub mod model;
pub mod payments;
pub mod reports;
pub mod rules;
pub mod settings;
pub mod store;
pub mod watch;

pub use config::{ai_configured, AiSettings, AppConfig};
pub use error::{Error, Result};
pub use model::*;
pub use store::{Collection, Store};
