pub mod config;
pub mod error;
pub mod store;
pub mod timestamp;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, TrackerError};
pub use store::SessionStore;
pub use types::{ActiveSession, Distraction, Session, SessionId, SessionTimeline};
