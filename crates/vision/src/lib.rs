//! Clients for the vision service that locates text, icons and charts in
//! slide images.
//!
//! [`GeminiClient`] calls the live service; [`ReplayClient`] serves recorded
//! responses from disk so a deck can be rebuilt offline.

pub mod config;
pub mod gemini;
pub mod replay;

pub use config::VisionConfig;
pub use gemini::GeminiClient;
pub use replay::ReplayClient;
