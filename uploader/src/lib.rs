//! Upload a video to YouTube, or pick an existing one, and attach a directory of caption files.

pub mod config;
pub mod error;
pub mod languages;
pub mod metadata;
pub mod oauth;
pub mod orchestrator;
pub mod session;
pub mod youtube_api;

pub use config::SessionConfig;
pub use error::Error;
pub use languages::LanguageTable;
pub use orchestrator::{
    BatchSummary, CaptionFile, CaptionOutcome, Platform, RunReport, Target, UploadPlan,
    UploadRequest,
};
pub use session::Session;
