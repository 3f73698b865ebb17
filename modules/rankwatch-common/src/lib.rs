pub mod config;
pub mod error;
pub mod page_key;
pub mod site;
pub mod types;
pub mod window;

pub use config::Config;
pub use error::{InsightError, SourceError};
pub use page_key::{normalize_page_key, page_path};
pub use site::SiteKey;
pub use types::*;
pub use window::DateWindow;
