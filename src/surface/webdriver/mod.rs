pub mod client;
pub mod error;
pub mod surface;
pub mod types;

pub use client::WebDriverClient;
pub use error::WebDriverError;
pub use surface::{SelectorConfig, WebDriverSurface};
