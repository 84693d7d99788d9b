//! W3C WebDriver wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which the protocol returns a web element reference.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Every response wraps its payload in `value`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub value: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSessionRequest {
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    #[serde(rename = "alwaysMatch")]
    pub always_match: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Using {
    #[serde(rename = "css selector")]
    Css,
    #[serde(rename = "xpath")]
    XPath,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindRequest<'a> {
    pub using: Using,
    pub value: &'a str,
}

impl<'a> FindRequest<'a> {
    /// Selectors starting with `/` or `(` are XPath, anything else CSS.
    pub fn for_selector(selector: &'a str) -> Self {
        let using = if selector.starts_with('/') || selector.starts_with('(') {
            Using::XPath
        } else {
            Using::Css
        };
        Self {
            using,
            value: selector,
        }
    }
}

/// Opaque element reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendKeys<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Navigate<'a> {
    pub url: &'a str,
}
