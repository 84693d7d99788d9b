//! The Form Surface: the opaque capability the stage runner commands and queries.
//!
//! Every call may raise [`SurfaceError::NotReady`] (retriable) or
//! [`SurfaceError::NotFound`] (terminal). Methods take `&self` so a unit
//! operation can be handed to the retry executor as a plain closure; a
//! session is still owned by exactly one run, which holds it by `&mut`.

pub mod memory;
pub mod webdriver;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::state_machine::stage::ExpandStrategy;

pub use memory::{ScriptedSection, ScriptedSurface};
pub use webdriver::WebDriverSurface;

/// A located section of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHandle {
    /// Base title the section was located by.
    pub title: String,
    /// Position of the section on the surface.
    pub index: usize,
    /// Transport-specific reference, if the surface has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
}

pub trait FormSurface: Send + Sync {
    /// Finds the section whose visible title, minus any live annotation, is `base_title`.
    fn locate_by_title(
        &self,
        base_title: &str,
    ) -> impl Future<Output = Result<SectionHandle, SurfaceError>> + Send;

    /// Whether the section shows no collapsed indicator.
    fn is_expanded(
        &self,
        handle: &SectionHandle,
    ) -> impl Future<Output = Result<bool, SurfaceError>> + Send;

    fn expand(
        &self,
        handle: &SectionHandle,
        strategy: ExpandStrategy,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    /// Whether the named interactive control is present in the section.
    fn has_control(
        &self,
        handle: &SectionHandle,
        control_id: &str,
    ) -> impl Future<Output = Result<bool, SurfaceError>> + Send;

    fn set_field(
        &self,
        field_id: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    fn read_options(
        &self,
        field_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, SurfaceError>> + Send;

    fn select_option(
        &self,
        field_id: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    fn upload(
        &self,
        field_id: &str,
        files: &[PathBuf],
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    fn save(&self, handle: &SectionHandle) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    /// Waits up to `timeout` for the save confirmation signal.
    /// Not observing it in time is [`SurfaceError::NotReady`].
    fn wait_for_save_confirmation(
        &self,
        handle: &SectionHandle,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;
}
