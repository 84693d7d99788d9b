//! [`FormSurface`] over a WebDriver session.
//!
//! Structural selectors are configuration: they change whenever a target
//! redesigns its pages, so none of them are compiled in beyond defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::SurfaceError;
use crate::pacing::PacingPolicy;
use crate::state_machine::stage::{ExpandStrategy, base_title};
use crate::surface::{FormSurface, SectionHandle};

use super::client::WebDriverClient;
use super::types::ElementRef;

/// CSS (or XPath, when starting with `/` or `(`) selectors.
/// `{field}` is replaced by the field id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Every section card on the page.
    pub section: String,
    /// Title element, searched within a card.
    pub section_title: String,
    /// Present within a card while it is collapsed.
    pub collapsed_indicator: String,
    /// The card's designated edit control.
    pub edit_control: String,
    /// Any clickable element within a card.
    pub any_control: String,
    /// A form control by field id.
    pub control: String,
    /// Selectable options for a field.
    pub option: String,
    /// File input for a media field.
    pub file_input: String,
    /// Save or submit button, searched within the card first.
    pub save_button: String,
    /// A modal whose disappearance confirms a save.
    pub modal: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            section: "[data-section], section.card".into(),
            section_title: "[data-section-title], h2, h3".into(),
            collapsed_indicator: "[aria-expanded='false'], .collapsed".into(),
            edit_control: "[data-action='edit'], button.edit".into(),
            any_control: "button, [role='button'], a".into(),
            control: "[name='{field}'], [data-field='{field}']".into(),
            option: "select[name='{field}'] option, [data-options-for='{field}'] [role='option']"
                .into(),
            file_input: "input[type='file'][name='{field}'], [data-field='{field}'] input[type='file']"
                .into(),
            save_button: "[data-action='save'], button[type='submit']".into(),
            modal: "[role='dialog'], .modal.show".into(),
        }
    }
}

impl SelectorConfig {
    fn for_field(template: &str, field_id: &str) -> String {
        template.replace("{field}", field_id)
    }
}

pub struct WebDriverSurface {
    client: WebDriverClient,
    selectors: SelectorConfig,
    pacing: PacingPolicy,
    poll_interval: Duration,
}

impl WebDriverSurface {
    pub fn new(client: WebDriverClient, selectors: SelectorConfig, pacing: PacingPolicy) -> Self {
        Self {
            client,
            selectors,
            pacing,
            poll_interval: Duration::from_millis(250),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Loads the form's start page.
    pub async fn open(&self, url: &str) -> Result<(), SurfaceError> {
        self.client.navigate(url).await?;
        Ok(())
    }

    /// Ends the underlying session.
    pub async fn close(self) -> Result<(), SurfaceError> {
        self.client.close().await?;
        Ok(())
    }

    async fn cards(&self) -> Result<Vec<ElementRef>, SurfaceError> {
        Ok(self.client.find_all(&self.selectors.section).await?)
    }

    async fn card(&self, handle: &SectionHandle) -> Result<ElementRef, SurfaceError> {
        if let Some(id) = &handle.element {
            return Ok(ElementRef { id: id.clone() });
        }
        self.cards()
            .await?
            .into_iter()
            .nth(handle.index)
            .ok_or_else(|| SurfaceError::NotFound(format!("section {}", handle.title)))
    }

    async fn first_within(
        &self,
        card: &ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, SurfaceError> {
        Ok(self
            .client
            .find_all_within(card, selector)
            .await?
            .into_iter()
            .next())
    }

    async fn option_elements(&self, field_id: &str) -> Result<Vec<(ElementRef, String)>, SurfaceError> {
        let selector = SelectorConfig::for_field(&self.selectors.option, field_id);
        let mut labelled = Vec::new();
        for element in self.client.find_all(&selector).await? {
            let text = self.client.text(&element).await?;
            let text = text.trim();
            if !text.is_empty() {
                labelled.push((element, text.to_string()));
            }
        }
        Ok(labelled)
    }
}

impl FormSurface for WebDriverSurface {
    async fn locate_by_title(&self, base: &str) -> Result<SectionHandle, SurfaceError> {
        for (index, card) in self.cards().await?.into_iter().enumerate() {
            let Some(title) = self.first_within(&card, &self.selectors.section_title).await? else {
                continue;
            };
            let text = self.client.text(&title).await?;
            if base_title(&text) == base {
                return Ok(SectionHandle {
                    title: base.to_string(),
                    index,
                    element: Some(card.id),
                });
            }
        }
        Err(SurfaceError::NotFound(format!("section titled {base}")))
    }

    async fn is_expanded(&self, handle: &SectionHandle) -> Result<bool, SurfaceError> {
        let card = self.card(handle).await?;
        let collapsed = self
            .first_within(&card, &self.selectors.collapsed_indicator)
            .await?;
        Ok(collapsed.is_none())
    }

    async fn expand(
        &self,
        handle: &SectionHandle,
        strategy: ExpandStrategy,
    ) -> Result<(), SurfaceError> {
        let card = self.card(handle).await?;
        let target = match strategy {
            ExpandStrategy::CardClick => card,
            ExpandStrategy::EditControl => self
                .first_within(&card, &self.selectors.edit_control)
                .await?
                .ok_or_else(|| SurfaceError::NotFound(format!("edit control of {}", handle.title)))?,
            ExpandStrategy::AnyControl => self
                .first_within(&card, &self.selectors.any_control)
                .await?
                .ok_or_else(|| SurfaceError::NotFound(format!("control in {}", handle.title)))?,
        };
        debug!(section = %handle.title, %strategy, "expanding");
        self.client.click(&target).await?;
        Ok(())
    }

    async fn has_control(
        &self,
        handle: &SectionHandle,
        control_id: &str,
    ) -> Result<bool, SurfaceError> {
        let card = self.card(handle).await?;
        let selector = SelectorConfig::for_field(&self.selectors.control, control_id);
        Ok(self.first_within(&card, &selector).await?.is_some())
    }

    async fn set_field(&self, field_id: &str, value: &str) -> Result<(), SurfaceError> {
        let selector = SelectorConfig::for_field(&self.selectors.control, field_id);
        let element = self.client.find(&selector).await?;
        self.client.clear(&element).await?;
        let mut buf = [0u8; 4];
        for ch in value.chars() {
            self.client.send_keys(&element, ch.encode_utf8(&mut buf)).await?;
            let pause = self.pacing.keystroke_delay();
            if !pause.is_zero() {
                sleep(pause).await;
            }
        }
        Ok(())
    }

    async fn read_options(&self, field_id: &str) -> Result<Vec<String>, SurfaceError> {
        Ok(self
            .option_elements(field_id)
            .await?
            .into_iter()
            .map(|(_, text)| text)
            .collect())
    }

    async fn select_option(&self, field_id: &str, value: &str) -> Result<(), SurfaceError> {
        let option = self
            .option_elements(field_id)
            .await?
            .into_iter()
            .find(|(_, text)| text == value)
            .ok_or_else(|| SurfaceError::NotFound(format!("option {value} for {field_id}")))?;
        self.client.click(&option.0).await?;
        Ok(())
    }

    async fn upload(&self, field_id: &str, files: &[PathBuf]) -> Result<(), SurfaceError> {
        let selector = SelectorConfig::for_field(&self.selectors.file_input, field_id);
        let input = self.client.find(&selector).await?;
        let paths = files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.client.send_keys(&input, &paths).await?;
        Ok(())
    }

    async fn save(&self, handle: &SectionHandle) -> Result<(), SurfaceError> {
        let card = self.card(handle).await?;
        let button = match self.first_within(&card, &self.selectors.save_button).await? {
            Some(button) => button,
            None => self.client.find(&self.selectors.save_button).await?,
        };
        self.client.click(&button).await?;
        Ok(())
    }

    async fn wait_for_save_confirmation(
        &self,
        handle: &SectionHandle,
        timeout: Duration,
    ) -> Result<(), SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut open = false;
            for modal in self.client.find_all(&self.selectors.modal).await? {
                if self.client.is_displayed(&modal).await? {
                    open = true;
                    break;
                }
            }
            if !open {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SurfaceError::NotReady(format!(
                    "save of {} not confirmed within {:?}",
                    handle.title, timeout
                )));
            }
            sleep(self.poll_interval).await;
        }
    }
}
