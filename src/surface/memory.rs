//! In-memory scripted form surface.
//!
//! Sections, option lists, scripted transient failures and which expand
//! strategies actually open a section are all set up front; everything the
//! runner does is recorded for inspection afterwards.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::SurfaceError;
use crate::state_machine::stage::{ExpandStrategy, FieldOperation, StageDefinition, base_title};
use crate::work_item::WorkItem;

use super::{FormSurface, SectionHandle};

/// Setup for one scripted section.
#[derive(Debug, Clone)]
pub struct ScriptedSection {
    title: String,
    expanded: bool,
    opens_with: Vec<ExpandStrategy>,
    controls: Vec<String>,
    confirms_save: bool,
    expand_calls: u32,
    save_calls: u32,
}

impl ScriptedSection {
    /// A collapsed section that any strategy opens and whose saves confirm.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            expanded: false,
            opens_with: vec![
                ExpandStrategy::EditControl,
                ExpandStrategy::CardClick,
                ExpandStrategy::AnyControl,
            ],
            controls: Vec::new(),
            confirms_save: true,
            expand_calls: 0,
            save_calls: 0,
        }
    }

    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }

    /// Only these strategies open the section; others return without effect.
    pub fn opens_with(mut self, strategies: &[ExpandStrategy]) -> Self {
        self.opens_with = strategies.to_vec();
        self
    }

    /// Controls visible while the section is expanded.
    pub fn controls(mut self, controls: &[&str]) -> Self {
        self.controls = controls.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn unconfirmed_save(mut self) -> Self {
        self.confirms_save = false;
        self
    }
}

#[derive(Debug, Default)]
struct Script {
    sections: Vec<ScriptedSection>,
    options: HashMap<String, Vec<String>>,
    values: BTreeMap<String, String>,
    uploads: HashMap<String, Vec<PathBuf>>,
    failures: HashMap<String, VecDeque<SurfaceError>>,
}

impl Script {
    /// Pops the next scripted failure for `key` (`"<call>:<title or field>"`).
    fn take_failure(&mut self, key: &str) -> Result<(), SurfaceError> {
        match self.failures.get_mut(key).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn section(&mut self, handle: &SectionHandle) -> Result<&mut ScriptedSection, SurfaceError> {
        self.sections
            .get_mut(handle.index)
            .filter(|s| base_title(&s.title) == handle.title)
            .ok_or_else(|| SurfaceError::NotFound(format!("section {}", handle.title)))
    }

    fn count<F>(&self, title: &str, read: F) -> u32
    where
        F: Fn(&ScriptedSection) -> u32,
    {
        self.sections
            .iter()
            .filter(|s| base_title(&s.title) == title)
            .map(read)
            .sum()
    }
}

/// Form surface held entirely in memory.
#[derive(Debug, Default)]
pub struct ScriptedSurface {
    script: Mutex<Script>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface laid out for `definitions`, with every option field offering
    /// a spelling variant of `item`'s value so each one resolves.
    pub fn for_stages(definitions: &[StageDefinition], item: &WorkItem) -> Self {
        let mut surface = Self::new();
        for definition in definitions {
            let mut markers: Vec<&str> = definition.ready_markers.iter().map(String::as_str).collect();
            markers.extend(definition.fields.iter().map(|f| f.field_id.as_str()));
            surface = surface.section(ScriptedSection::new(&definition.title).controls(&markers));

            let Ok(stage) = definition.bind(item, &[PathBuf::from(item.media_bundle())]) else {
                continue;
            };
            for operation in &stage.operations {
                if let FieldOperation::SetFromOptions {
                    field_id,
                    desired,
                    fallback,
                } = operation
                {
                    let mut offered = vec!["Other".to_string(), desired.replace(' ', "-")];
                    if let Some(fallback) = fallback {
                        offered.push(fallback.clone());
                    }
                    let offered: Vec<&str> = offered.iter().map(String::as_str).collect();
                    surface = surface.options(field_id, &offered);
                }
            }
        }
        surface
    }

    pub fn section(self, section: ScriptedSection) -> Self {
        self.lock().sections.push(section);
        self
    }

    pub fn options(self, field_id: &str, options: &[&str]) -> Self {
        self.lock().options.insert(
            field_id.to_string(),
            options.iter().map(|o| o.to_string()).collect(),
        );
        self
    }

    /// Makes the next `times` calls matching `key` raise `error`.
    ///
    /// Keys are `"<call>:<section title or field id>"` where call is one of
    /// `locate`, `expand`, `set`, `options`, `select`, `upload`, `save`, `confirm`.
    pub fn fail_next(self, key: &str, error: SurfaceError, times: usize) -> Self {
        self.lock()
            .failures
            .entry(key.to_string())
            .or_default()
            .extend(std::iter::repeat_n(error, times));
        self
    }

    /// Value last written to a field, by typing or by selection.
    pub fn value(&self, field_id: &str) -> Option<String> {
        self.lock().values.get(field_id).cloned()
    }

    pub fn uploads(&self, field_id: &str) -> Vec<PathBuf> {
        self.lock().uploads.get(field_id).cloned().unwrap_or_default()
    }

    pub fn expand_calls(&self, base: &str) -> u32 {
        self.lock().count(base, |s| s.expand_calls)
    }

    pub fn save_calls(&self, base: &str) -> u32 {
        self.lock().count(base, |s| s.save_calls)
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FormSurface for ScriptedSurface {
    async fn locate_by_title(&self, base: &str) -> Result<SectionHandle, SurfaceError> {
        let mut script = self.lock();
        script.take_failure(&format!("locate:{base}"))?;
        script
            .sections
            .iter()
            .position(|s| base_title(&s.title) == base)
            .map(|index| SectionHandle {
                title: base.to_string(),
                index,
                element: None,
            })
            .ok_or_else(|| SurfaceError::NotFound(format!("section titled {base}")))
    }

    async fn is_expanded(&self, handle: &SectionHandle) -> Result<bool, SurfaceError> {
        Ok(self.lock().section(handle)?.expanded)
    }

    async fn expand(
        &self,
        handle: &SectionHandle,
        strategy: ExpandStrategy,
    ) -> Result<(), SurfaceError> {
        let mut script = self.lock();
        script.section(handle)?.expand_calls += 1;
        script.take_failure(&format!("expand:{}", handle.title))?;
        let section = script.section(handle)?;
        if section.opens_with.contains(&strategy) {
            section.expanded = true;
        }
        Ok(())
    }

    async fn has_control(
        &self,
        handle: &SectionHandle,
        control_id: &str,
    ) -> Result<bool, SurfaceError> {
        let mut script = self.lock();
        let section = script.section(handle)?;
        Ok(section.expanded && section.controls.iter().any(|c| c == control_id))
    }

    async fn set_field(&self, field_id: &str, value: &str) -> Result<(), SurfaceError> {
        let mut script = self.lock();
        script.take_failure(&format!("set:{field_id}"))?;
        script.values.insert(field_id.to_string(), value.to_string());
        Ok(())
    }

    async fn read_options(&self, field_id: &str) -> Result<Vec<String>, SurfaceError> {
        let mut script = self.lock();
        script.take_failure(&format!("options:{field_id}"))?;
        script
            .options
            .get(field_id)
            .cloned()
            .ok_or_else(|| SurfaceError::NotFound(format!("options for {field_id}")))
    }

    async fn select_option(&self, field_id: &str, value: &str) -> Result<(), SurfaceError> {
        let mut script = self.lock();
        script.take_failure(&format!("select:{field_id}"))?;
        let offered = script
            .options
            .get(field_id)
            .is_some_and(|options| options.iter().any(|o| o == value));
        if !offered {
            return Err(SurfaceError::NotFound(format!("option {value} for {field_id}")));
        }
        script.values.insert(field_id.to_string(), value.to_string());
        Ok(())
    }

    async fn upload(&self, field_id: &str, files: &[PathBuf]) -> Result<(), SurfaceError> {
        let mut script = self.lock();
        script.take_failure(&format!("upload:{field_id}"))?;
        script
            .uploads
            .entry(field_id.to_string())
            .or_default()
            .extend(files.iter().cloned());
        Ok(())
    }

    async fn save(&self, handle: &SectionHandle) -> Result<(), SurfaceError> {
        let mut script = self.lock();
        script.section(handle)?.save_calls += 1;
        script.take_failure(&format!("save:{}", handle.title))
    }

    async fn wait_for_save_confirmation(
        &self,
        handle: &SectionHandle,
        _timeout: Duration,
    ) -> Result<(), SurfaceError> {
        let mut script = self.lock();
        script.take_failure(&format!("confirm:{}", handle.title))?;
        if script.section(handle)?.confirms_save {
            Ok(())
        } else {
            Err(SurfaceError::NotReady(format!(
                "no save confirmation for {}",
                handle.title
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;
    use crate::work_item::sample_necklace;

    #[tokio::test]
    async fn locates_by_base_title() {
        let surface = ScriptedSurface::new()
            .section(ScriptedSection::new("Product Photos (0/5)"))
            .section(ScriptedSection::new("Additional Description (Optional)"));
        let handle = surface.locate_by_title("Additional Description").await.unwrap();
        assert_eq!(handle.index, 1);
        assert!(matches!(
            surface.locate_by_title("Pricing").await,
            Err(SurfaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn expand_only_opens_with_listed_strategies() {
        let surface = ScriptedSurface::new()
            .section(ScriptedSection::new("Send to QC").opens_with(&[ExpandStrategy::CardClick]));
        let h = surface.locate_by_title("Send to QC").await.unwrap();

        surface.expand(&h, ExpandStrategy::EditControl).await.unwrap();
        assert!(!surface.is_expanded(&h).await.unwrap());
        surface.expand(&h, ExpandStrategy::CardClick).await.unwrap();
        assert!(surface.is_expanded(&h).await.unwrap());
        assert_eq!(surface.expand_calls("Send to QC"), 2);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let surface = ScriptedSurface::new()
            .options("color", &["Gold"])
            .fail_next("select:color", SurfaceError::NotReady("stale".into()), 1);

        assert!(surface.select_option("color", "Gold").await.is_err());
        surface.select_option("color", "Gold").await.unwrap();
        assert_eq!(surface.value("color").as_deref(), Some("Gold"));
    }

    #[tokio::test]
    async fn selecting_an_unoffered_value_is_not_found() {
        let surface = ScriptedSurface::new().options("color", &["Gold"]);
        assert!(matches!(
            surface.select_option("color", "Teal").await,
            Err(SurfaceError::NotFound(_))
        ));
        assert!(surface.value("color").is_none());
    }

    #[tokio::test]
    async fn laid_out_for_a_target_offers_every_option_field() {
        let item = sample_necklace();
        let surface = ScriptedSurface::for_stages(&Target::Flipkart.stages(), &item);
        assert_eq!(
            surface.read_options("tax_code").await.unwrap(),
            vec!["Other", "GST_3"]
        );
        assert_eq!(
            surface.read_options("gemstone").await.unwrap(),
            vec!["Other", "None", "NA"]
        );
    }
}
