//! Declarative stage definitions and their binding to a work-item.
//!
//! A [`StageDefinition`] is static per target. Binding it against a
//! [`WorkItem`] renders every field template and produces a concrete [`Stage`]
//! whose [`FieldOperation`]s the stage runner applies in order.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::work_item::WorkItem;

/// Alternate gestures for opening a collapsed section, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpandStrategy {
    /// The section's designated edit control.
    EditControl,
    /// The section card itself.
    CardClick,
    /// Any clickable element inside the card.
    AnyControl,
}

impl std::fmt::Display for ExpandStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpandStrategy::EditControl => write!(f, "edit-control"),
            ExpandStrategy::CardClick => write!(f, "card-click"),
            ExpandStrategy::AnyControl => write!(f, "any-control"),
        }
    }
}

/// How a field's rendered value reaches the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPolicy {
    /// Typed verbatim.
    Literal,
    /// Resolved against the options the surface offers for the field.
    Options { fallback: Option<String> },
    /// The work-item's media files are attached.
    Media,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field_id: String,
    /// Literal text with `{attribute}` placeholders.
    pub template: String,
    pub policy: FieldPolicy,
}

impl FieldSpec {
    pub fn literal(field_id: &str, template: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            template: template.to_string(),
            policy: FieldPolicy::Literal,
        }
    }

    pub fn options(field_id: &str, template: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            template: template.to_string(),
            policy: FieldPolicy::Options { fallback: None },
        }
    }

    pub fn options_or(field_id: &str, template: &str, fallback: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            template: template.to_string(),
            policy: FieldPolicy::Options {
                fallback: Some(fallback.to_string()),
            },
        }
    }

    pub fn media(field_id: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            template: String::new(),
            policy: FieldPolicy::Media,
        }
    }
}

/// A concrete field operation, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOperation {
    SetLiteral {
        field_id: String,
        value: String,
    },
    /// Must always land on an observed option or the declared fallback.
    SetFromOptions {
        field_id: String,
        desired: String,
        fallback: Option<String>,
    },
    UploadMedia {
        field_id: String,
        files: Vec<PathBuf>,
    },
}

impl FieldOperation {
    /// Operation name used in logs and failures.
    pub fn describe(&self) -> String {
        match self {
            FieldOperation::SetLiteral { field_id, .. } => format!("set {field_id}"),
            FieldOperation::SetFromOptions { field_id, .. } => format!("choose {field_id}"),
            FieldOperation::UploadMedia { field_id, files } => {
                format!("upload {} file(s) to {field_id}", files.len())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Visible title; anything from the first `(` on is a live annotation.
    pub title: String,
    pub fields: Vec<FieldSpec>,
    /// Controls whose presence proves the stage is ready to fill.
    pub ready_markers: Vec<String>,
    pub expand_strategies: Vec<ExpandStrategy>,
}

impl StageDefinition {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            fields: Vec::new(),
            ready_markers: Vec::new(),
            expand_strategies: vec![ExpandStrategy::EditControl, ExpandStrategy::CardClick],
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn ready_marker(mut self, control: &str) -> Self {
        self.ready_markers.push(control.to_string());
        self
    }

    pub fn strategies(mut self, strategies: &[ExpandStrategy]) -> Self {
        self.expand_strategies = strategies.to_vec();
        self
    }

    pub fn base_title(&self) -> &str {
        base_title(&self.title)
    }

    pub fn needs_media(&self) -> bool {
        self.fields.iter().any(|f| f.policy == FieldPolicy::Media)
    }

    /// Renders every field against `item`. `media` is attached to media fields.
    pub fn bind(&self, item: &WorkItem, media: &[PathBuf]) -> Result<Stage, RunError> {
        let mut operations = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let render = |template: &str| {
                render_template(template, item).map_err(|attribute| RunError::MissingAttribute {
                    stage: self.base_title().to_string(),
                    field: spec.field_id.clone(),
                    attribute,
                })
            };
            let operation = match &spec.policy {
                FieldPolicy::Literal => FieldOperation::SetLiteral {
                    field_id: spec.field_id.clone(),
                    value: render(&spec.template)?,
                },
                FieldPolicy::Options { fallback } => FieldOperation::SetFromOptions {
                    field_id: spec.field_id.clone(),
                    desired: render(&spec.template)?,
                    fallback: fallback.clone(),
                },
                FieldPolicy::Media => {
                    if media.is_empty() {
                        return Err(RunError::MissingMedia(item.key.clone()));
                    }
                    FieldOperation::UploadMedia {
                        field_id: spec.field_id.clone(),
                        files: media.to_vec(),
                    }
                }
            };
            operations.push(operation);
        }

        Ok(Stage {
            name: self.base_title().to_string(),
            base_title: self.base_title().to_string(),
            operations,
            ready_markers: self.ready_markers.clone(),
            expand_strategies: self.expand_strategies.clone(),
        })
    }
}

/// A stage bound to one work-item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub base_title: String,
    pub operations: Vec<FieldOperation>,
    pub ready_markers: Vec<String>,
    pub expand_strategies: Vec<ExpandStrategy>,
}

/// Strips a live annotation such as `" (0/5)"` from a visible title.
pub fn base_title(title: &str) -> &str {
    title.split('(').next().unwrap_or(title).trim()
}

/// Substitutes `{name}` placeholders with work-item values.
/// Returns the name of the first attribute the item cannot supply.
pub fn render_template(template: &str, item: &WorkItem) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = rest[open + 1..open + close].trim();
        let value = item.value_of(name).ok_or_else(|| name.to_string())?;
        out.push_str(&value);
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
