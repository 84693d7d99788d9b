//! Drives multi-stage marketplace listing forms and records, per work-item,
//! which targets already hold the listing.

pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod media;
pub mod orchestrator;
pub mod pacing;
pub mod resolver;
pub mod retry;
pub mod state_machine;
pub mod surface;
pub mod target;
pub mod ui;
pub mod work_item;
