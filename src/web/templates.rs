//! Page templates, embedded at compile time

use serde::Serialize;
use tera::{Context, Tera};

use crate::core::version::long_version;
use crate::scanner::events::ProgressMessage;
use crate::scanner::state::WorkflowState;
use crate::scanner::workflow::ScanOutcome;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const PAGE_TITLE: &str = "Git Repository Security Scanner";

/// Tera with every page registered; `.html` names get autoescaping
pub fn build() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(INDEX_TEMPLATE, include_str!("../../templates/index.html.tera"))?;
    Ok(tera)
}

#[derive(Debug, Serialize)]
pub struct IndexPage<'a> {
    pub title: &'a str,
    pub default_url: &'a str,
    pub repo_url: &'a str,
    pub state: WorkflowState,
    pub messages: &'a [ProgressMessage],
    pub outcome: Option<&'a ScanOutcome>,
    pub version: String,
}

impl<'a> IndexPage<'a> {
    pub fn new(default_url: &'a str) -> Self {
        Self {
            title: PAGE_TITLE,
            default_url,
            repo_url: default_url,
            state: WorkflowState::Idle,
            messages: &[],
            outcome: None,
            version: long_version(),
        }
    }
}

pub fn render_index(tera: &Tera, page: &IndexPage<'_>) -> tera::Result<String> {
    let context = Context::from_serialize(page)?;
    tera.render(INDEX_TEMPLATE, &context)
}
