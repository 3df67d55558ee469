use anyhow::Context;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::{
    build::report::ValidationReport, config::Config, error::Result, model::course::CourseGraph,
};

/// Consumes the result of a build, such as a site generator or search indexer would.
pub trait Renderer {
    fn name(&self) -> &str;

    fn render(&self, ctx: &RenderContext<'_>) -> Result<()>;
}

#[non_exhaustive]
#[derive(Debug)]
pub struct RenderContext<'a> {
    /// The root directory of the content tree.
    pub root: &'a Path,
    /// The configuration of the content tree.
    pub config: &'a Config,
    /// Every course that assembled cleanly.
    pub graph: &'a CourseGraph,
    /// The complete validation report of the run.
    pub report: &'a ValidationReport,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        root: &'a Path,
        config: &'a Config,
        graph: &'a CourseGraph,
        report: &'a ValidationReport,
    ) -> Self {
        Self {
            root,
            config,
            graph,
            report,
        }
    }
}

/// Writes the course graph as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    destination: PathBuf,
}

impl JsonRenderer {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl Renderer for JsonRenderer {
    fn name(&self) -> &str {
        "json"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<()> {
        if let Some(parent) = self.destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(ctx.graph)
            .with_context(|| "Failed to serialize the course graph")?;

        fs::write(&self.destination, json)
            .with_context(|| format!("Failed to write {}", self.destination.display()))?;

        info!(
            "Wrote {} course(s) to {}",
            ctx.graph.courses.len(),
            self.destination.display()
        );

        Ok(())
    }
}
