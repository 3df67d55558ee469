use anyhow::{bail, Context};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::Result,
    model::{
        course::CourseGraph,
        lesson::{Lesson, LessonId},
    },
};

use self::{
    graph::CourseGraphBuilder,
    lesson::{check_sections, load_lesson},
    render::{RenderContext, Renderer},
    report::{course_of, ValidationReport, ValidationReporter},
    resolve::ReferenceResolver,
    scan::ContentScanner,
};

pub mod front_matter;
pub mod graph;
pub mod lesson;
pub mod render;
pub mod report;
pub mod resolve;
pub mod scan;
pub mod sections;

/// The result of a build: the complete report, and the graph of every course that
/// assembled.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildOutput {
    pub report: ValidationReport,
    pub graph: CourseGraph,
    /// Where each uniquely claimed lesson id lives.
    #[serde(skip)]
    pub locations: BTreeMap<LessonId, PathBuf>,
}

/// Drives a content tree through discovery, per-file parsing, reference resolution and
/// course assembly, then hands the result to every registered renderer.
pub struct CourseBuilder {
    root: PathBuf,
    config: Config,
    renderers: Vec<Box<dyn Renderer>>,
}

impl CourseBuilder {
    /// Prepare a build of `root`, reading `course.toml` from it when present.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::load_or_default(&root)?;

        Ok(Self::load_with_config(root, config))
    }

    pub fn load_with_config(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
            renderers: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Force strict mode on, regardless of the configuration.
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.config.course.strict |= strict;
        self
    }

    pub fn with_renderer(&mut self, renderer: impl Renderer + 'static) -> &mut Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    pub fn build(&self) -> Result<BuildOutput> {
        if !self.root.is_dir() {
            bail!("{} is not a directory", self.root.display());
        }

        let validation = &self.config.course;
        let mut reporter = ValidationReporter::new();

        let courses = ContentScanner::new(&self.root, validation)
            .scan(&mut reporter)
            .with_context(|| format!("Failed to scan {}", self.root.display()))?;

        let paths = courses
            .iter()
            .flat_map(|course| course.lesson_paths())
            .collect::<Vec<_>>();

        debug!("Parsing {} lesson file(s)", paths.len());

        let root = self.root.as_path();
        let parsed = paths
            .par_iter()
            .map(|path| load_lesson(root, path))
            .collect::<Vec<_>>();

        let mut lessons = Vec::new();
        let mut failed = BTreeSet::new();

        for (path, result) in paths.iter().zip(parsed) {
            match result {
                Ok(lesson) => {
                    for diagnostic in check_sections(&lesson, validation) {
                        reporter.push(diagnostic);
                    }
                    lessons.push(lesson);
                }
                Err(diagnostic) => {
                    warn!("Skipping {}: {}", path.display(), diagnostic.message);
                    failed.insert(path.to_path_buf());
                    reporter.push(diagnostic);
                }
            }
        }

        let resolution =
            ReferenceResolver::new(validation, &courses).resolve(&lessons, &failed, &mut reporter);

        let mut by_course = group_by_course(lessons);
        let assembled = courses
            .iter()
            .map(|course| (course, by_course.remove(&course.id).unwrap_or_default()))
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(course, lessons)| {
                CourseGraphBuilder::new(course, lessons)
                    .strict(validation.strict)
                    .broken(course.unreadable || resolution.broken.contains(&course.id))
                    .build()
            })
            .collect::<Vec<_>>();

        let mut graph = CourseGraph::default();
        for (source, (course, course_reporter)) in courses.iter().zip(assembled) {
            reporter.merge(course_reporter);

            match course {
                Some(course) => graph.courses.push(course),
                None => {
                    warn!("Course `{}` has structural errors and was skipped", source.id);
                    graph.skipped.push(source.id.clone());
                }
            }
        }

        let report = reporter.finish(validation.strict);

        info!(
            "Validated {} lesson file(s) in {} course(s): {} error(s), {} warning(s)",
            paths.len(),
            courses.len(),
            report.errors.len(),
            report.warnings.len()
        );

        let ctx = RenderContext::new(&self.root, &self.config, &graph, &report);
        for renderer in &self.renderers {
            debug!("Running the {} renderer", renderer.name());

            renderer
                .render(&ctx)
                .with_context(|| format!("The {} renderer failed", renderer.name()))?;
        }

        Ok(BuildOutput {
            report,
            graph,
            locations: resolution.locations,
        })
    }
}

/// Split lessons by the course directory they live in.
fn group_by_course(lessons: Vec<Lesson>) -> BTreeMap<String, BTreeMap<PathBuf, Lesson>> {
    let mut grouped: BTreeMap<String, BTreeMap<PathBuf, Lesson>> = BTreeMap::new();

    for lesson in lessons {
        let Some(course) = course_of(&lesson.path) else {
            continue;
        };

        grouped
            .entry(course)
            .or_default()
            .insert(lesson.path.clone(), lesson);
    }

    grouped
}
