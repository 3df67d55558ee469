use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

use crate::{
    build::{
        report::{Diagnostic, DiagnosticKind, ValidationReporter},
        resolve::resolve_entry,
        scan::{CourseSource, SectionSource},
    },
    model::{
        course::{Course, CourseSection},
        lesson::Lesson,
    },
};

/// Assembles one course from its discovered directories and its parsed lessons.
///
/// Assembly is pure: every README has been read by the time it runs. Problems are
/// collected into the builder's own reporter so courses can be assembled independently.
pub struct CourseGraphBuilder<'a> {
    source: &'a CourseSource,
    lessons: BTreeMap<PathBuf, Lesson>,
    strict: bool,
    broken: bool,
    reporter: ValidationReporter,
}

impl<'a> CourseGraphBuilder<'a> {
    /// `lessons` are the parsed lessons of this course, keyed by their path.
    pub fn new(source: &'a CourseSource, lessons: BTreeMap<PathBuf, Lesson>) -> Self {
        Self {
            source,
            lessons,
            strict: false,
            broken: false,
            reporter: ValidationReporter::new(),
        }
    }

    /// When set, an incomplete section stops assembly of the course.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Mark the course as already broken by an earlier stage. Sections are still checked
    /// so every problem is reported, but no course is produced. A course is also broken when
    /// any section README entry has no parsed lesson behind it.
    pub fn broken(mut self, broken: bool) -> Self {
        self.broken = broken;
        self
    }

    pub fn build(mut self) -> (Option<Course>, ValidationReporter) {
        let sections = self
            .ordered_sections()
            .into_iter()
            .map(|section| self.build_section(section))
            .collect::<Vec<_>>();

        if self.broken || self.reporter.breaks_course(self.strict) {
            debug!("Course `{}` cannot be assembled", self.source.id);
            return (None, self.reporter);
        }

        let course = Course {
            id: self.source.id.clone(),
            title: self
                .source
                .manifest
                .as_ref()
                .and_then(|manifest| manifest.title.clone())
                .unwrap_or_else(|| self.source.id.clone()),
            sections,
        };

        (Some(course), self.reporter)
    }

    /// Sections in the order the course README lists them, followed by any it does not list.
    /// Without a course README listing, filesystem order is kept.
    fn ordered_sections(&mut self) -> Vec<&'a SectionSource> {
        let source = self.source;
        let (Some(readme), Some(manifest)) = (&source.readme, &source.manifest) else {
            return source.sections.iter().collect();
        };

        let mut ordered: Vec<&'a SectionSource> = Vec::new();

        for entry in &manifest.entries {
            let Some(name) = first_component(&entry.location) else {
                continue;
            };

            match source.section(name) {
                Some(section) if ordered.iter().any(|listed| listed.id == section.id) => (),
                Some(section) => ordered.push(section),
                None if names_directory(&entry.location) => {
                    self.reporter.push(Diagnostic::new(
                        DiagnosticKind::DanglingReference,
                        readme,
                        format!(
                            "line {}: section `{name}` does not exist in course `{}`",
                            entry.line, source.id
                        ),
                    ));
                }
                None => debug!("Ignoring course README entry {}", entry.location.display()),
            }
        }

        if ordered.is_empty() {
            return source.sections.iter().collect();
        }

        for section in &source.sections {
            if ordered.iter().any(|listed| listed.id == section.id) {
                continue;
            }

            self.reporter.push(Diagnostic::new(
                DiagnosticKind::UnlistedCourseSection,
                readme,
                format!("section `{}` is not listed in the course README", section.id),
            ));
            ordered.push(section);
        }

        ordered
    }

    fn build_section(&mut self, source: &SectionSource) -> CourseSection {
        let mut section = CourseSection {
            id: source.id.clone(),
            title: source.id.clone(),
            ..Default::default()
        };

        let (Some(readme), Some(manifest)) = (&source.readme, &source.manifest) else {
            if source.readme.is_none() {
                self.incomplete(&source.path, "section has no README to order its lessons");
            }

            return section;
        };

        if let Some(title) = &manifest.title {
            section.title = title.clone();
        }

        for violation in &manifest.violations {
            self.incomplete(readme, violation.to_string());
        }

        match manifest.challenges.count() {
            Ok(count) => section.challenge_count = count,
            Err(reason) => self.incomplete(readme, reason),
        }

        for entry in &manifest.entries {
            let location = resolve_entry(&source.path, &entry.location);

            // Unparsed and out-of-course entries have been reported by earlier stages.
            match self.lessons.remove(&location) {
                Some(lesson) => section.lessons.push(lesson),
                None => {
                    debug!("No lesson for {}, course cannot be assembled", location.display());
                    self.broken = true;
                }
            }

            section.ordered_lesson_refs.push(location);
        }

        section
    }

    fn incomplete(&mut self, path: &Path, message: impl Into<String>) {
        self.reporter.push(Diagnostic::new(
            DiagnosticKind::IncompleteCourseSection,
            path,
            message,
        ));
    }
}

fn first_component(location: &Path) -> Option<&str> {
    location.components().find_map(|component| match component {
        Component::Normal(name) => name.to_str(),
        _ => None,
    })
}

/// Whether a course README link points into a directory, rather than at a file beside it.
fn names_directory(location: &Path) -> bool {
    location.components().count() > 1 || location.extension().is_none()
}
