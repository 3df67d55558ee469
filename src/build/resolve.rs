use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

use crate::{
    build::{
        report::{course_of, Diagnostic, DiagnosticKind, Severity, ValidationReporter},
        scan::{CourseSource, SectionSource},
    },
    config::{ValidationConfig, VariantPolicy},
    model::lesson::{Lesson, LessonId},
};

/// Where every lesson lives, and which courses are too broken to assemble.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Each lesson id claimed by exactly one file, with that file.
    pub locations: BTreeMap<LessonId, PathBuf>,
    pub broken: BTreeSet<String>,
}

/// The content-relative path a section README entry points at.
pub fn resolve_entry(section: &Path, location: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();

    for component in section.join(location).components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }

    resolved
}

/// Cross-checks parsed lessons against the README orderings of every section.
pub struct ReferenceResolver<'a> {
    config: &'a ValidationConfig,
    courses: &'a [CourseSource],
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(config: &'a ValidationConfig, courses: &'a [CourseSource]) -> Self {
        Self { config, courses }
    }

    /// Resolve `lessons`. `failed` holds the lesson files that exist but could not be parsed;
    /// they have been reported already and produce nothing further here.
    pub fn resolve(
        &self,
        lessons: &[Lesson],
        failed: &BTreeSet<PathBuf>,
        reporter: &mut ValidationReporter,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        self.check_ids(lessons, &mut resolution, reporter);

        for lesson in lessons {
            self.check_variants(lesson, reporter);
            self.check_course(lesson, reporter);
        }

        let parsed = lessons
            .iter()
            .map(|lesson| lesson.path.as_path())
            .collect::<BTreeSet<_>>();
        let references = self.check_references(&parsed, failed, &mut resolution, reporter);

        for path in parsed {
            match references.get(path).map(Vec::len) {
                None => resolution.report(
                    reporter,
                    Diagnostic::new(
                        DiagnosticKind::OrphanLesson,
                        path,
                        "lesson is not listed in any section README",
                    ),
                ),
                Some(1) => (),
                Some(_) => {
                    let listed_by = references[path]
                        .iter()
                        .map(|readme| readme.display().to_string())
                        .collect::<Vec<_>>();

                    resolution.report(
                        reporter,
                        Diagnostic::new(
                            DiagnosticKind::DuplicateLessonRef,
                            path,
                            format!("lesson is listed more than once: {}", listed_by.join(", ")),
                        ),
                    );
                }
            }
        }

        debug!(
            "Resolved {} lesson id(s), {} broken course(s)",
            resolution.locations.len(),
            resolution.broken.len()
        );

        resolution
    }

    fn check_ids(
        &self,
        lessons: &[Lesson],
        resolution: &mut Resolution,
        reporter: &mut ValidationReporter,
    ) {
        let mut claims: BTreeMap<LessonId, Vec<&Path>> = BTreeMap::new();

        for lesson in lessons {
            claims.entry(lesson.id()).or_default().push(&lesson.path);
        }

        for (id, mut paths) in claims {
            if let [path] = paths.as_slice() {
                resolution.locations.insert(id, path.to_path_buf());
                continue;
            }

            paths.sort();

            // The error is filed under the first path, but every claiming course is broken.
            resolution
                .broken
                .extend(paths.iter().filter_map(|path| course_of(path)));

            let claimed_by = paths
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>();

            resolution.report(
                reporter,
                Diagnostic::new(
                    DiagnosticKind::DuplicateLessonId,
                    paths[0],
                    format!(
                        "lesson id `{id}` is claimed by {} files: {}",
                        paths.len(),
                        claimed_by.join(", ")
                    ),
                ),
            );
        }
    }

    fn check_variants(&self, lesson: &Lesson, reporter: &mut ValidationReporter) {
        if lesson.variants.is_empty() {
            return;
        }

        let drafts = lesson
            .variants
            .iter()
            .map(|variant| format!("`{}` at line {}", variant.front_matter.id(), variant.line))
            .collect::<Vec<_>>();

        let severity = match self.config.variant_policy {
            VariantPolicy::Warn => Severity::Warning,
            VariantPolicy::Error => Severity::Error,
        };

        reporter.push_with(
            severity,
            Diagnostic::new(
                DiagnosticKind::MultiVariantDocument,
                &lesson.path,
                format!(
                    "file holds {} lesson drafts, only the first is authoritative: {}",
                    lesson.variants.len() + 1,
                    drafts.join(", ")
                ),
            ),
        );
    }

    fn check_course(&self, lesson: &Lesson, reporter: &mut ValidationReporter) {
        let Some(course) = course_of(&lesson.path) else {
            return;
        };

        if lesson.front_matter.source_course != course {
            reporter.push(Diagnostic::new(
                DiagnosticKind::CourseMismatch,
                &lesson.path,
                format!(
                    "declares course `{}` but lives in course `{course}`",
                    lesson.front_matter.source_course
                ),
            ));
        }
    }

    /// Follow every README entry, reporting the ones that lead nowhere. Returns the READMEs
    /// referencing each lesson file.
    fn check_references(
        &self,
        parsed: &BTreeSet<&Path>,
        failed: &BTreeSet<PathBuf>,
        resolution: &mut Resolution,
        reporter: &mut ValidationReporter,
    ) -> BTreeMap<PathBuf, Vec<&Path>> {
        let mut references: BTreeMap<PathBuf, Vec<&Path>> = BTreeMap::new();

        for course in self.courses {
            for section in &course.sections {
                let (Some(readme), Some(manifest)) = (&section.readme, &section.manifest) else {
                    continue;
                };

                for entry in &manifest.entries {
                    let target = resolve_entry(&section.path, &entry.location);

                    if course_of(&target).as_deref() != Some(course.id.as_str()) {
                        resolution.report(
                            reporter,
                            dangling(
                                section,
                                readme,
                                &entry.location,
                                entry.line,
                                format!("points outside course `{}`", course.id),
                            ),
                        );
                    } else if parsed.contains(target.as_path()) {
                        references.entry(target).or_default().push(readme);
                    } else if !failed.contains(&target) {
                        resolution.report(
                            reporter,
                            dangling(
                                section,
                                readme,
                                &entry.location,
                                entry.line,
                                "does not name a lesson file",
                            ),
                        );
                    }
                }
            }
        }

        references
    }
}

fn dangling(
    section: &SectionSource,
    readme: &Path,
    location: &Path,
    line: usize,
    problem: impl Display,
) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::DanglingReference,
        readme,
        format!(
            "line {line}: `{}` in section `{}` {problem}",
            location.display(),
            section.id
        ),
    )
}

impl Resolution {
    /// Record `diagnostic`, marking its course broken when its kind calls for it.
    fn report(&mut self, reporter: &mut ValidationReporter, diagnostic: Diagnostic) {
        if diagnostic.kind.breaks_course(false) {
            self.broken.extend(diagnostic.course.clone());
        }

        reporter.push(diagnostic);
    }
}
