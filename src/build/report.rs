//! Diagnostics collected across every pipeline stage.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Io,
    MalformedFrontMatter,
    NoSectionsFound,
    MissingRequiredSection,
    DuplicateSection,
    MultiVariantDocument,
    MissingRecommendedSection,
    CourseMismatch,
    DanglingReference,
    DuplicateLessonId,
    DuplicateLessonRef,
    OrphanLesson,
    IncompleteCourseSection,
    UnlistedCourseSection,
}

impl DiagnosticKind {
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::MultiVariantDocument
            | DiagnosticKind::MissingRecommendedSection
            | DiagnosticKind::CourseMismatch
            | DiagnosticKind::IncompleteCourseSection
            | DiagnosticKind::UnlistedCourseSection => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Kinds that leave a course graph too broken to assemble. An incomplete section only
    /// does so in strict mode.
    pub fn breaks_course(self, strict: bool) -> bool {
        match self {
            DiagnosticKind::DanglingReference
            | DiagnosticKind::DuplicateLessonId
            | DiagnosticKind::DuplicateLessonRef
            | DiagnosticKind::OrphanLesson => true,
            DiagnosticKind::IncompleteCourseSection => strict,
            _ => false,
        }
    }
}

impl Display for DiagnosticKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The file the problem was found in, relative to the content root.
    pub path: PathBuf,
    /// The course directory the file belongs to, if any.
    pub course: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        let path = path.into();

        Self {
            kind,
            course: course_of(&path),
            path,
            message: message.into(),
        }
    }

    fn sort_key(&self) -> (&Path, DiagnosticKind, &str) {
        (&self.path, self.kind, &self.message)
    }
}

impl Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.message)
    }
}

/// The course a content-relative path belongs to: its first component, when the path
/// lies inside a directory.
pub fn course_of(path: &Path) -> Option<String> {
    let mut components = path.components();
    let first = components.next()?;

    components.next()?;
    Some(first.as_os_str().to_string_lossy().into_owned())
}

/// Collects diagnostics as the pipeline runs.
#[derive(Debug, Default)]
pub struct ValidationReporter {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl ValidationReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic at its kind's default severity.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let severity = diagnostic.kind.default_severity();
        self.push_with(severity, diagnostic);
    }

    pub fn push_with(&mut self, severity: Severity, diagnostic: Diagnostic) {
        match severity {
            Severity::Error => self.errors.push(diagnostic),
            Severity::Warning => self.warnings.push(diagnostic),
        }
    }

    pub fn merge(&mut self, other: ValidationReporter) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether anything collected so far stops a course from being assembled.
    pub fn breaks_course(&self, strict: bool) -> bool {
        self.diagnostics()
            .any(|diagnostic| diagnostic.kind.breaks_course(strict))
    }

    fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }

    /// Produce the final report. In strict mode every warning is reported as an error.
    pub fn finish(self, strict: bool) -> ValidationReport {
        let ValidationReporter {
            mut errors,
            mut warnings,
        } = self;

        if strict {
            errors.append(&mut warnings);
        }

        for diagnostics in [&mut errors, &mut warnings] {
            diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
            diagnostics.dedup();
        }

        ValidationReport { errors, warnings }
    }
}

/// Every error and warning of a run, ordered by file path and then kind.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// All diagnostics of one kind, errors first.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(move |diagnostic| diagnostic.kind == kind)
    }

    fn write_group(
        formatter: &mut fmt::Formatter<'_>,
        name: &str,
        diagnostics: &[Diagnostic],
    ) -> fmt::Result {
        if diagnostics.is_empty() {
            return Ok(());
        }

        let mut by_path: BTreeMap<&Path, Vec<&Diagnostic>> = BTreeMap::new();
        for diagnostic in diagnostics {
            by_path.entry(&diagnostic.path).or_default().push(diagnostic);
        }

        writeln!(formatter, "{name} ({})", diagnostics.len())?;
        for (path, diagnostics) in by_path {
            writeln!(formatter, "[{}]", path.display())?;
            for diagnostic in diagnostics {
                writeln!(formatter, "  -> {diagnostic}")?;
            }
        }

        Ok(())
    }
}

impl Display for ValidationReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        ValidationReport::write_group(formatter, "errors", &self.errors)?;
        ValidationReport::write_group(formatter, "warnings", &self.warnings)?;

        if self.is_clean() {
            write!(formatter, "all checks passed")
        } else {
            write!(
                formatter,
                "{} error(s), {} warning(s)",
                self.errors.len(),
                self.warnings.len()
            )
        }
    }
}
