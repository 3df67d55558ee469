use anyhow::Context;
use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::{
    build::report::{Diagnostic, DiagnosticKind, ValidationReporter},
    config::ValidationConfig,
    error::Result,
    model::manifest::Manifest,
};

/// A course directory as found on disk. Every path is relative to the content root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CourseSource {
    pub id: String,
    pub path: PathBuf,
    /// The course README, when one exists.
    pub readme: Option<PathBuf>,
    /// The parsed course README, when it could be read.
    pub manifest: Option<Manifest>,
    pub sections: Vec<SectionSource>,
    /// Markdown files directly inside the course directory, other than its README.
    pub stray_lessons: Vec<PathBuf>,
    /// Part of the course directory could not be listed, so it cannot be assembled.
    pub unreadable: bool,
}

impl CourseSource {
    /// Every lesson file of the course, in discovery order.
    pub fn lesson_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.sections
            .iter()
            .flat_map(|section| section.lessons.iter())
            .chain(self.stray_lessons.iter())
    }

    pub fn section(&self, id: &str) -> Option<&SectionSource> {
        self.sections.iter().find(|section| section.id == id)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SectionSource {
    pub id: String,
    pub path: PathBuf,
    pub readme: Option<PathBuf>,
    pub manifest: Option<Manifest>,
    pub lessons: Vec<PathBuf>,
}

/// Discovers courses, sections and lesson files beneath a content root.
///
/// Top-level directories are courses, their subdirectories are sections and the Markdown
/// files of a section are its lessons. Hidden and ignored entries are skipped, and every
/// listing is sorted so discovery never depends on the order the filesystem returns.
pub struct ContentScanner<'a> {
    root: &'a Path,
    config: &'a ValidationConfig,
}

impl<'a> ContentScanner<'a> {
    pub fn new(root: &'a Path, config: &'a ValidationConfig) -> Self {
        Self { root, config }
    }

    /// Discover every course. Only an unreadable root fails the scan. A directory below it
    /// that cannot be listed is reported and marks its course unreadable.
    pub fn scan(&self, reporter: &mut ValidationReporter) -> Result<Vec<CourseSource>> {
        let mut courses = Vec::new();

        for entry in self.list(Path::new(""))? {
            if !entry.is_dir {
                continue;
            }

            courses.push(self.scan_course(entry, reporter));
        }

        debug!("Discovered {} course(s) in {}", courses.len(), self.root.display());

        Ok(courses)
    }

    fn scan_course(&self, course: Entry, reporter: &mut ValidationReporter) -> CourseSource {
        let mut source = CourseSource {
            id: course.name,
            path: course.path,
            ..Default::default()
        };

        let Some(entries) = self.list_or_report(&source.path, reporter) else {
            source.unreadable = true;
            return source;
        };

        for entry in entries {
            if entry.is_dir {
                self.scan_section(entry, &mut source, reporter);
            } else if entry.name == self.config.readme {
                source.manifest = self.load_manifest(&entry.path, reporter);
                source.readme = Some(entry.path);
            } else if is_markdown(&entry.path) {
                source.stray_lessons.push(entry.path);
            }
        }

        source
    }

    fn scan_section(
        &self,
        section: Entry,
        course: &mut CourseSource,
        reporter: &mut ValidationReporter,
    ) {
        let mut source = SectionSource {
            id: section.name,
            path: section.path,
            ..Default::default()
        };

        match self.list_or_report(&source.path, reporter) {
            Some(entries) => {
                for entry in entries {
                    if entry.is_dir {
                        debug!("Skipping nested directory {}", entry.path.display());
                    } else if entry.name == self.config.readme {
                        source.manifest = self.load_manifest(&entry.path, reporter);
                        source.readme = Some(entry.path);
                    } else if is_markdown(&entry.path) {
                        source.lessons.push(entry.path);
                    }
                }
            }
            None => course.unreadable = true,
        }

        course.sections.push(source);
    }

    fn load_manifest(&self, path: &Path, reporter: &mut ValidationReporter) -> Option<Manifest> {
        match Manifest::load(self.root.join(path)) {
            Ok(manifest) => Some(manifest),
            Err(error) => {
                reporter.push(Diagnostic::new(
                    DiagnosticKind::Io,
                    path,
                    format!("{error:#}"),
                ));
                None
            }
        }
    }

    fn list_or_report(
        &self,
        relative: &Path,
        reporter: &mut ValidationReporter,
    ) -> Option<Vec<Entry>> {
        match self.list(relative) {
            Ok(entries) => Some(entries),
            Err(error) => {
                warn!("{error:#}");
                reporter.push(Diagnostic::new(
                    DiagnosticKind::Io,
                    relative,
                    format!("{error:#}"),
                ));
                None
            }
        }
    }

    /// List a directory relative to the root in natural order.
    fn list(&self, relative: &Path) -> Result<Vec<Entry>> {
        let directory = self.root.join(relative);
        let listing = fs::read_dir(&directory)
            .with_context(|| format!("Failed to list {}", directory.display()))?;

        let mut entries = Vec::new();
        for entry in listing {
            let entry =
                entry.with_context(|| format!("Failed to list {}", directory.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            if name.starts_with('.') || self.config.ignore.contains(&name) {
                continue;
            }

            let is_dir = entry
                .file_type()
                .with_context(|| format!("Failed to inspect {}", entry.path().display()))?
                .is_dir();

            entries.push(Entry {
                path: relative.join(&name),
                name,
                is_dir,
            });
        }

        entries.sort_by(|a, b| natural_cmp(&a.name, &b.name));

        Ok(entries)
    }
}

struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("md"))
}

fn leading_number(name: &str) -> Option<u64> {
    let digits = name.len() - name.trim_start_matches(|c: char| c.is_ascii_digit()).len();

    name[..digits].parse().ok()
}

/// Order names by their leading number, so `2-x` sorts before `10-y`. Names without a
/// number follow the numbered ones. Ties fall back to the full name.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let key = |name: &str| leading_number(name).unwrap_or(u64::MAX);

    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod test {
    use super::*;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().expect("path has a parent")).expect("should create dirs");
        fs::write(path, contents).expect("should write file");
    }

    #[test]
    fn sorts_names_naturally() {
        let mut names = vec!["10-testing", "2-errors", "README.md", "1-basics", "2-alpha"];
        names.sort_by(|a, b| natural_cmp(a, b));

        assert_eq!(
            vec!["1-basics", "2-alpha", "2-errors", "10-testing", "README.md"],
            names
        );
    }

    #[test]
    fn unlistable_directories_are_reported_not_fatal() {
        let root = tempfile::tempdir().expect("should create a temporary directory");
        let config = ValidationConfig::default();
        let mut reporter = ValidationReporter::new();
        let scanner = ContentScanner::new(root.path(), &config);

        let course = scanner.scan_course(
            Entry {
                name: String::from("go"),
                path: PathBuf::from("go"),
                is_dir: true,
            },
            &mut reporter,
        );

        assert!(course.unreadable);
        assert!(course.sections.is_empty());

        let report = reporter.finish(false);
        assert_eq!(1, report.errors.len());
        assert_eq!(DiagnosticKind::Io, report.errors[0].kind);
        assert_eq!(PathBuf::from("go"), report.errors[0].path);
    }

    #[test]
    fn discovers_courses_sections_and_lessons() {
        let root = tempfile::tempdir().expect("should create a temporary directory");
        write(root.path(), "go/README.md", "# Go\n");
        write(root.path(), "go/notes.md", "stray");
        write(root.path(), "go/10-testing/1-table-tests.md", "");
        write(root.path(), "go/2-errors/README.md", "# Errors\n\n1. [Wrap](1-wrap.md)\n");
        write(root.path(), "go/2-errors/1-wrap.md", "");
        write(root.path(), "go/2-errors/image.png", "");
        write(root.path(), "go/.git/HEAD", "");
        write(root.path(), "node_modules/pkg/README.md", "");

        let config = ValidationConfig::default();
        let mut reporter = ValidationReporter::new();
        let courses = ContentScanner::new(root.path(), &config)
            .scan(&mut reporter)
            .expect("should scan");

        assert_eq!(1, courses.len());
        let course = &courses[0];
        assert_eq!("go", course.id);
        assert_eq!(Some(PathBuf::from("go/README.md")), course.readme);
        assert_eq!(vec![PathBuf::from("go/notes.md")], course.stray_lessons);
        assert_eq!(
            vec!["2-errors", "10-testing"],
            course
                .sections
                .iter()
                .map(|section| section.id.as_str())
                .collect::<Vec<_>>()
        );

        let errors = course.section("2-errors").expect("section exists");
        assert_eq!(vec![PathBuf::from("go/2-errors/1-wrap.md")], errors.lessons);
        assert_eq!(
            1,
            errors.manifest.as_ref().expect("manifest loaded").entries.len()
        );
        assert_eq!(None, course.section("10-testing").and_then(|s| s.readme.clone()));
        assert!(!course.unreadable);
        assert!(!reporter.has_errors());
    }
}
