use crate::common::{lesson, write, TestRenderer};
use course_mark::build::{
    report::{Diagnostic, DiagnosticKind, ValidationReport},
    BuildOutput, CourseBuilder,
};
use std::path::{Path, PathBuf};

mod common;

fn build(root: &Path, strict: bool) -> BuildOutput {
    let mut builder = CourseBuilder::load(root).expect("failed to load content");

    builder.strict(strict);
    builder.build().expect("failed to build content")
}

fn of_kind(report: &ValidationReport, kind: DiagnosticKind) -> Vec<&Diagnostic> {
    report.of_kind(kind).collect()
}

#[test]
fn a_missing_lesson_is_one_dangling_reference() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(
        root.path(),
        "go/1-basics/README.md",
        "# Basics\n\n1. [Hello](1-hello.md)\n2. [Missing](2-missing.md)\n",
    );
    write(root.path(), "go/1-basics/1-hello.md", &lesson("go", "hello"));

    let output = build(root.path(), false);
    let dangling = of_kind(&output.report, DiagnosticKind::DanglingReference);

    assert_eq!(1, dangling.len());
    assert_eq!(PathBuf::from("go/1-basics/README.md"), dangling[0].path);
    assert!(dangling[0].message.contains("2-missing.md"));
    assert!(dangling[0].message.contains("1-basics"));
    assert_eq!(vec![String::from("go")], output.graph.skipped);
}

#[test]
fn duplicate_ids_are_reported_once_with_every_path() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(
        root.path(),
        "php/1-intro/README.md",
        "1. [First](1-first.md)\n2. [Second](2-second.md)\n",
    );
    write(root.path(), "php/1-intro/1-first.md", &lesson("php", "same-id"));
    write(root.path(), "php/1-intro/2-second.md", &lesson("php", "same-id"));

    let output = build(root.path(), false);
    let duplicates = of_kind(&output.report, DiagnosticKind::DuplicateLessonId);

    assert_eq!(1, duplicates.len());
    assert!(duplicates[0].message.contains("php/1-intro/1-first.md"));
    assert!(duplicates[0].message.contains("php/1-intro/2-second.md"));
    assert!(output.graph.courses.is_empty());
}

#[test]
fn a_broken_course_does_not_stop_the_others() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(root.path(), "broken/1-intro/README.md", "1. [Gone](gone.md)\n");
    write(root.path(), "fine/1-intro/README.md", "1. [Hello](1-hello.md)\n");
    write(root.path(), "fine/1-intro/1-hello.md", &lesson("fine", "hello"));

    let output = build(root.path(), false);

    assert_eq!(vec![String::from("broken")], output.graph.skipped);
    assert_eq!(1, output.graph.courses.len());
    assert_eq!("fine", output.graph.courses[0].id);
    assert!(output.report.has_errors());
}

#[test]
fn per_file_failures_do_not_stop_the_run() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(
        root.path(),
        "go/1-basics/README.md",
        "1. [Broken](1-broken.md)\n2. [Empty](2-empty.md)\n3. [Hello](3-hello.md)\n",
    );
    write(root.path(), "go/1-basics/1-broken.md", "# No front matter\n");
    write(
        root.path(),
        "go/1-basics/2-empty.md",
        "---\nsource_course: go\nsource_lesson: empty\n---\n\nJust prose.\n",
    );
    write(root.path(), "go/1-basics/3-hello.md", &lesson("go", "hello"));
    write(root.path(), "rust/1-intro/README.md", "1. [Hello](1-hello.md)\n");
    write(root.path(), "rust/1-intro/1-hello.md", &lesson("rust", "hello"));

    let output = build(root.path(), false);
    let kinds = output
        .report
        .errors
        .iter()
        .map(|diagnostic| diagnostic.kind)
        .collect::<Vec<_>>();

    assert_eq!(
        vec![
            DiagnosticKind::MalformedFrontMatter,
            DiagnosticKind::NoSectionsFound
        ],
        kinds
    );

    assert_eq!(
        0,
        output
            .report
            .of_kind(DiagnosticKind::DanglingReference)
            .count()
    );
    assert_eq!(vec![String::from("go")], output.graph.skipped);

    let course = output.graph.course("rust").expect("course was assembled");
    assert_eq!(1, course.sections[0].lessons.len());
}

#[test]
fn every_assembled_ref_has_its_lesson() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(
        root.path(),
        "go/1-basics/README.md",
        "1. [Broken](1-broken.md)\n2. [Hello](2-hello.md)\n",
    );
    write(root.path(), "go/1-basics/1-broken.md", "# No front matter\n");
    write(root.path(), "go/1-basics/2-hello.md", &lesson("go", "hello"));
    write(
        root.path(),
        "php/1-intro/README.md",
        "1. [Intro](1-intro.md)\n2. [Borrowed](../../go/1-basics/2-hello.md)\n",
    );
    write(root.path(), "php/1-intro/1-intro.md", &lesson("php", "intro"));
    write(
        root.path(),
        "rust/1-intro/README.md",
        "1. [Hello](1-hello.md)\n2. [Again](../1-intro/2-again.md)\n",
    );
    write(root.path(), "rust/1-intro/1-hello.md", &lesson("rust", "hello"));
    write(root.path(), "rust/1-intro/2-again.md", &lesson("rust", "again"));

    let output = build(root.path(), false);

    assert_eq!(1, output.graph.courses.len());
    assert_eq!(
        vec![String::from("go"), String::from("php")],
        output.graph.skipped
    );

    let dangling = of_kind(&output.report, DiagnosticKind::DanglingReference);
    assert_eq!(1, dangling.len());
    assert_eq!(PathBuf::from("php/1-intro/README.md"), dangling[0].path);

    for course in &output.graph.courses {
        for section in &course.sections {
            let lessons = section.lessons.iter().map(|lesson| &lesson.path);
            assert!(section.ordered_lesson_refs.iter().eq(lessons));
        }
    }
}

#[test]
fn orphans_and_unlisted_sections_are_reported() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(root.path(), "go/README.md", "1. [Basics](1-basics/README.md)\n");
    write(root.path(), "go/1-basics/README.md", "1. [Hello](1-hello.md)\n");
    write(root.path(), "go/1-basics/1-hello.md", &lesson("go", "hello"));
    write(root.path(), "go/1-basics/2-orphan.md", &lesson("go", "orphan"));
    write(root.path(), "go/2-extra/README.md", "");

    let output = build(root.path(), false);
    let orphans = of_kind(&output.report, DiagnosticKind::OrphanLesson);

    assert_eq!(1, orphans.len());
    assert_eq!(PathBuf::from("go/1-basics/2-orphan.md"), orphans[0].path);
    assert_eq!(
        1,
        of_kind(&output.report, DiagnosticKind::UnlistedCourseSection).len()
    );
    assert_eq!(vec![String::from("go")], output.graph.skipped);
}

#[test]
fn strict_mode_promotes_warnings_and_rejects_incomplete_sections() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(
        root.path(),
        "go/1-basics/README.md",
        "1. [Hello](1-hello.md)\n2. Bare text is not a lesson\n",
    );
    write(root.path(), "go/1-basics/1-hello.md", &lesson("go", "hello"));

    let lenient = build(root.path(), false);
    let strict = build(root.path(), true);

    assert!(!lenient.report.has_errors());
    assert_eq!(
        1,
        of_kind(&lenient.report, DiagnosticKind::IncompleteCourseSection).len()
    );
    assert_eq!(1, lenient.graph.courses.len());

    assert!(strict.report.has_errors());
    assert!(strict.report.warnings.is_empty());
    assert!(strict.graph.courses.is_empty());
    assert_eq!(vec![String::from("go")], strict.graph.skipped);
}

#[test]
fn a_course_toml_configures_validation() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    write(
        root.path(),
        "course.toml",
        "[course]\nreadme = \"INDEX.md\"\nrequired-sections = [\"summary\", \"key_concepts\"]\n\n[site]\nbase-url = \"/learn\"\n",
    );
    write(root.path(), "go/1-basics/INDEX.md", "1. [Hello](1-hello.md)\n");
    write(root.path(), "go/1-basics/1-hello.md", &lesson("go", "hello"));

    let renderer = TestRenderer::default();
    let mut builder = CourseBuilder::load(root.path()).expect("failed to load content");
    builder.with_renderer(renderer.clone());
    let output = builder.build().expect("failed to build content");

    let missing = of_kind(&output.report, DiagnosticKind::MissingRequiredSection);
    assert_eq!(1, missing.len());
    assert!(missing[0].message.contains("Key Concepts"));

    let config = renderer.config();
    let site: toml::Value = config.get("site").expect("site table is kept");
    assert_eq!(Some("/learn"), site.get("base-url").and_then(|value| value.as_str()));
}

#[test]
fn a_missing_root_is_an_error() {
    let root = tempfile::tempdir().expect("should create a temporary directory");
    let missing = root.path().join("nope");

    assert!(CourseBuilder::load(&missing)
        .expect("defaults apply without a config")
        .build()
        .is_err());
}
