use crate::common::TestRenderer;
use course_mark::{
    build::{report::DiagnosticKind, CourseBuilder},
    model::lesson::{LessonId, SectionKind},
};
use std::path::PathBuf;

mod common;

#[test]
fn it_builds_the_corpus() {
    let renderer = TestRenderer::default();
    let mut builder = CourseBuilder::load(common::corpus_dir()).expect("failed to load corpus");

    builder.with_renderer(renderer.clone());
    let output = builder.build().expect("failed to build corpus");

    let graph = renderer.graph();

    assert_eq!(output.graph, graph);
    assert!(graph.skipped.is_empty());
    assert_eq!(
        vec!["go-architecture", "javascript-engines", "php-ddd"],
        graph
            .courses
            .iter()
            .map(|course| course.id.as_str())
            .collect::<Vec<_>>()
    );
    assert!(!output.report.has_errors(), "{}", output.report);
    assert_eq!(
        vec![DiagnosticKind::MultiVariantDocument],
        output
            .report
            .warnings
            .iter()
            .map(|diagnostic| diagnostic.kind)
            .collect::<Vec<_>>()
    );
    assert_eq!(output.report, renderer.report());
}

#[test]
fn it_orders_the_domain_modeling_section_by_its_readme() {
    let output = CourseBuilder::load(common::corpus_dir())
        .expect("failed to load corpus")
        .build()
        .expect("failed to build corpus");

    let course = output.graph.course("php-ddd").expect("course was assembled");
    let section = course
        .section("2-domain-modeling")
        .expect("section was assembled");

    assert_eq!("Entities, Value Objects, Aggregates", section.title);
    assert_eq!(2, section.challenge_count);
    assert_eq!(
        vec![
            PathBuf::from("php-ddd/2-domain-modeling/1-ddd-entities.md"),
            PathBuf::from("php-ddd/2-domain-modeling/2-value-objects.md"),
            PathBuf::from("php-ddd/2-domain-modeling/3-ddd-aggregates.md"),
        ],
        section.ordered_lesson_refs
    );
    assert_eq!(
        vec!["Entities", "Value Objects", "Aggregates"],
        section
            .lessons
            .iter()
            .map(|lesson| lesson.title.as_str())
            .collect::<Vec<_>>()
    );
    assert_eq!(
        0,
        output
            .report
            .of_kind(DiagnosticKind::DanglingReference)
            .count()
    );
    assert_eq!(
        Some(&PathBuf::from("php-ddd/2-domain-modeling/2-value-objects.md")),
        output
            .locations
            .get(&LessonId::new("php-ddd", "php-ddd-value-objects"))
    );
}

#[test]
fn it_keeps_only_the_first_draft_of_a_multi_variant_lesson() {
    let output = CourseBuilder::load(common::corpus_dir())
        .expect("failed to load corpus")
        .build()
        .expect("failed to build corpus");

    let course = output
        .graph
        .course("go-architecture")
        .expect("course was assembled");
    let lesson = course.lessons().next().expect("course has a lesson");

    assert_eq!(
        "go-architecture-functional-options-basics",
        lesson.front_matter.source_lesson
    );
    assert_eq!(1, lesson.variants.len());
    assert_eq!(50, lesson.variants[0].line);
    assert!(lesson
        .section(&SectionKind::Summary)
        .expect("lesson has a summary")
        .body
        .contains("while configuration grows"));
    assert_eq!(2, lesson.code_examples.len());
    assert_eq!(
        Some("Applying options in the constructor"),
        lesson.code_examples[1].caption.as_deref()
    );
    assert_eq!(2, lesson.resources.len());
    assert_eq!(1, course.sections[0].challenge_count);

    let variants = output
        .report
        .of_kind(DiagnosticKind::MultiVariantDocument)
        .collect::<Vec<_>>();

    assert_eq!(1, variants.len());
    assert_eq!(
        PathBuf::from("go-architecture/4-functional-options/1-options-basics.md"),
        variants[0].path
    );
}

#[test]
fn it_ignores_headings_inside_code_fences() {
    let output = CourseBuilder::load(common::corpus_dir())
        .expect("failed to load corpus")
        .build()
        .expect("failed to build corpus");

    let lesson = output
        .graph
        .course("javascript-engines")
        .and_then(|course| course.lessons().next())
        .expect("lesson was assembled");

    assert_eq!(
        vec![
            SectionKind::Introduction,
            SectionKind::DeepDive,
            SectionKind::Summary,
            SectionKind::Resources,
        ],
        lesson
            .sections
            .iter()
            .map(|section| section.kind.clone())
            .collect::<Vec<_>>()
    );

    let deep_dive = lesson
        .section(&SectionKind::DeepDive)
        .expect("lesson has a deep dive");

    assert!(deep_dive.body.contains("### V8 Pipeline"));
    assert!(deep_dive.body.contains("### Tiers"));
}

#[test]
fn it_serializes_the_output_as_json() {
    let output = CourseBuilder::load(common::corpus_dir())
        .expect("failed to load corpus")
        .build()
        .expect("failed to build corpus");

    let first = serde_json::to_string(&output).expect("should serialize");
    let second = serde_json::to_string(
        &CourseBuilder::load(common::corpus_dir())
            .expect("failed to load corpus")
            .build()
            .expect("failed to build corpus"),
    )
    .expect("should serialize");
    let value: serde_json::Value = serde_json::from_str(&first).expect("should be valid json");

    assert_eq!(first, second);
    assert!(value["report"]["errors"].as_array().is_some());
    assert_eq!(3, value["graph"]["courses"].as_array().map_or(0, Vec::len));
}
