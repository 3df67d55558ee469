use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    build::{
        front_matter::FrontMatterParser,
        report::{Diagnostic, DiagnosticKind},
        sections::{extract_code_examples, extract_resources, SectionExtractor},
    },
    config::ValidationConfig,
    error::LessonError,
    model::lesson::{Lesson, SectionKind},
};

/// Parse a lesson file's source into a `Lesson`. `path` is recorded as-is and should be
/// relative to the content root.
pub fn parse_lesson(path: impl Into<PathBuf>, source: &str) -> Result<Lesson, LessonError> {
    let document = FrontMatterParser::new(source).parse()?;
    let extracted = SectionExtractor::new(document.remainder)
        .with_variant_offsets(document.variants.iter().map(|variant| variant.offset))
        .extract()?;

    let mut lesson = Lesson {
        path: path.into(),
        title: extracted
            .title
            .unwrap_or_else(|| document.front_matter.source_lesson.clone()),
        front_matter: document.front_matter,
        preamble: extracted.preamble,
        sections: extracted.sections,
        variants: document.variants,
        ..Default::default()
    };

    lesson.code_examples = lesson
        .section(&SectionKind::CodeExamples)
        .map(|section| extract_code_examples(&section.body))
        .unwrap_or_default();
    lesson.resources = lesson
        .section(&SectionKind::Resources)
        .map(|section| extract_resources(&section.body))
        .unwrap_or_default();

    Ok(lesson)
}

/// Read and parse the lesson at `root.join(path)`. Any failure is returned as the
/// diagnostic that describes it.
pub fn load_lesson(root: &Path, path: &Path) -> Result<Lesson, Diagnostic> {
    let source = fs::read_to_string(root.join(path)).map_err(|error| {
        Diagnostic::new(
            DiagnosticKind::Io,
            path,
            format!("Failed to read lesson: {error}"),
        )
    })?;

    parse_lesson(path, &source).map_err(|error| {
        let kind = match error {
            LessonError::MalformedFrontMatter { .. } => DiagnosticKind::MalformedFrontMatter,
            LessonError::NoSectionsFound => DiagnosticKind::NoSectionsFound,
        };

        Diagnostic::new(kind, path, error.to_string())
    })
}

/// Check a parsed lesson's sections against the configured requirements.
pub fn check_sections(lesson: &Lesson, config: &ValidationConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut counts: BTreeMap<(usize, &SectionKind), usize> = BTreeMap::new();

    for section in &lesson.sections {
        *counts.entry((section.variant, &section.kind)).or_default() += 1;
    }

    for ((variant, kind), count) in counts {
        if count < 2 {
            continue;
        }

        let message = match variant {
            0 => format!("section `{kind}` appears {count} times"),
            variant => format!(
                "section `{kind}` appears {count} times in draft {}",
                variant + 1
            ),
        };

        diagnostics.push(Diagnostic::new(
            DiagnosticKind::DuplicateSection,
            &lesson.path,
            message,
        ));
    }

    let missing = |kinds: &[SectionKind], kind: DiagnosticKind, what: &str| {
        kinds
            .iter()
            .filter(|section| !lesson.has_section(section))
            .map(|section| {
                Diagnostic::new(
                    kind,
                    &lesson.path,
                    format!("missing {what} section `{section}`"),
                )
            })
            .collect::<Vec<_>>()
    };

    diagnostics.extend(missing(
        config.required_sections.as_slice(),
        DiagnosticKind::MissingRequiredSection,
        "required",
    ));
    diagnostics.extend(missing(
        config.recommended_sections.as_slice(),
        DiagnosticKind::MissingRecommendedSection,
        "recommended",
    ));

    diagnostics
}
