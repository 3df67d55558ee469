use pulldown_cmark::{CodeBlockKind, Event, Tag};

use crate::{
    cmark::{CMarkParser, EventIteratorExt},
    error::LessonError,
    model::lesson::{CodeExample, Resource, Section, SectionKind, SectionLevel},
};

/// A lesson body split at its recognized headings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedSections {
    /// Text of the first H1 heading ahead of the first section.
    pub title: Option<String>,
    /// Source preceding the first recognized heading.
    pub preamble: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone)]
struct Heading {
    kind: SectionKind,
    level: SectionLevel,
    text: String,
    /// Byte offset of the start of the heading's first line.
    start: usize,
    /// Byte offset just past the heading's last line.
    end: usize,
}

/// Splits a lesson body into sections. Headings are found with a CommonMark parser, so
/// heading-like lines inside fenced code blocks never start a section.
pub struct SectionExtractor<'a> {
    parser: CMarkParser<'a>,
    variant_offsets: Vec<usize>,
}

impl<'a> SectionExtractor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            parser: CMarkParser::new(source),
            variant_offsets: Vec::new(),
        }
    }

    /// Byte offsets at which later lesson drafts begin. Sections starting at or after an
    /// offset are attributed to that draft.
    pub fn with_variant_offsets(mut self, offsets: impl IntoIterator<Item = usize>) -> Self {
        self.variant_offsets = offsets.into_iter().collect();
        self.variant_offsets.sort_unstable();
        self
    }

    pub fn extract(mut self) -> Result<ExtractedSections, LessonError> {
        let source = self.parser.source();
        let headings = self.parse_headings();

        let mut boundaries: Vec<&Heading> = Vec::new();
        for heading in headings.iter().filter(|heading| heading.kind.is_recognized()) {
            let nested = boundaries
                .last()
                .is_some_and(|current| heading.level > current.level);

            if !nested {
                boundaries.push(heading);
            }
        }

        let Some(first) = boundaries.first() else {
            return Err(LessonError::NoSectionsFound);
        };

        let title = headings
            .iter()
            .take_while(|heading| heading.start < first.start)
            .find(|heading| heading.level == SectionLevel::H1)
            .map(|heading| heading.text.clone());

        let sections = boundaries
            .iter()
            .enumerate()
            .map(|(index, heading)| {
                let end = boundaries
                    .get(index + 1)
                    .map_or(source.len(), |next| next.start);

                Section {
                    kind: heading.kind.clone(),
                    level: heading.level,
                    heading: source[heading.start..heading.end].to_string(),
                    body: source[heading.end..end].to_string(),
                    variant: self.variant_of(heading.start),
                }
            })
            .collect();

        Ok(ExtractedSections {
            title,
            preamble: source[..first.start].to_string(),
            sections,
        })
    }

    fn variant_of(&self, offset: usize) -> usize {
        self.variant_offsets
            .iter()
            .take_while(|&&variant| variant <= offset)
            .count()
    }

    fn parse_headings(&mut self) -> Vec<Heading> {
        let source = self.parser.source();
        let mut headings = Vec::new();

        while let Some((event, range)) = self.parser.next_with_range() {
            let Event::Start(Tag::Heading(level, ..)) = event else {
                continue;
            };

            let text = self
                .parser
                .iter_until_and_consume(|event| matches!(event, Event::End(Tag::Heading(..))))
                .plain_text();

            headings.push(Heading {
                kind: SectionKind::classify(&text),
                level: SectionLevel::from(level),
                text,
                start: line_start(source, range.start),
                end: line_end(source, range.end),
            });
        }

        headings
    }
}

fn line_start(source: &str, offset: usize) -> usize {
    memchr::memrchr(b'\n', &source.as_bytes()[..offset]).map_or(0, |index| index + 1)
}

fn line_end(source: &str, offset: usize) -> usize {
    if offset > 0 && source.as_bytes()[offset - 1] == b'\n' {
        return offset;
    }

    memchr::memchr(b'\n', &source.as_bytes()[offset..])
        .map_or(source.len(), |index| offset + index + 1)
}

/// Collect the fenced and indented code blocks of a section body. Each example is captioned
/// by the closest preceding sub-heading or paragraph.
pub fn extract_code_examples(body: &str) -> Vec<CodeExample> {
    let mut examples = Vec::new();
    let mut caption = None;
    let mut events = CMarkParser::new(body);

    while let Some(event) = events.next_event() {
        match event {
            Event::Start(Tag::Heading(..)) => {
                let text = events
                    .iter_until_and_consume(|event| matches!(event, Event::End(Tag::Heading(..))))
                    .plain_text();
                caption = Some(text).filter(|text| !text.is_empty());
            }
            Event::Start(Tag::Paragraph) => {
                let text = events
                    .iter_until_and_consume(|event| matches!(event, Event::End(Tag::Paragraph)))
                    .plain_text();
                caption = Some(text.trim_end_matches(':').to_string())
                    .filter(|text| !text.is_empty());
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(tag) => code_language(&tag),
                    CodeBlockKind::Indented => None,
                };
                let code = events
                    .iter_until_and_consume(|event| matches!(event, Event::End(Tag::CodeBlock(_))))
                    .filter_map(|event| match event {
                        Event::Text(text) => Some(text.to_string()),
                        _ => None,
                    })
                    .collect();

                examples.push(CodeExample {
                    language,
                    caption: caption.take(),
                    code,
                });
            }
            _ => (),
        }
    }

    examples
}

fn code_language(tag: &str) -> Option<String> {
    tag.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .find(|part| !part.is_empty())
        .map(str::to_string)
}

/// Collect every link that appears in a list item of a section body.
pub fn extract_resources(body: &str) -> Vec<Resource> {
    let mut resources = Vec::new();
    let mut depth = 0usize;
    let mut events = CMarkParser::new(body);

    while let Some(event) = events.next_event() {
        match event {
            Event::Start(Tag::Item) => depth += 1,
            Event::End(Tag::Item) => depth = depth.saturating_sub(1),
            Event::Start(Tag::Link(_, url, _)) if depth > 0 => {
                let label = events
                    .iter_until_and_consume(|event| matches!(event, Event::End(Tag::Link(..))))
                    .plain_text();

                resources.push(Resource {
                    label,
                    url: url.to_string(),
                });
            }
            _ => (),
        }
    }

    resources
}
