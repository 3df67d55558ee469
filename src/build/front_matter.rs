use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use crate::{
    error::LessonError,
    model::lesson::{FrontMatter, Variant, SOURCE_COURSE, SOURCE_LESSON},
};

const DELIMITER: &str = "---";

/// The outcome of splitting a lesson file into its authoritative metadata and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument<'a> {
    /// The first front matter block in the file.
    pub front_matter: FrontMatter,
    /// Everything after the first block, later front matter blocks included.
    pub remainder: &'a str,
    /// One-based line in the file where `remainder` starts.
    pub remainder_line: usize,
    /// Additional front matter blocks found in `remainder`, outside of code fences.
    pub variants: Vec<Variant>,
}

/// Tracks whether a line-by-line scan is inside a fenced code block.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feed the next line. Returns `true` when the line is part of a fenced code block,
    /// including the opening and closing fence lines themselves.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start_matches(' ');
        // Four spaces of indentation make an indented code line, never a fence.
        let indent = line.len() - trimmed.len();
        let fence = trimmed
            .chars()
            .next()
            .filter(|c| indent <= 3 && matches!(c, '`' | '~'))
            .map(|c| (c, trimmed.chars().take_while(|&other| other == c).count()));

        match (self.open, fence) {
            (Some((open_char, open_len)), Some((c, len))) => {
                let rest = &trimmed[len * c.len_utf8()..];
                if c == open_char && len >= open_len && rest.trim().is_empty() {
                    self.open = None;
                }
                true
            }
            (Some(_), None) => true,
            (None, Some((c, len))) if len >= 3 => {
                self.open = Some((c, len));
                true
            }
            (None, _) => false,
        }
    }
}

pub struct FrontMatterParser<'a> {
    source: &'a str,
}

impl<'a> FrontMatterParser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.strip_prefix('\u{feff}').unwrap_or(source),
        }
    }

    pub fn parse(self) -> Result<ParsedDocument<'a>, LessonError> {
        let mut lines = Lines::new(self.source);

        let opening = lines
            .by_ref()
            .find(|line| !line.text.trim().is_empty())
            .ok_or_else(|| LessonError::front_matter("document is empty"))?;

        if opening.text.trim_end() != DELIMITER {
            return Err(LessonError::front_matter(
                "document does not start with a `---` delimiter",
            ));
        }

        let (block, closing) = read_block(&mut lines).ok_or_else(|| {
            LessonError::front_matter(format!(
                "block opened on line {} is never closed",
                opening.number
            ))
        })?;
        let front_matter = parse_block(&block, opening.number)?;

        let remainder = &self.source[closing.end..];
        let remainder_line = closing.number + 1;
        let variants = find_variants(remainder, remainder_line);

        Ok(ParsedDocument {
            front_matter,
            remainder,
            remainder_line,
            variants,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    number: usize,
    start: usize,
    end: usize,
}

/// Lines of a document with their one-based number and byte span (newline included).
#[derive(Clone)]
struct Lines<'a> {
    source: &'a str,
    offset: usize,
    number: usize,
}

impl<'a> Lines<'a> {
    fn new(source: &'a str) -> Self {
        Self::starting_at(source, 1)
    }

    fn starting_at(source: &'a str, number: usize) -> Self {
        Self {
            source,
            offset: 0,
            number,
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.source.len() {
            return None;
        }

        let rest = &self.source[self.offset..];
        let length = memchr::memchr(b'\n', rest.as_bytes()).map_or(rest.len(), |index| index + 1);
        let line = Line {
            text: rest[..length].trim_end_matches(['\n', '\r']),
            number: self.number,
            start: self.offset,
            end: self.offset + length,
        };

        self.offset += length;
        self.number += 1;

        Some(line)
    }
}

/// Collect lines up to the closing delimiter, returning them along with the delimiter line.
fn read_block<'a>(lines: &mut Lines<'a>) -> Option<(Vec<Line<'a>>, Line<'a>)> {
    let mut block = Vec::new();

    for line in lines {
        if line.text.trim_end() == DELIMITER {
            return Some((block, line));
        }

        block.push(line);
    }

    None
}

/// Deserialize the lines between two delimiters. `opening` is the line number of the
/// opening delimiter, used in error messages.
fn parse_block(block: &[Line<'_>], opening: usize) -> Result<FrontMatter, LessonError> {
    let text = block
        .iter()
        .map(|line| line.text)
        .collect::<Vec<_>>()
        .join("\n");

    let mapping = if text.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(&text) {
            Ok(Value::Mapping(mapping)) => mapping,
            Ok(Value::Null) => Mapping::new(),
            Ok(_) => {
                return Err(LessonError::front_matter(format!(
                    "block opened on line {opening} is not a set of `key: value` pairs"
                )))
            }
            Err(error) => {
                return Err(LessonError::front_matter(format!(
                    "block opened on line {opening} is not valid YAML: {error}"
                )))
            }
        }
    };

    let mut values = BTreeMap::new();
    for (key, value) in mapping {
        let Value::String(key) = key else {
            return Err(LessonError::front_matter(format!(
                "block opened on line {opening} has a key that is not a string"
            )));
        };

        values.insert(key, value);
    }

    let mut take = |key: &str| match values.remove(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::String(_) | Value::Null) | None => Err(LessonError::front_matter(format!(
            "missing required key `{key}`"
        ))),
        Some(_) => Err(LessonError::front_matter(format!(
            "`{key}` must be a plain string"
        ))),
    };

    let source_course = take(SOURCE_COURSE)?;
    let source_lesson = take(SOURCE_LESSON)?;

    Ok(FrontMatter {
        source_course,
        source_lesson,
        extra: values,
    })
}

/// Scan a lesson body for further front matter blocks. Only blocks carrying both identifying
/// keys count, so ordinary thematic breaks are left alone.
fn find_variants(remainder: &str, first_line: usize) -> Vec<Variant> {
    let mut variants = Vec::new();
    let mut fences = FenceTracker::default();
    let mut lines = Lines::starting_at(remainder, first_line);

    while let Some(line) = lines.next() {
        if fences.update(line.text) || line.text.trim_end() != DELIMITER {
            continue;
        }

        let mut lookahead = lines.clone();

        let Some((block, _)) = read_block(&mut lookahead) else {
            continue;
        };

        let looks_like_metadata = !block.is_empty()
            && block.iter().all(|line| {
                let text = line.text.trim();
                text.is_empty() || text.starts_with('#') || text.contains(':')
            });

        if !looks_like_metadata {
            continue;
        }

        if let Ok(front_matter) = parse_block(&block, line.number) {
            variants.push(Variant {
                front_matter,
                line: line.number,
                offset: line.start,
            });
            lines = lookahead;
        }
    }

    variants
}
