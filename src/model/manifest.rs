use anyhow::Context;
use pulldown_cmark::{Event, HeadingLevel, Tag};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    fs,
    path::{Component, Path, PathBuf},
    str::FromStr,
    sync::OnceLock,
};

use crate::{
    cmark::{CMarkParser, EventIteratorExt},
    error::{Error, Result},
};

/// A README used as a declarative ordering manifest: numbered list items that each hold a
/// single relative link, in pedagogical order.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Text of the first H1 heading.
    pub title: Option<String>,
    /// Every well-formed entry, in listed order.
    pub entries: Vec<ManifestEntry>,
    /// What the manifest says about its challenges.
    pub challenges: ChallengeDeclaration,
    /// Parts of the manifest that do not follow the ordering grammar.
    pub violations: Vec<ManifestViolation>,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        source
            .parse()
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

impl FromStr for Manifest {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Ok(ManifestParser::new(source).parse())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    /// The link text.
    pub name: String,
    /// The link target, relative to the directory holding the manifest.
    pub location: PathBuf,
    /// One-based line of the list item.
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestViolation {
    pub line: usize,
    pub message: String,
}

impl Display for ManifestViolation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeclaredCount {
    Count(u32),
    /// The declaration was present, but its value is not a number.
    Invalid(String),
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeDeclaration {
    /// Value of a `Challenges: N` line.
    pub declared: Option<DeclaredCount>,
    /// Number of items listed beneath a `Challenges` heading.
    pub listed: Option<usize>,
}

impl ChallengeDeclaration {
    /// Cross-check the declared count against the listed challenges.
    pub fn count(&self) -> std::result::Result<u32, String> {
        match (&self.declared, self.listed) {
            (Some(DeclaredCount::Invalid(value)), _) => {
                Err(format!("challenge count `{value}` is not a number"))
            }
            (Some(DeclaredCount::Count(declared)), Some(listed))
                if *declared as usize != listed =>
            {
                Err(format!("declares {declared} challenges but lists {listed}"))
            }
            (Some(DeclaredCount::Count(declared)), _) => Ok(*declared),
            (None, Some(listed)) => u32::try_from(listed)
                .map_err(|_| format!("lists too many challenges ({listed})")),
            (None, None) => Ok(0),
        }
    }
}

fn challenge_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();

    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^\s*challenges?\s*:\s*(.+?)\s*$").expect("challenge pattern is valid")
    })
}

fn is_challenge_heading(heading: &str) -> bool {
    heading
        .trim()
        .to_lowercase()
        .starts_with("challenge")
}

/// Lexically normalize a relative link target, dropping `.` segments, resolving `..`
/// and stripping any fragment or query.
pub fn normalize_location(href: &str) -> PathBuf {
    let href = href
        .split(['#', '?'])
        .next()
        .unwrap_or_default()
        .replace("%20", " ");
    let mut location = PathBuf::new();

    for component in Path::new(&href).components() {
        match component {
            Component::CurDir => (),
            // Leading `..` segments climb out of the README's directory and are kept.
            Component::ParentDir => match location.components().next_back() {
                Some(Component::Normal(_)) => {
                    location.pop();
                }
                _ => location.push(".."),
            },
            other => location.push(other),
        }
    }

    location
}

fn is_external(href: &str) -> bool {
    href.contains("://") || href.starts_with("mailto:") || href.starts_with('/')
}

struct ManifestParser<'a> {
    parser: CMarkParser<'a>,
    manifest: Manifest,
    heading: Option<String>,
}

impl<'a> ManifestParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            parser: CMarkParser::new(source),
            manifest: Manifest::default(),
            heading: None,
        }
    }

    fn parse(mut self) -> Manifest {
        while let Some((event, range)) = self.parser.next_with_range() {
            match event {
                Event::Start(Tag::Heading(level, ..)) => self.parse_heading(level),
                Event::Start(Tag::Paragraph) => {
                    self.skip(&Tag::Paragraph);
                    let source = &self.parser.source()[range];
                    self.parse_challenge_declaration(source);
                }
                Event::Start(tag @ Tag::List(_)) if self.in_challenges() => {
                    let count = self.count_items(&tag);
                    *self.manifest.challenges.listed.get_or_insert(0) += count;
                }
                Event::Start(Tag::List(Some(_))) => self.parse_entries(),
                Event::Start(other_tag) => self.skip(&other_tag),
                _ => (),
            }
        }

        self.manifest
    }

    fn in_challenges(&self) -> bool {
        self.heading.as_deref().is_some_and(is_challenge_heading)
    }

    fn parse_heading(&mut self, level: HeadingLevel) {
        let heading = self
            .parser
            .iter_until_and_consume(|event| matches!(event, Event::End(Tag::Heading(..))))
            .plain_text();

        if level == HeadingLevel::H1 && self.manifest.title.is_none() {
            self.manifest.title = Some(heading.clone());
        }

        self.heading = Some(heading);
    }

    fn parse_challenge_declaration(&mut self, source: &str) {
        let source = source.replace(['*', '_'], "");

        if let Some(captures) = challenge_line().captures(&source) {
            let value = captures[1].trim().to_string();
            let declared = match value.parse::<u32>() {
                Ok(count) => DeclaredCount::Count(count),
                Err(_) => DeclaredCount::Invalid(value),
            };

            self.manifest.challenges.declared = Some(declared);
        }
    }

    /// Consume an ordered list, collecting one entry per item.
    fn parse_entries(&mut self) {
        loop {
            match self.parser.next_event() {
                Some(Event::Start(Tag::Item)) => {
                    let line = self.parser.position().line;
                    self.parse_entry(line);
                }
                Some(Event::End(Tag::List(_))) | None => break,
                Some(_) => (),
            }
        }
    }

    fn parse_entry(&mut self, line: usize) {
        let mut links = Vec::new();
        let mut depth = 0usize;

        loop {
            match self.parser.next_event() {
                Some(Event::Start(Tag::List(_))) => depth += 1,
                Some(Event::End(Tag::List(_))) => depth = depth.saturating_sub(1),
                Some(Event::End(Tag::Item)) if depth == 0 => break,
                Some(Event::Start(Tag::Link(_, href, _))) if depth == 0 => {
                    let name = self
                        .parser
                        .iter_until_and_consume(|event| matches!(event, Event::End(Tag::Link(..))))
                        .plain_text();
                    links.push((name, href.to_string()));
                }
                Some(_) => (),
                None => break,
            }
        }

        match &links[..] {
            [(name, href)] if is_external(href) => self.violation(
                line,
                format!("`{name}` links to `{href}`, which is not a relative lesson path"),
            ),
            [(name, href)] => self.manifest.entries.push(ManifestEntry {
                name: name.clone(),
                location: normalize_location(href),
                line,
            }),
            [] => self.violation(line, "numbered list item does not contain a link"),
            _ => self.violation(
                line,
                format!(
                    "numbered list item must contain exactly one link, found {}",
                    links.len()
                ),
            ),
        }
    }

    /// Consume a list and return how many top-level items it held.
    fn count_items(&mut self, list: &Tag<'a>) -> usize {
        let mut depth = 0usize;
        let mut count = 0;

        while let Some(event) = self.parser.next_event() {
            match event {
                Event::Start(Tag::List(_)) => depth += 1,
                Event::End(ref tag) if tag == list && depth == 0 => break,
                Event::End(Tag::List(_)) => depth = depth.saturating_sub(1),
                Event::Start(Tag::Item) if depth == 0 => count += 1,
                _ => (),
            }
        }

        count
    }

    /// Consume events up to and including the end of `tag`, honoring nesting.
    fn skip(&mut self, tag: &Tag<'a>) {
        let mut depth = 0usize;

        while let Some(event) = self.parser.next_event() {
            match event {
                Event::Start(ref other) if other == tag => depth += 1,
                Event::End(ref other) if other == tag => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => (),
            }
        }
    }

    fn violation(&mut self, line: usize, message: impl Into<String>) {
        self.manifest.violations.push(ManifestViolation {
            line,
            message: message.into(),
        });
    }
}
