use pulldown_cmark::HeadingLevel;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display, path::PathBuf};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum SectionLevel {
    #[default]
    H1 = 1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl From<HeadingLevel> for SectionLevel {
    fn from(value: HeadingLevel) -> Self {
        match value {
            HeadingLevel::H1 => SectionLevel::H1,
            HeadingLevel::H2 => SectionLevel::H2,
            HeadingLevel::H3 => SectionLevel::H3,
            HeadingLevel::H4 => SectionLevel::H4,
            HeadingLevel::H5 => SectionLevel::H5,
            HeadingLevel::H6 => SectionLevel::H6,
        }
    }
}

/// The closed set of section names a lesson is organised into. Any other heading
/// classifies as `Unrecognized` and never starts a section of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Introduction,
    KeyConcepts,
    RealWorldContext,
    DeepDive,
    CommonPitfalls,
    BestPractices,
    Summary,
    CodeExamples,
    Resources,
    Unrecognized(String),
}

impl SectionKind {
    /// Classify heading text, ignoring case, punctuation between words, a trailing colon
    /// and any leading decoration such as emoji.
    pub fn classify(heading: &str) -> SectionKind {
        let normalized = heading
            .trim()
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .trim_end_matches(|c: char| c == ':' || c.is_whitespace())
            .to_lowercase()
            .replace(['-', '_'], " ");
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        match normalized.as_str() {
            "introduction" | "overview" => SectionKind::Introduction,
            "key concepts" | "core concepts" => SectionKind::KeyConcepts,
            "real world context" | "real world" => SectionKind::RealWorldContext,
            "deep dive" => SectionKind::DeepDive,
            "common pitfalls" | "pitfalls" => SectionKind::CommonPitfalls,
            "best practices" => SectionKind::BestPractices,
            "summary" => SectionKind::Summary,
            "code examples" | "examples" => SectionKind::CodeExamples,
            "resources" | "additional resources" | "further reading" => SectionKind::Resources,
            _ => SectionKind::Unrecognized(heading.trim().to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, SectionKind::Unrecognized(_))
    }

    /// The canonical heading text for this kind of section.
    pub fn title(&self) -> &str {
        match self {
            SectionKind::Introduction => "Introduction",
            SectionKind::KeyConcepts => "Key Concepts",
            SectionKind::RealWorldContext => "Real-World Context",
            SectionKind::DeepDive => "Deep Dive",
            SectionKind::CommonPitfalls => "Common Pitfalls",
            SectionKind::BestPractices => "Best Practices",
            SectionKind::Summary => "Summary",
            SectionKind::CodeExamples => "Code Examples",
            SectionKind::Resources => "Resources",
            SectionKind::Unrecognized(heading) => heading,
        }
    }
}

impl Display for SectionKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.title())
    }
}

/// Identifies a lesson across the whole content tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonId {
    pub course: String,
    pub lesson: String,
}

impl LessonId {
    pub fn new(course: impl Into<String>, lesson: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            lesson: lesson.into(),
        }
    }
}

impl Display for LessonId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}/{}", self.course, self.lesson)
    }
}

/// Key naming the course a lesson belongs to.
pub const SOURCE_COURSE: &str = "source_course";
/// Key naming the lesson within its course.
pub const SOURCE_LESSON: &str = "source_lesson";

/// The YAML metadata block at the top of a lesson file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub source_course: String,
    pub source_lesson: String,
    /// Any keys besides the two identifying ones, in key order.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    pub fn new(source_course: impl Into<String>, source_lesson: impl Into<String>) -> Self {
        Self {
            source_course: source_course.into(),
            source_lesson: source_lesson.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> LessonId {
        LessonId::new(&self.source_course, &self.source_lesson)
    }

    /// Serialize back into a delimited front matter block.
    pub fn to_block(&self) -> Result<String, serde_yaml::Error> {
        let mut mapping = serde_yaml::Mapping::new();
        mapping.insert(SOURCE_COURSE.into(), self.source_course.as_str().into());
        mapping.insert(SOURCE_LESSON.into(), self.source_lesson.as_str().into());

        for (key, value) in &self.extra {
            mapping.insert(key.as_str().into(), value.clone());
        }

        Ok(format!("---\n{}---\n", serde_yaml::to_string(&mapping)?))
    }
}

/// A later lesson draft concatenated into the same file as the authoritative one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub front_matter: FrontMatter,
    /// One-based line of the opening delimiter in the original file.
    pub line: usize,
    /// Byte offset of the opening delimiter within the lesson body.
    #[serde(skip)]
    pub offset: usize,
}

/// A `Section` is a recognized heading together with every byte of source that follows it,
/// up to the next recognized heading of equal or higher level.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    /// Which recognized section this is.
    pub kind: SectionKind,
    /// The heading level of the section ranging from H1 to H6.
    pub level: SectionLevel,
    /// The heading line exactly as written.
    pub heading: String,
    /// All text that follows the heading, including unrecognized sub-headings.
    pub body: String,
    /// Zero for the authoritative draft, otherwise the number of the variant it belongs to.
    pub variant: usize,
}

impl Default for SectionKind {
    fn default() -> Self {
        SectionKind::Unrecognized(String::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeExample {
    pub language: Option<String>,
    pub caption: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub label: String,
    pub url: String,
}

/// A `Lesson` is the in-memory representation of a single lesson file on disk.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lesson {
    /// Location of the lesson relative to the content root.
    pub path: PathBuf,
    pub front_matter: FrontMatter,
    pub title: String,
    /// Everything between the front matter and the first recognized heading.
    pub preamble: String,
    pub sections: Vec<Section>,
    pub code_examples: Vec<CodeExample>,
    pub resources: Vec<Resource>,
    pub variants: Vec<Variant>,
}

impl Lesson {
    pub fn id(&self) -> LessonId {
        self.front_matter.id()
    }

    /// The first section of the given kind in the authoritative draft.
    pub fn section(&self, kind: &SectionKind) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.variant == 0 && &section.kind == kind)
    }

    pub fn has_section(&self, kind: &SectionKind) -> bool {
        self.section(kind).is_some()
    }

    /// Reassemble the lesson body from its parts, byte for byte.
    pub fn body(&self) -> String {
        let mut body = self.preamble.clone();

        for section in &self.sections {
            body.push_str(&section.heading);
            body.push_str(&section.body);
        }

        body
    }
}
