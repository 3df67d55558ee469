use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::lesson::Lesson;

/// A subdirectory grouping lessons, ordered by its README.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseSection {
    /// Directory name of the section.
    pub id: String,
    pub title: String,
    /// Lesson files as listed by the README, relative to the content root.
    pub ordered_lesson_refs: Vec<PathBuf>,
    /// The lessons those references resolved to, in the same order.
    pub lessons: Vec<Lesson>,
    pub challenge_count: u32,
}

/// A top-level course directory.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    /// Directory name of the course.
    pub id: String,
    pub title: String,
    pub sections: Vec<CourseSection>,
}

impl Course {
    pub fn section(&self, id: &str) -> Option<&CourseSection> {
        self.sections.iter().find(|section| section.id == id)
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.sections.iter().flat_map(|section| section.lessons.iter())
    }
}

/// Every course that assembled cleanly, plus the ids of the ones that did not.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseGraph {
    pub courses: Vec<Course>,
    pub skipped: Vec<String>,
}

impl CourseGraph {
    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|course| course.id == id)
    }
}
