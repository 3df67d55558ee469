use course_mark::{
    build::{
        render::{RenderContext, Renderer},
        report::ValidationReport,
    },
    config::Config,
    error::Result,
    model::course::CourseGraph,
};
use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct TestRenderer(
    Rc<RefCell<Option<CourseGraph>>>,
    Rc<RefCell<Option<ValidationReport>>>,
    Rc<RefCell<Option<Config>>>,
);

impl TestRenderer {
    #[allow(dead_code)] // Avoid a false positive on the dead code analysis.
    pub fn graph(&self) -> CourseGraph {
        self.0.borrow_mut().take().expect("result was not set")
    }

    #[allow(dead_code)] // Avoid a false positive on the dead code analysis.
    pub fn report(&self) -> ValidationReport {
        self.1.borrow_mut().take().expect("result was not set")
    }

    #[allow(dead_code)] // Avoid a false positive on the dead code analysis.
    pub fn config(&self) -> Config {
        self.2.borrow_mut().take().expect("result was not set")
    }
}

impl Renderer for TestRenderer {
    fn name(&self) -> &str {
        "test_renderer"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<()> {
        *self.0.borrow_mut() = Some(ctx.graph.clone());
        *self.1.borrow_mut() = Some(ctx.report.clone());
        *self.2.borrow_mut() = Some(ctx.config.clone());

        Ok(())
    }
}

/// The checked-in content tree shared by the integration tests.
#[allow(dead_code)]
pub fn corpus_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("corpus")
}

/// Write `contents` to `path` beneath `root`, creating directories as needed.
#[allow(dead_code)]
pub fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().expect("path has a parent")).expect("should create dirs");
    fs::write(path, contents).expect("should write file");
}

/// A minimal lesson that passes every per-file check.
#[allow(dead_code)]
pub fn lesson(course: &str, id: &str) -> String {
    format!(
        "---\nsource_course: \"{course}\"\nsource_lesson: \"{id}\"\n---\n\n# {id}\n\n## Summary\n\nDone.\n\n## Resources\n\n- [Docs](https://example.com/{id})\n"
    )
}
