use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(path: PathBuf, contents: String) -> Self {
        Self { path, contents }
    }

    /// Physical source line for a 1-based line number.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.contents.lines().nth(line.checked_sub(1)?)
    }
}

/// Access to the original source text, keyed by the file names the analyzer
/// puts in its contexts.
pub trait SourceLookup {
    fn line(&self, file: &str, line: usize) -> Option<&str>;
}

#[derive(Debug, Default)]
pub struct SourceMap {
    files: HashMap<String, SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: impl Into<String>, source: SourceFile) {
        self.files.insert(file.into(), source);
    }

    pub fn get(&self, file: &str) -> Option<&SourceFile> {
        self.files.get(file)
    }
}

impl SourceLookup for SourceMap {
    fn line(&self, file: &str, line: usize) -> Option<&str> {
        self.files.get(file)?.line(line)
    }
}
