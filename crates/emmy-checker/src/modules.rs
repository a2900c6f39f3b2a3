//! Module resolution for import-like calls (`require "a.b"`).

use crate::syntax::Program;
use emmy_common::FileId;
use tracing::trace;

/// Maps a module path to the file that defines it.
pub trait ModuleResolver: Send + Sync {
    fn resolve_imported_file(&self, path: &str) -> Option<FileId>;
}

/// Resolves dotted module paths against the file paths of a [`Program`]:
/// `a.b.c` is `a/b/c.lua`, else `a/b/c/init.lua`. A file matches when its
/// path equals the candidate or ends with `/` plus the candidate.
pub struct PathModuleResolver<'p> {
    program: &'p Program,
}

impl<'p> PathModuleResolver<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    fn find(&self, candidate: &str) -> Option<FileId> {
        self.program
            .files()
            .iter()
            .find(|file| {
                file.path == candidate
                    || file
                        .path
                        .strip_suffix(candidate)
                        .is_some_and(|head| head.ends_with('/'))
            })
            .map(|file| file.id)
    }
}

impl ModuleResolver for PathModuleResolver<'_> {
    fn resolve_imported_file(&self, path: &str) -> Option<FileId> {
        let base = path.strip_suffix(".lua").unwrap_or(path).replace('.', "/");
        let found = self
            .find(&format!("{base}.lua"))
            .or_else(|| self.find(&format!("{base}/init.lua")));
        trace!(module = path, found = ?found, "module resolved");
        found
    }
}

/// Resolves nothing.
pub struct NoModules;

impl ModuleResolver for NoModules {
    fn resolve_imported_file(&self, _path: &str) -> Option<FileId> {
        None
    }
}

#[cfg(test)]
#[path = "../tests/modules_tests.rs"]
mod tests;
