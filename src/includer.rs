//! `#include` resolution and expansion.
//!
//! The IR front-end has no preprocessor of its own, so include handling lives
//! here: [`Includer::resolve`] implements the search-order contract and
//! [`expand_includes`] splices resolved content into the source before it
//! reaches the front-end. Expansion is include-once per invocation, so a
//! file pulled in along several paths contributes its definitions a single
//! time. Every successful resolution is logged in order for dependency-file
//! generation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CompileError, Result};
use crate::options::SourceOptions;

/// One include search root: a display label (for diagnostics) plus the
/// directory it names.
#[derive(Debug, Clone)]
pub struct IncludeDir {
    pub label: String,
    pub path: PathBuf,
}

impl IncludeDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: path.display().to_string(),
            path,
        }
    }
}

/// A successfully resolved include request.
#[derive(Debug, Clone)]
pub struct ResolvedInclude {
    /// Directory-qualified name of the file that answered the request.
    pub resolved_path: PathBuf,
    pub content: String,
}

/// Resolves include requests against the working directory and the ordered
/// include search roots; first match wins.
#[derive(Debug)]
pub struct Includer {
    working_dir: PathBuf,
    include_dirs: Vec<IncludeDir>,
    resolved: Vec<PathBuf>,
}

impl Includer {
    pub fn new(working_dir: impl Into<PathBuf>, include_dirs: Vec<IncludeDir>) -> Self {
        Self {
            working_dir: working_dir.into(),
            include_dirs,
            resolved: Vec::new(),
        }
    }

    pub fn from_options(options: &SourceOptions) -> Self {
        Self::new(
            options.working_dir.clone(),
            options.include_dirs.iter().map(IncludeDir::new).collect(),
        )
    }

    /// Search order: working directory first, unconditionally, then each
    /// include directory in declaration order. Returns `None` when no root
    /// holds the file; the caller turns that into a located compile
    /// diagnostic rather than aborting.
    pub fn resolve(&mut self, requested: &str) -> Option<ResolvedInclude> {
        let working = self.working_dir.clone();
        if let Some(hit) = self.try_read(&working, requested) {
            return Some(hit);
        }
        let roots: Vec<PathBuf> = self.include_dirs.iter().map(|d| d.path.clone()).collect();
        for root in roots {
            if let Some(hit) = self.try_read(&root, requested) {
                return Some(hit);
            }
        }
        None
    }

    fn try_read(&mut self, root: &Path, requested: &str) -> Option<ResolvedInclude> {
        let candidate = root.join(requested);
        let content = std::fs::read_to_string(&candidate).ok()?;
        self.resolved.push(candidate.clone());
        Some(ResolvedInclude {
            resolved_path: candidate,
            content,
        })
    }

    /// Every resolved file, in resolution order. Duplicates are kept; the
    /// depfile writer dedupes.
    pub fn resolved_files(&self) -> &[PathBuf] {
        &self.resolved
    }
}

/// Recursively expands `#include "…"` / `#include <…>` lines.
///
/// A request that resolves nowhere becomes a `file:line`-located compilation
/// error, matching what the front-end would report for any other bad line.
/// Cyclic inclusion is detected and reported with the full chain.
pub fn expand_includes(
    source: &str,
    file_label: &str,
    includer: &mut Includer,
) -> Result<String> {
    let mut stack: Vec<PathBuf> = Vec::new();
    let mut expanded_once: HashSet<PathBuf> = HashSet::new();
    expand_recursive(source, file_label, includer, &mut stack, &mut expanded_once)
}

fn expand_recursive(
    source: &str,
    file_label: &str,
    includer: &mut Includer,
    stack: &mut Vec<PathBuf>,
    expanded_once: &mut HashSet<PathBuf>,
) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    for (index, line) in source.lines().enumerate() {
        let Some(requested) = parse_include_line(line) else {
            out.push_str(line);
            out.push('\n');
            continue;
        };
        let line_no = index + 1;
        let Some(resolved) = includer.resolve(requested) else {
            return Err(CompileError::Compilation {
                file: file_label.to_string(),
                message: format!("{file_label}:{line_no}: included file '{requested}' not found"),
            });
        };
        if stack.contains(&resolved.resolved_path) {
            return Err(CompileError::Compilation {
                file: file_label.to_string(),
                message: format!(
                    "{file_label}:{line_no}: cyclic include of '{}'",
                    resolved.resolved_path.display()
                ),
            });
        }
        if !expanded_once.insert(resolved.resolved_path.clone()) {
            continue;
        }
        stack.push(resolved.resolved_path.clone());
        let nested_label = resolved.resolved_path.display().to_string();
        let expanded =
            expand_recursive(&resolved.content, &nested_label, includer, stack, expanded_once)?;
        stack.pop();
        out.push_str(&expanded);
        if !expanded.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}

/// Returns the requested path when `line` is an include directive.
fn parse_include_line(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("include")?.trim_start();
    let (open, close) = match rest.as_bytes().first()? {
        b'"' => ('"', '"'),
        b'<' => ('<', '>'),
        _ => return None,
    };
    let inner = &rest[open.len_utf8()..];
    let end = inner.find(close)?;
    Some(&inner[..end])
}
