//! # Preprocessor
//!
//! Resolves `#require <path>` include directives before the rest of the
//! pipeline ever sees the source. This is the only stage that touches the
//! filesystem during compilation (aside from the final write-out in
//! `main`).
//!
//! ## Include syntax
//!
//! A line whose trimmed form starts with `#require` must also contain a
//! `<` and a `>`; the text between them (trimmed) is the path to include,
//! resolved relative to the directory of the file containing the
//! directive. Anything else on a `#require` line is ignored.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CompileError, ErrorKind, Span};

const REQUIRE_DIRECTIVE: &str = "#require";

/// Read `path`, recursively inlining any `#require` directives it contains.
///
/// `included` tracks the absolute paths already pulled in along the
/// current inclusion chain; re-entering one of them is a cycle and is
/// fatal. The top-level call should pass an empty set.
pub fn preprocess(path: &Path) -> Result<String, CompileError> {
    let mut included = HashSet::new();
    preprocess_inner(path, &mut included, &mut Vec::new())
}

fn preprocess_inner(
    path: &Path,
    included: &mut HashSet<PathBuf>,
    chain: &mut Vec<PathBuf>,
) -> Result<String, CompileError> {
    let abs_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    if included.contains(&abs_path) {
        chain.push(abs_path.clone());
        let rendered = chain
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(CompileError::new(
            ErrorKind::IncludeCycle,
            format!("cyclic #require: {rendered}"),
            Span::dummy(),
        ));
    }

    let source = fs::read_to_string(&abs_path).map_err(|_| {
        CompileError::new(
            ErrorKind::IncludeNotFound,
            format!("file not found: {}", path.display()),
            Span::dummy(),
        )
    })?;

    included.insert(abs_path.clone());
    chain.push(abs_path.clone());
    let base_dir = abs_path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut out = String::new();
    for (line_number, line) in source.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with(REQUIRE_DIRECTIVE) {
            let lt = trimmed.find('<');
            let gt = trimmed.find('>');
            let (lt, gt) = match (lt, gt) {
                (Some(lt), Some(gt)) if lt < gt => (lt, gt),
                _ => {
                    return Err(CompileError::new(
                        ErrorKind::MalformedRequire,
                        format!(
                            "malformed {REQUIRE_DIRECTIVE} on line {} of {}",
                            line_number + 1,
                            abs_path.display()
                        ),
                        Span::dummy(),
                    ))
                }
            };

            let include_name = trimmed[lt + 1..gt].trim();
            let include_path = base_dir.join(include_name);
            out.push_str(&preprocess_inner(&include_path, included, chain)?);
            out.push('\n');
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }

    chain.pop();
    Ok(out)
}
