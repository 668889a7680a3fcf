//! Markup rewriter: point `<img>` tags at the converted `.webp` files.
//!
//! For every `<img ...>` tag whose `src` ends in `.png` (double or single
//! quoted), the source is swapped for the `.webp` sibling and the original
//! is kept in a `data-fallback` attribute for client-side fallback. Rewritten
//! attributes are always double quoted; the rest of the tag is left as is:
//!
//! ```text
//! <img class="page" src="images/pages/001.png" alt="">
//! <img class="page" src="images/pages/001.webp" data-fallback="images/pages/001.png" alt="">
//! <img alt='' src='cover.png'>
//! <img alt='' src="cover.webp" data-fallback="cover.png">
//! ```
//!
//! This is a plain text pass. It is independent of the conversion pipeline
//! and does not check that the `.webp` files exist.

use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Quoted `.png` references in the document before rewriting.
    pub png_references: usize,
    /// `<img>` tags whose `src` was rewritten.
    pub rewritten: usize,
    /// Quoted `.webp` references in the document after rewriting.
    pub webp_references: usize,
}

const IMG_DOUBLE: &str = r#"<img([^>]+)src="([^"]+)\.png"([^>]*)>"#;
const IMG_SINGLE: &str = r#"<img([^>]+)src='([^']+)\.png'([^>]*)>"#;

fn count_quoted(content: &str, extension: &str) -> usize {
    content.matches(&format!("{extension}\"")).count()
        + content.matches(&format!("{extension}'")).count()
}

fn compile(pattern: &'static str) -> Result<Regex, MarkupError> {
    Regex::new(pattern).map_err(|source| MarkupError::Pattern { pattern, source })
}

fn rewrite_tags(re: &Regex, text: &str, rewritten: &mut usize) -> String {
    re.replace_all(text, |caps: &Captures| {
        *rewritten += 1;
        let (before, stem, after) = (&caps[1], &caps[2], &caps[3]);
        format!("<img{before}src=\"{stem}.webp\" data-fallback=\"{stem}.png\"{after}>")
    })
    .into_owned()
}

/// Rewrite every matching `<img>` tag in `content`.
pub fn rewrite_markup(content: &str) -> Result<(String, RewriteStats), MarkupError> {
    let mut stats = RewriteStats {
        png_references: count_quoted(content, ".png"),
        ..RewriteStats::default()
    };
    let double = compile(IMG_DOUBLE)?;
    let single = compile(IMG_SINGLE)?;

    let pass = rewrite_tags(&double, content, &mut stats.rewritten);
    let result = rewrite_tags(&single, &pass, &mut stats.rewritten);
    stats.webp_references = count_quoted(&result, ".webp");
    Ok((result, stats))
}

/// Rewrite `path` in place. With `dry_run`, only report what would change.
pub fn rewrite_file(path: &Path, dry_run: bool) -> Result<RewriteStats, MarkupError> {
    let content = fs::read_to_string(path).map_err(|source| MarkupError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let (rewritten, stats) = rewrite_markup(&content)?;
    if !dry_run && rewritten != content {
        fs::write(path, rewritten).map_err(|source| MarkupError::Write {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(stats)
}
