//! Expanding command-line patterns into the list of files to compress.

use precompress_compress::Compression;
use regex::Regex;
use std::collections::HashSet;
use std::iter::Peekable;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::str::Chars;
use walkdir::WalkDir;

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Expand `patterns` relative to `base` into regular files.
///
/// A pattern without glob syntax names a single file and is used as-is when
/// that file exists. Everything else is matched against the files below the
/// pattern's literal leading directories. Wildcards don't match hidden
/// (dot-prefixed) names unless the pattern spells out a leading dot.
///
/// Files that already carry a compressed extension are excluded, and each file
/// appears once, where it was first matched. Returned paths are relative to
/// `base` for relative patterns.
pub fn expand<S: AsRef<str>>(patterns: &[S], base: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        let matched = matches(pattern.as_ref(), base);
        tracing::debug!(pattern = pattern.as_ref(), matched = matched.len(), "Expanded pattern");
        for path in matched {
            if Compression::from_path(&path).is_none() && seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    files
}

fn matches(pattern: &str, base: &Path) -> Vec<PathBuf> {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    if !pattern.contains(GLOB_META) {
        let path = PathBuf::from(pattern);
        return if base.join(&path).is_file() { vec![path] } else { Vec::new() };
    }

    let regex = match Regex::new(&translate(pattern)) {
        Ok(regex) => regex,
        Err(err) => {
            tracing::warn!(pattern, error = %err, "Ignoring invalid pattern");
            return Vec::new();
        },
    };
    let root = base.join(literal_prefix(pattern));
    if !root.is_dir() {
        return Vec::new();
    }
    let absolute = Path::new(pattern).is_absolute();
    let hidden = pattern.starts_with('.') || pattern.contains("/.");

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| hidden || entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "Could not read directory entry");
                None
            },
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = if absolute { entry.path() } else { entry.path().strip_prefix(base).ok()? };
            regex.is_match(&normalize(path)).then(|| path.to_path_buf())
        })
        .collect()
}

/// The leading directories of `pattern` that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments[..segments.len() - 1].iter().take_while(|segment| !segment.contains(GLOB_META)).count();
    match segments[..literal].join("/") {
        prefix if prefix.is_empty() && pattern.starts_with('/') => PathBuf::from("/"),
        prefix => PathBuf::from(prefix),
    }
}

fn normalize(path: &Path) -> String {
    let path = path.to_string_lossy();
    if MAIN_SEPARATOR == '/' { path.into_owned() } else { path.replace(MAIN_SEPARATOR, "/") }
}

/// Translate a glob into an anchored regular expression over `/`-separated
/// paths.
fn translate(pattern: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();
    let mut braces = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.next_if_eq(&'/').is_some() {
                    regex.push_str("(?:[^/]*/)*");
                } else {
                    regex.push_str(".*");
                }
            },
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '[' => match class(&mut chars) {
                Some(class) => regex.push_str(&class),
                None => regex.push_str(r"\["),
            },
            '{' => {
                braces += 1;
                regex.push_str("(?:");
            },
            '}' if braces > 0 => {
                braces -= 1;
                regex.push(')');
            },
            ',' if braces > 0 => regex.push('|'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    regex.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                }
            },
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');
    regex
}

/// Translate a `[...]` class whose opening bracket has been consumed. Returns
/// `None`, consuming nothing, if the class is never closed.
fn class(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut lookahead = chars.clone();
    let mut class = String::from("[");
    if lookahead.next_if(|&c| matches!(c, '!' | '^')).is_some() {
        class.push_str("^/");
    }
    let mut first = true;
    loop {
        match lookahead.next()? {
            ']' if !first => break,
            c @ ('\\' | '[' | ']' | '^' | '&' | '~') => {
                class.push('\\');
                class.push(c);
            },
            c => class.push(c),
        }
        first = false;
    }
    class.push(']');
    *chars = lookahead;
    Some(class)
}
