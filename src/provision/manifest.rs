//! Requirements manifest inspection: content hash and requirement names

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use blake3::Hasher;

/// Hash prefix stored in the dependencies marker
pub const HASH_PREFIX: &str = "blake3:";

/// BLAKE3 hash of a file, `blake3:`-prefixed
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{HASH_PREFIX}{}", hasher.finalize().to_hex()))
}

/// Distribution names listed in a pip requirements file, normalized
///
/// Comments, blank lines and option lines (`-r`, `--index-url`, ...) are
/// skipped. Version specifiers, extras, markers and URLs are cut off. URL and
/// path requirements are named by their `#egg=` fragment, or skipped without one.
pub fn requirement_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() || line.starts_with('-') {
            continue;
        }

        let token = leading_name(line);
        let name = if token.contains("://") || token.starts_with(['.', '/']) {
            match egg_name(line) {
                Some(egg) => normalize_name(leading_name(egg)),
                None => continue,
            }
        } else {
            normalize_name(token)
        };
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// A `#` starts a comment only at line start or after whitespace
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (index, c) in line.char_indices() {
        if c == '#' && previous.is_none_or(char::is_whitespace) {
            return &line[..index];
        }
        previous = Some(c);
    }
    line
}

/// Text up to the first version specifier, extra, marker or URL separator
fn leading_name(requirement: &str) -> &str {
    let end = requirement
        .find(|c: char| "=<>!~[;@ \t".contains(c))
        .unwrap_or(requirement.len());
    &requirement[..end]
}

/// `egg=` value of a URL fragment
fn egg_name(requirement: &str) -> Option<&str> {
    let (_, fragment) = requirement.split_once('#')?;
    fragment
        .split('&')
        .find_map(|part| part.strip_prefix("egg="))
        .filter(|egg| !egg.is_empty())
}

/// PEP 503 normalization: case-insensitive, `_` and `.` equal to `-`
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '.'], "-")
}
