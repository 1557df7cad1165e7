//! URI parsing and path normalization.
//!
//! A URI has the form `[<scheme>://[<host>]]<path>`. Nothing here touches a
//! backend; only `absolute` and `rm_on_host` look at the host.

use std::path::Path;

/// The three parts of a URI. Borrowed from the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uri<'a> {
    pub scheme: &'a str,
    pub host: &'a str,
    pub path: &'a str,
}

/// Splits `uri` into scheme, host and path.
///
/// A scheme is `[A-Za-z][A-Za-z0-9.+-]*` terminated by `://`. If the prefix does
/// not match, the whole input is a path with the empty scheme.
pub fn parse_uri(uri: &str) -> Uri<'_> {
    if let Some((scheme, rest)) = uri.split_once("://") {
        if is_valid_scheme(scheme) {
            let (host, path) = match rest.find('/') {
                Some(idx) => rest.split_at(idx),
                None => (rest, ""),
            };
            return Uri { scheme, host, path };
        }
    }
    Uri {
        scheme: "",
        host: "",
        path: uri,
    }
}

/// Returns the scheme of `uri`, empty for plain paths.
pub fn scheme_of(uri: &str) -> &str {
    parse_uri(uri).scheme
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
}

/// Collapses `.`, `..` and repeated separators.
///
/// * `""` stays `""`: it means "no path", not root.
/// * Absolute paths stay absolute; `..` above `/` is dropped.
/// * Relative paths stay relative; `..` above the start is dropped and an empty
///   result becomes `"."`.
/// * No trailing separator except for `/` itself.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    let joined = segments.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else if joined.is_empty() {
        String::from(".")
    } else {
        joined
    }
}

/// Default `translate_name` implementation shared by all backends.
///
/// Strips scheme and host and normalizes what remains. A scheme-qualified URI
/// with an empty path (`s://`) translates to `/`.
pub fn translate(uri: &str) -> String {
    let uri = parse_uri(uri);
    if !uri.scheme.is_empty() && uri.path.is_empty() {
        return String::from("/");
    }
    normalize(uri.path)
}

/// Joins two path fragments with exactly one separator. No normalization.
pub fn join_path(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Makes `path` absolute against the process working directory and normalizes
/// it. An absolute `path` is only normalized.
pub fn absolute(path: &str) -> std::io::Result<String> {
    if path.starts_with('/') {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir()?;
    Ok(normalize(&join_path(&cwd.to_string_lossy(), path)))
}

/// Removes a host file or directory tree.
pub fn rm_on_host<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
