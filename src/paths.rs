//! Pure path utilities. No I/O happens here.
//!
//! Paths are plain strings with `/` as the internal separator regardless of
//! the host convention. [`real_path_safety`] collapses `..` segments without
//! touching the disk, so traversal payloads can be neutralized for paths that
//! do not (yet) exist.

/// Normalize separators: backslashes become forward slashes.
pub fn fix_separator(path: &str) -> String {
    path.replace('\\', "/")
}

/// Anchor `path` under `base_path`, with an optional URI scheme prefix.
///
/// The input path has its separators normalized and any leading `/` stripped,
/// so the result is always inside `base_path`.
///
/// ```
/// use fsdriver::paths::absolute_path;
///
/// assert_eq!(absolute_path("/base/", "x/y", Some("zip")), "zip:///base/x/y");
/// assert_eq!(absolute_path("/base/", "/x/y", None), "/base/x/y");
/// ```
pub fn absolute_path(base_path: &str, path: &str, scheme: Option<&str>) -> String {
    let prefix = match scheme {
        Some(s) if !s.is_empty() => format!("{s}://"),
        _ => String::new(),
    };
    let fixed = fix_separator(path);
    format!("{prefix}{base_path}{}", fixed.trim_start_matches('/'))
}

/// Strip the `base_path` prefix from `path` if it applies.
///
/// Returns `path` (separator-fixed) unchanged when it does not start with
/// the base. A path equal to the base minus its trailing slash yields `""`.
pub fn relative_path(base_path: &str, path: &str) -> String {
    let path = fix_separator(path);
    if path.starts_with(base_path) || base_path == format!("{path}/") {
        path.get(base_path.len()..).unwrap_or("").to_string()
    } else {
        path
    }
}

/// Collapse `.` and `..` segments without resolving anything on disk.
///
/// Each `..` pops the previously resolved segment instead of being kept
/// literal, which neutralizes directory-traversal payloads. Paths containing
/// no `/../` sequence are returned unchanged.
///
/// ```
/// use fsdriver::paths::real_path_safety;
///
/// assert_eq!(real_path_safety("/a/b/../c"), "/a/c");
/// assert_eq!(real_path_safety("/a/b"), "/a/b");
/// ```
pub fn real_path_safety(path: &str) -> String {
    if !path.contains("/../") {
        return path.to_string();
    }
    let mut resolved: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "." => {}
            ".." => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved.join("/")
}

/// The parent directory of a path, by string manipulation alone.
///
/// Mirrors `dirname` semantics: trailing slashes are ignored, the parent of
/// a root-level entry is `/`, and a bare name has parent `.`.
pub fn parent_directory(path: &str) -> String {
    let fixed = fix_separator(path);
    let trimmed = fixed.trim_end_matches('/');
    if trimmed.is_empty() {
        return if fixed.starts_with('/') { "/" } else { "." }.to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => ".".to_string(),
    }
}
