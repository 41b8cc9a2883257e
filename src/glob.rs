//! Shell-style glob matching with brace expansion.
//!
//! Supported syntax:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]` / `[a-z]` character sets and ranges
//! - `[!abc]` or `[^abc]` negated sets
//! - `{a,b,c}` brace alternatives (may nest)
//!
//! Patterns never cross `/` boundaries here; [`path_match`] applies the
//! matcher segment by segment for full paths.

/// Match `input` against a single glob `pattern`.
///
/// Brace groups are expanded first; the input matches if any expansion does.
///
/// ```
/// use fsdriver::glob::glob_match;
///
/// assert!(glob_match("*.csv", "report.csv"));
/// assert!(glob_match("data-?", "data-1"));
/// assert!(glob_match("*.{csv,txt}", "notes.txt"));
/// assert!(!glob_match("[!d]*", "data"));
/// ```
pub fn glob_match(pattern: &str, input: &str) -> bool {
    for expanded in expand_braces(pattern) {
        let pat: Vec<char> = expanded.chars().collect();
        let text: Vec<char> = input.chars().collect();
        if wildcard_match(&pat, &text) {
            return true;
        }
    }
    false
}

/// Match a `/`-separated pattern against a `/`-separated path.
///
/// Both sides are split into segments; they match when they have the same
/// number of segments and every segment matches pairwise. Empty segments
/// (leading or doubled slashes) are ignored on both sides.
pub fn path_match(pattern: &str, path: &str) -> bool {
    for expanded in expand_braces(pattern) {
        let pat: Vec<&str> = expanded.split('/').filter(|s| !s.is_empty()).collect();
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if pat.len() == segs.len() && pat.iter().zip(&segs).all(|(p, s)| glob_match(p, s)) {
            return true;
        }
    }
    false
}

/// Expand `{a,b,c}` alternatives into the full set of concrete patterns.
///
/// Unbalanced braces are treated as literal characters. Nested groups are
/// expanded recursively.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let Some((open, close)) = first_group(&chars) else {
        return vec![pattern.to_string()];
    };
    let prefix: String = chars[..open].iter().collect();
    let suffix: String = chars[close + 1..].iter().collect();

    let mut out = Vec::new();
    for alt in split_alternatives(&chars[open + 1..close]) {
        out.extend(expand_braces(&format!("{prefix}{alt}{suffix}")));
    }
    out
}

/// Find the first balanced top-level `{...}` group, if any.
fn first_group(chars: &[char]) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut open = None;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '{' => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        return open.map(|o| (o, i));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a group body on top-level commas.
fn split_alternatives(body: &[char]) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for &c in body {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                alternatives.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    alternatives.push(current);
    alternatives
}

/// Iterative wildcard matcher with single-point backtracking for `*`.
fn wildcard_match(pattern: &[char], input: &[char]) -> bool {
    let mut p = 0;
    let mut i = 0;
    // Last `*` seen: (pattern index after the star, input index it consumed to).
    let mut star: Option<(usize, usize)> = None;

    while i < input.len() {
        let mut advanced = false;
        if p < pattern.len() {
            match pattern[p] {
                '?' => {
                    p += 1;
                    i += 1;
                    advanced = true;
                }
                '*' => {
                    star = Some((p + 1, i));
                    p += 1;
                    continue;
                }
                '[' => {
                    if let Some((hit, next_p)) = match_class(pattern, p, input[i]) {
                        if hit {
                            p = next_p;
                            i += 1;
                            advanced = true;
                        }
                    } else if input[i] == '[' {
                        // Malformed class: treat `[` as a literal.
                        p += 1;
                        i += 1;
                        advanced = true;
                    }
                }
                c => {
                    if c == input[i] {
                        p += 1;
                        i += 1;
                        advanced = true;
                    }
                }
            }
        }
        if !advanced {
            match star {
                Some((star_p, star_i)) => {
                    // Let the star swallow one more input character and retry.
                    p = star_p;
                    i = star_i + 1;
                    star = Some((star_p, star_i + 1));
                }
                None => return false,
            }
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

/// Match `ch` against the character class starting at `pattern[start]`.
///
/// Returns `(matched, index past the closing bracket)`, or `None` when the
/// class is unterminated.
fn match_class(pattern: &[char], start: usize, ch: char) -> Option<(bool, usize)> {
    let mut idx = start + 1;
    let negated = matches!(pattern.get(idx), Some('!') | Some('^'));
    if negated {
        idx += 1;
    }
    let mut matched = false;
    let mut first = true;
    loop {
        let lo = *pattern.get(idx)?;
        if lo == ']' && !first {
            return Some((matched != negated, idx + 1));
        }
        first = false;
        if pattern.get(idx + 1) == Some(&'-') {
            if let Some(&hi) = pattern.get(idx + 2) {
                if hi != ']' {
                    if lo <= ch && ch <= hi {
                        matched = true;
                    }
                    idx += 3;
                    continue;
                }
            }
        }
        if lo == ch {
            matched = true;
        }
        idx += 1;
    }
}
