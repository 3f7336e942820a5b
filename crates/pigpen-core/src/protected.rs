//! Protected-path policy and mechanical patch scanning.
//!
//! A path is protected when its string form starts with one of the configured
//! prefixes. Matching is a literal string prefix test: `tools/pigpen/` covers
//! `tools/pigpen/run.ts` but not `tools/pigpen-extra.ts`. Nothing here
//! touches the filesystem; paths come from diff text only.

use serde::{Deserialize, Serialize};

/// Environment variable holding a comma-separated prefix override.
pub const PROTECTED_PREFIXES_ENV: &str = "PROTECTED_PREFIXES";

/// Prefixes protected when no override is configured.
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] = &[
    "00_README_GOVERNANCE/",
    "01_CANON/",
    ".github/workflows/",
    "tools/pigpen/",
];

/// Immutable, ordered, de-duplicated set of protected path prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedPrefixSet {
    prefixes: Vec<String>,
}

impl Default for ProtectedPrefixSet {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_PREFIXES.iter().copied())
    }
}

impl ProtectedPrefixSet {
    /// Build a set from prefixes, dropping blanks and duplicates.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for p in prefixes {
            let p = p.as_ref().trim();
            if !p.is_empty() && !out.iter().any(|e| e == p) {
                out.push(p.to_string());
            }
        }
        Self { prefixes: out }
    }

    /// Parse a comma-separated override. `None` or a blank value yields the
    /// default set.
    pub fn from_config(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) if !raw.trim().is_empty() => Self::new(raw.split(',')),
            _ => Self::default(),
        }
    }

    /// Read [`PROTECTED_PREFIXES_ENV`], falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_config(std::env::var(PROTECTED_PREFIXES_ENV).ok().as_deref())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.prefixes
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.iter().any(|p| p == prefix)
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Whether `path` falls under any prefix in this set.
    pub fn is_protected(&self, path: &str) -> bool {
        is_protected(path, &self.prefixes)
    }
}

/// True iff `path` starts with some prefix in `prefixes`.
pub fn is_protected<S: AsRef<str>>(path: &str, prefixes: &[S]) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_ref()))
}

/// What a unified diff touches, according to its headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchScan {
    /// Paths created, modified, deleted, renamed or copied, first occurrence
    /// first.
    pub touched: Vec<String>,
    /// Header lines whose paths could not be resolved.
    pub unparsed: Vec<String>,
}

impl PatchScan {
    fn touch(&mut self, path: String) {
        if !self.touched.contains(&path) {
            self.touched.push(path);
        }
    }

    fn reject(&mut self, line: &str) {
        if !self.unparsed.iter().any(|l| l == line) {
            self.unparsed.push(line.to_string());
        }
    }
}

/// Scan every file header of a unified diff.
///
/// Both sides of `diff --git`, `---` and `+++` headers count, as do
/// `rename from/to` and `copy from/to` lines, so deletions and pure renames
/// are seen. C-quoted paths are unquoted. Hunk bodies are skipped by their
/// line counts, so content lines never read as headers.
pub fn scan_patch(patch: &str) -> PatchScan {
    let mut scan = PatchScan::default();
    let mut hunk = Hunk::default();
    for line in patch.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if hunk.is_open() && hunk.consume(line) {
            continue;
        }
        hunk = Hunk::default();
        scan_header(line, &mut scan, &mut hunk);
    }
    scan
}

/// Extract the set of paths a unified diff touches.
pub fn extract_touched_paths(patch: &str) -> Vec<String> {
    scan_patch(patch).touched
}

/// Paths in `patch` that the policy protects, in patch order.
///
/// Header lines that cannot be resolved to a path are returned verbatim, so a
/// patch the scanner cannot read is never treated as clean.
pub fn protected_paths_in(patch: &str, prefixes: &ProtectedPrefixSet) -> Vec<String> {
    let scan = scan_patch(patch);
    scan.touched
        .into_iter()
        .filter(|p| prefixes.is_protected(p))
        .chain(scan.unparsed)
        .collect()
}

const PATH_LINE_PREFIXES: &[&str] = &["rename from ", "rename to ", "copy from ", "copy to "];

fn scan_header(line: &str, scan: &mut PatchScan, hunk: &mut Hunk) {
    if line.starts_with("@@") {
        match Hunk::parse(line) {
            Some(next) => *hunk = next,
            None => scan.reject(line),
        }
        return;
    }

    let resolved: Option<Vec<String>> = if let Some(rest) = line.strip_prefix("diff --git ") {
        git_header_paths(rest).map(|(old, new)| vec![old, new])
    } else if let Some(rest) = line
        .strip_prefix("--- ")
        .or_else(|| line.strip_prefix("+++ "))
    {
        file_header_path(rest).map(|path| path.into_iter().collect())
    } else if let Some(rest) = PATH_LINE_PREFIXES
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
    {
        whole_path(rest).map(|path| vec![path])
    } else {
        return;
    };

    match resolved {
        Some(paths) => paths.into_iter().for_each(|p| scan.touch(p)),
        None => scan.reject(line),
    }
}

/// Remaining old and new line counts of the current hunk.
#[derive(Debug, Default)]
struct Hunk {
    old: u64,
    new: u64,
}

impl Hunk {
    /// Parse `@@ -l[,s] +l[,s] @@`.
    fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("@@ -")?;
        let (ranges, _) = rest.split_once(" @@")?;
        let (old, new) = ranges.split_once(" +")?;
        Some(Self {
            old: range_len(old)?,
            new: range_len(new)?,
        })
    }

    fn is_open(&self) -> bool {
        self.old > 0 || self.new > 0
    }

    /// Consume one body line; false when the line cannot belong to the hunk.
    fn consume(&mut self, line: &str) -> bool {
        match line.as_bytes().first() {
            None | Some(b' ') if self.old > 0 && self.new > 0 => {
                self.old -= 1;
                self.new -= 1;
                true
            }
            Some(b'-') if self.old > 0 => {
                self.old -= 1;
                true
            }
            Some(b'+') if self.new > 0 => {
                self.new -= 1;
                true
            }
            Some(b'\\') => true,
            _ => false,
        }
    }
}

fn range_len(range: &str) -> Option<u64> {
    match range.split_once(',') {
        Some((start, len)) => {
            start.parse::<u64>().ok()?;
            len.parse().ok()
        }
        None => {
            range.parse::<u64>().ok()?;
            Some(1)
        }
    }
}

fn strip_side(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// A `---`/`+++` value. `Some(None)` is `/dev/null`.
fn file_header_path(raw: &str) -> Option<Option<String>> {
    let token = if raw.starts_with('"') {
        let (path, rest) = unquote(raw)?;
        if !(rest.is_empty() || rest.starts_with('\t')) {
            return None;
        }
        path
    } else {
        raw.split_once('\t')
            .map_or(raw, |(path, _)| path)
            .trim_end()
            .to_string()
    };
    if token == "/dev/null" {
        return Some(None);
    }
    let path = strip_side(&token);
    (!path.is_empty()).then(|| Some(path.to_string()))
}

/// A value that is exactly one path, quoted or not.
fn whole_path(raw: &str) -> Option<String> {
    let path = if raw.starts_with('"') {
        let (path, rest) = unquote(raw)?;
        if !rest.is_empty() {
            return None;
        }
        path
    } else {
        raw.to_string()
    };
    (!path.is_empty()).then_some(path)
}

/// Both sides of `diff --git <old> <new>`, side markers stripped.
fn git_header_paths(rest: &str) -> Option<(String, String)> {
    if rest.starts_with('"') {
        let (old, tail) = unquote(rest)?;
        let new = whole_path(tail.strip_prefix(' ')?)?;
        return Some((strip_side(&old).to_string(), strip_side(&new).to_string()));
    }

    // An unquoted old side may contain spaces; split where the new side starts.
    let candidates: Vec<(String, String)> = rest
        .match_indices(' ')
        .filter(|(i, _)| {
            let tail = &rest[i + 1..];
            tail.starts_with("b/") || tail.starts_with("\"b/")
        })
        .filter_map(|(i, _)| {
            let old = &rest[..i];
            let new = whole_path(&rest[i + 1..])?;
            old.starts_with("a/")
                .then(|| (strip_side(old).to_string(), strip_side(&new).to_string()))
        })
        .collect();

    match candidates.len() {
        0 => {
            let (old, new) = rest.split_once(' ')?;
            if old.is_empty() || new.is_empty() || new.contains(' ') {
                return None;
            }
            Some((old.to_string(), new.to_string()))
        }
        1 => candidates.into_iter().next(),
        _ => {
            let mut same = candidates.into_iter().filter(|(old, new)| old == new);
            let first = same.next()?;
            same.next().is_none().then_some(first)
        }
    }
}

/// Decode a C-quoted path as git writes it. Returns the path and the text
/// after the closing quote.
fn unquote(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let path = String::from_utf8(out).ok()?;
                return Some((path, &body[i + 1..]));
            }
            b'\\' => {
                let escaped = *bytes.get(i + 1)?;
                let byte = match escaped {
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b't' => b'\t',
                    b'n' => b'\n',
                    b'v' => 0x0b,
                    b'f' => 0x0c,
                    b'r' => b'\r',
                    b'"' => b'"',
                    b'\\' => b'\\',
                    b'0'..=b'3' => {
                        let value = octal(bytes.get(i + 1..i + 4)?)?;
                        i += 2;
                        value
                    }
                    _ => return None,
                };
                out.push(byte);
                i += 2;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    None
}

fn octal(digits: &[u8]) -> Option<u8> {
    digits.iter().try_fold(0u8, |acc, d| match d {
        b'0'..=b'7' => acc.checked_mul(8)?.checked_add(d - b'0'),
        _ => None,
    })
}
