//! A URL-matching domain-specific language for route patterns.
//!
//! # Quick reference
//!
//! | Pattern | Matches | Does not match |
//! |---|---|---|
//! | `/` | `/` | `/hello` |
//! | `/hello` | `/hello` | `/hi`, `/hello/` |
//! | `/user/:name` | `/user/carl`, `/user/alice` | `/user/carl/photos`, `/user/carl/`, `/user/` |
//! | `/:file.:ext` | `/data.json`, `/info.txt`, `/data.tar.gz` | `/.json`, `/data.`, `/data.json/download` |
//! | `/user/*` | `/user/`, `/user/carl` | `/user` |
//!
//! # Static paths
//!
//! Most paths may be specified directly: the pattern `/hello` matches
//! precisely that path (`/hello/` is distinct). Matching operates on raw,
//! still-escaped paths; to match a character that can appear escaped, use
//! its percent-encoded form in the pattern.
//!
//! # Named captures
//!
//! A leading `:` introduces a named capture, which permits any non-empty
//! value in that position: `/user/:name` matches `/user/carl` binding
//! `name` to `carl`, but matches neither `/user/` nor `/user/carl/`.
//! Captures are ordinarily delimited by slashes, but `.`, `;` and `,` are
//! accepted as delimiters with slightly different semantics: in
//! `/:file.:ext` the request `/data.json` binds `file` to `data` and `ext`
//! to `json`, while `/data.tar.gz` binds `ext` to `tar.gz` — the last
//! capture runs greedily up to the next `/`. Captured values are
//! percent-decoded before binding; retrieve them through
//! [`Environment::param`](crate::Environment::param).
//!
//! # Prefix matches
//!
//! A pattern ending in `/*` matches just the path segments preceding the
//! asterisk: `/user/*` matches `/user/` and `/user/carl/photos` but not
//! `/user` (no trailing slash). The unmatched suffix, including its
//! leading `/`, becomes the routing path for subsequent patterns, which
//! lets a sub-mux mounted there continue where this pattern left off.

use std::fmt;
use std::sync::Arc;

use http::Method;
use thiserror::Error;

use crate::env::{Environment, Storage};
use crate::pattern::{compose, with_methods, Composed, Pattern};
use crate::pool::Pool;
use crate::request::RequestContext;

/// Characters that can end a capture. They are not allowed to appear in
/// capture names. `/` is the path separator and `.` commonly delimits file
/// extensions; `;` and `,` are suggested by RFC 3986 section 3.3.
const BREAK_CHARS: &[u8] = b"/.;,";

fn is_break(b: u8) -> bool {
    BREAK_CHARS.contains(&b)
}

/// A compiled route pattern in the DSL described in the module docs.
///
/// Compilation happens once in [`Pat::new`]; the compiled form is
/// immutable and safe to match against from any number of tasks at once.
pub struct Pat {
    raw: String,
    // Parallel arrays: capture names, the break character each capture
    // expects afterwards, and the literal fragments in between. There is
    // always one more literal than capture, interleaved as
    // <literal> <capture> <literal> <capture> ... <literal>.
    names: Vec<String>,
    breaks: Vec<u8>,
    literals: Vec<String>,
    wildcard: bool,
    // Scratch space for capture accumulation during match attempts.
    scratch: Pool<Vec<String>>,
}

impl Pat {
    /// Compiles the given route specification. Any string is well-formed;
    /// a trailing `/*` marks the pattern as a prefix (wildcard) pattern.
    pub fn new(pat: &str) -> Self {
        let raw = pat.to_string();
        let (pat, wildcard) = match pat.strip_suffix("/*") {
            Some(prefix) => (format!("{prefix}/"), true),
            None => (pat.to_string(), false),
        };

        let mut names = Vec::new();
        let mut breaks = Vec::new();
        let mut literals = Vec::new();

        let bytes = pat.as_bytes();
        let mut lit_start = 0;
        let mut i = 0;
        while i + 1 < bytes.len() {
            if is_break(bytes[i]) && bytes[i + 1] == b':' {
                let name_start = i + 2;
                let mut j = name_start;
                while j < bytes.len() && !is_break(bytes[j]) {
                    j += 1;
                }
                if j > name_start {
                    // the break character belongs to the preceding literal;
                    // the colon belongs to neither
                    literals.push(pat[lit_start..=i].to_string());
                    names.push(pat[name_start..j].to_string());
                    breaks.push(if j == bytes.len() { b'/' } else { bytes[j] });
                    lit_start = j;
                    i = j;
                    continue;
                }
            }
            i += 1;
        }
        literals.push(pat[lit_start..].to_string());

        let capacity = names.len() + usize::from(wildcard);
        let scratch = Pool::new(move || Vec::with_capacity(capacity), Vec::clear);

        Pat { raw, names, breaks, literals, wildcard, scratch }
    }

    /// The pattern string this `Pat` was compiled from.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Pattern for Pat {
    /// Runs the pattern against the current routing path in a single
    /// left-to-right pass with no backtracking. The path comes from the
    /// environment, not the request line, so matching composes with
    /// wildcard continuation.
    fn matches(&self, env: &Environment, _req: &RequestContext) -> Option<Environment> {
        let mut path = env.path().unwrap_or("");
        let mut scratch = self.scratch.acquire();

        for i in 0..self.names.len() {
            path = path.strip_prefix(self.literals[i].as_str())?;

            let brk = self.breaks[i];
            let bytes = path.as_bytes();
            let mut m = 0;
            while m < bytes.len() && bytes[m] != brk && bytes[m] != b'/' {
                m += 1;
            }
            if m == 0 {
                // empty captures are not matches, otherwise "/:foo" would
                // match the path "/"
                return None;
            }
            scratch.push(path[..m].to_string());
            path = &path[m..];
        }

        let tail = self.literals[self.names.len()].as_str();
        if self.wildcard {
            if !path.starts_with(tail) {
                return None;
            }
            // keep the leading "/" on the unmatched suffix
            scratch.push(path[tail.len() - 1..].to_string());
        } else if path != tail {
            return None;
        }

        let mut storage = Storage::default();
        for (i, name) in self.names.iter().enumerate() {
            // a misencoded segment has no well-defined value to bind, so it
            // is a routing no-match rather than an error
            let unescaped = unescape(&scratch[i]).ok()?;
            storage.set(name.as_str(), unescaped);
        }
        if self.wildcard {
            storage.set_path(scratch[self.names.len()].as_str());
        }

        Some(storage.bind(env))
    }

    fn path_prefix(&self) -> Option<&str> {
        Some(&self.literals[0])
    }
}

impl fmt::Display for Pat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Pat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pat").field("raw", &self.raw).field("wildcard", &self.wildcard).finish_non_exhaustive()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
enum DecodeError {
    #[error("invalid percent escape")]
    InvalidEscape,
    #[error("decoded segment is not valid utf-8")]
    InvalidUtf8,
}

/// Percent-decodes one captured segment.
fn unescape(segment: &str) -> Result<String, DecodeError> {
    if !segment.contains('%') {
        return Ok(segment.to_string());
    }

    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 3 > bytes.len() {
                return Err(DecodeError::InvalidEscape);
            }
            let hi = hex_value(bytes[i + 1]).ok_or(DecodeError::InvalidEscape)?;
            let lo = hex_value(bytes[i + 2]).ok_or(DecodeError::InvalidEscape)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| DecodeError::InvalidUtf8)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

macro_rules! method_pattern {
    ($fn_name:ident, $($method:ident)|+, $doc:literal) => {
        #[doc = $doc]
        pub fn $fn_name(pat: &str) -> Composed {
            with_methods(Pat::new(pat), [$(Method::$method),+])
        }
    };
}

method_pattern!(get, GET | HEAD, "A route that only matches the GET and HEAD HTTP methods.");
method_pattern!(post, POST, "A route that only matches the POST HTTP method.");
method_pattern!(put, PUT, "A route that only matches the PUT HTTP method.");
method_pattern!(delete, DELETE, "A route that only matches the DELETE HTTP method.");
method_pattern!(head, HEAD, "A route that only matches the HEAD HTTP method.");
method_pattern!(options, OPTIONS, "A route that only matches the OPTIONS HTTP method.");
method_pattern!(patch, PATCH, "A route that only matches the PATCH HTTP method.");

/// The route `pat` without any method restriction, as a composed pattern.
/// Mostly useful together with [`compose`](crate::pattern::compose).
pub fn any(pat: &str) -> Composed {
    compose([Arc::new(Pat::new(pat)) as Arc<dyn Pattern>])
}
