//! Violation records and backtrace trimming.

use std::fmt;

/// A blocking call observed on a monitored thread outside any allowance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViolationRecord {
    /// Owner of the operation (module or type path).
    pub owner: String,
    /// Operation name.
    pub name: String,
    /// `true` for free functions and associated functions without a receiver.
    pub is_static: bool,
}

impl ViolationRecord {
    /// Creates a record.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, is_static: bool) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            is_static,
        }
    }
}

/// `owner::name` for static operations, `owner#name` for receiver methods.
impl fmt::Display for ViolationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.is_static { "::" } else { "#" };
        write!(f, "{}{}{}", self.owner, separator, self.name)
    }
}

/// Symbol fragments identifying engine frames at the top of a backtrace.
const INTERNAL_FRAMES: &[&str] = &[
    "std::backtrace",
    "backtrace::",
    "stallguard_monitor::",
    "stallguard_intercept::site",
    "stallguard_intercept::inventory",
    "stallguard_intercept::capability",
    "core::ops::function::",
];

fn is_internal(symbol: &str) -> bool {
    symbol == "<unknown>" || INTERNAL_FRAMES.iter().any(|frag| symbol.contains(frag))
}

/// Drops the leading engine frames of a rendered backtrace.
///
/// Frames are the `N: symbol` lines produced by
/// [`std::backtrace::Backtrace`]'s `Display`, each followed by zero or more
/// `at file:line` lines. The remaining frames are renumbered from zero so
/// the first visible frame is the guarded operation called by user code.
/// Text that contains no frames, or only engine frames, is returned as is.
pub fn trim_internal_frames(rendered: &str) -> String {
    let mut frames: Vec<(String, Vec<&str>)> = Vec::new();
    for line in rendered.lines() {
        match parse_frame_header(line) {
            Some(symbol) => frames.push((symbol.to_string(), Vec::new())),
            None => {
                if let Some((_, details)) = frames.last_mut() {
                    details.push(line);
                }
            }
        }
    }

    let skip = frames
        .iter()
        .take_while(|(symbol, _)| is_internal(symbol))
        .count();
    if frames.is_empty() || skip == frames.len() {
        return rendered.to_string();
    }

    let mut out = String::new();
    for (index, (symbol, details)) in frames.iter().skip(skip).enumerate() {
        out.push_str(&format!("{index:>4}: {symbol}\n"));
        for detail in details {
            out.push_str(detail);
            out.push('\n');
        }
    }
    out
}

/// Returns the symbol of a `   12: path::to::fn` line.
fn parse_frame_header(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let (index, symbol) = trimmed.split_once(": ")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(symbol.trim())
}
