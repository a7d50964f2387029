//! Fault chains and stack frames captured from application errors
//!
//! A [`Fault`] is the language-neutral shape of a captured exception: a type name, an
//! optional message, the stack frames innermost-first, and an optional cause that is itself
//! a fault. [`Fault::render`] produces the conventional multi-line rendering used for the
//! `source` section of a notice.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

/// One call site of a captured stack trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub declaring_type: String,
    pub method: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(declaring_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            method: method.into(),
            file: None,
            line: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// `declaringType.method`, the form used in backtrace entries
    pub fn qualified_method(&self) -> String {
        format!("{}.{}", self.declaring_type, self.method)
    }

    fn location(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{}:{}", file, line),
            (Some(file), None) => file.clone(),
            (None, _) => "Unknown Source".to_string(),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.qualified_method(), self.location())
    }
}

/// A captured fault and its causal chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub type_name: String,
    pub message: Option<String>,
    pub frames: Vec<StackFrame>,
    pub cause: Option<Box<Fault>>,
}

impl Fault {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: None,
            frames: Vec::new(),
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn with_frames(mut self, frames: impl IntoIterator<Item = StackFrame>) -> Self {
        self.frames.extend(frames);
        self
    }

    pub fn with_cause(mut self, cause: Fault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Builds a fault from a typed error, following `source()` links into the cause chain.
    ///
    /// The outer type name is exact. Causes are only known as trait objects, so their type
    /// name is taken from the leading identifier of their `Debug` output.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        let mut fault = Self::from_parts(std::any::type_name::<E>(), error.to_string());
        fault.cause = error.source().map(|source| Box::new(Self::from_dyn_error(source)));
        fault
    }

    /// Builds a fault from an error trait object
    pub fn from_dyn_error(error: &(dyn StdError + 'static)) -> Self {
        let mut fault = Self::from_parts(debug_type_name(error), error.to_string());
        fault.cause = error.source().map(|source| Box::new(Self::from_dyn_error(source)));
        fault
    }

    fn from_parts(type_name: impl Into<String>, message: String) -> Self {
        let fault = Self::new(type_name);
        if message.is_empty() {
            fault
        } else {
            fault.with_message(message)
        }
    }

    /// The most recent call site, if any frames were captured
    pub fn innermost_frame(&self) -> Option<&StackFrame> {
        self.frames.first()
    }

    /// This fault followed by each of its causes
    pub fn chain(&self) -> impl Iterator<Item = &Fault> {
        std::iter::successors(Some(self), |fault| fault.cause.as_deref())
    }

    fn header(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.type_name, message),
            None => self.type_name.clone(),
        }
    }

    /// Multi-line rendering: header line, one `at` line per frame, then a `Caused by:`
    /// block for each cause.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (depth, fault) in self.chain().enumerate() {
            if depth > 0 {
                out.push_str("Caused by: ");
            }
            out.push_str(&fault.header());
            out.push('\n');
            for frame in &fault.frames {
                out.push_str("\tat ");
                out.push_str(&frame.to_string());
                out.push('\n');
            }
        }
        out
    }

    pub fn rendered_lines(&self) -> Vec<String> {
        self.render().lines().map(str::to_string).collect()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header())
    }
}

fn debug_type_name(error: &dyn StdError) -> String {
    let debug = format!("{:?}", error);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "Error".to_string()
    } else {
        name
    }
}

/// Converts a captured backtrace into frames, innermost first.
///
/// Returns an empty list when the backtrace is disabled or unsupported.
pub fn frames_from_backtrace(backtrace: &Backtrace) -> Vec<StackFrame> {
    parse_backtrace(&backtrace.to_string())
}

/// Leading frames owned by the standard library or by the capture itself
const CAPTURE_FRAME_PREFIXES: [&str; 10] = [
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rustc",
    "backtrace::",
    "honeybadger_core::fault",
    "honeybadger_core::record",
];

/// Captures the caller's stack, honouring `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`.
///
/// Empty when backtraces are disabled.
pub fn capture_frames() -> Vec<StackFrame> {
    trim_capture_frames(frames_from_backtrace(&Backtrace::capture()), &[])
}

/// Drops the leading frames that belong to the capture machinery, plus any frames whose
/// declaring type starts with one of `extra_prefixes`.
pub fn trim_capture_frames(frames: Vec<StackFrame>, extra_prefixes: &[&str]) -> Vec<StackFrame> {
    let is_capture_frame = |frame: &StackFrame| {
        frame.declaring_type.is_empty()
            || CAPTURE_FRAME_PREFIXES
                .iter()
                .chain(extra_prefixes)
                .any(|prefix| frame.declaring_type.starts_with(prefix))
    };
    frames.into_iter().skip_while(is_capture_frame).collect()
}

/// Parses the textual form of a `std::backtrace::Backtrace`.
///
/// Symbol lines look like `  3: my_app::handler::process` and are optionally followed by
/// `at ./src/handler.rs:42:9`. Inlined symbols appear as extra unnumbered symbol lines.
pub fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, line_no) = split_location(location);
                    frame.file = Some(file);
                    frame.line = line_no;
                }
            }
            continue;
        }

        let symbol = match line.split_once(": ") {
            Some((index, symbol)) if index.chars().all(|c| c.is_ascii_digit()) => symbol,
            // unnumbered lines before the first frame are status text such as
            // "disabled backtrace"
            _ if frames.is_empty() => continue,
            _ => line,
        };

        let (declaring_type, method) = split_symbol(strip_hash(symbol));
        frames.push(StackFrame::new(declaring_type, method));
    }

    frames
}

fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle, last) {
        // path:line:column
        (Some(path), Some(line), Some(_column)) if line.parse::<u32>().is_ok() => {
            (path.to_string(), line.parse().ok())
        }
        _ => match location.rsplit_once(':') {
            Some((path, line)) if line.parse::<u32>().is_ok() => {
                (path.to_string(), line.parse().ok())
            }
            _ => (location.to_string(), None),
        },
    }
}

fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            head
        }
        _ => symbol,
    }
}

/// Splits `a::b::<T as c::D>::method` at the last top-level `::`
fn split_symbol(symbol: &str) -> (String, String) {
    let bytes = symbol.as_bytes();
    let mut depth = 0usize;
    let mut split_at = None;

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && i + 1 < bytes.len() && bytes[i + 1] == b':' => {
                split_at = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    match split_at {
        Some(index) => (symbol[..index].to_string(), symbol[index + 2..].to_string()),
        None => (String::new(), symbol.to_string()),
    }
}
