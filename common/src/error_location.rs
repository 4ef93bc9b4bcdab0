//! Source-location capture for error variants.
//!
//! Every error variant in this workspace carries the file/line/column where
//! it was constructed, so a logged error points straight at its origin
//! without a backtrace.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

/// Where an error was constructed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ErrorLocation {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl ErrorLocation {
    /// Capture the caller's source location.
    ///
    /// Annotate the constructing function with `#[track_caller]` to walk the
    /// capture up to *its* caller.
    #[track_caller]
    pub fn capture() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl Display for ErrorLocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "[{}:{}:{}]", self.file, self.line, self.column)
    }
}
