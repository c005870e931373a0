//! The seam through which command substitutions are executed.
//!
//! Expansion never runs commands itself. Whoever owns the parser and the job machinery implements
//! [`SubshellRunner`] and hands it to expansion through the
//! [`OperationContext`](crate::operation_context::OperationContext).

use crate::wchar::prelude::*;

/// Why a command substitution produced no usable output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubshellError {
    /// The command emitted more output than the read limit allows; the output was discarded.
    ReadTooMuch,
    /// The command was interrupted, for example by control-C.
    Cancelled,
    /// The command could not be evaluated at all. Carries the status to report.
    Failed(i32),
}

/// Runs the text of a command substitution and returns its output split into lines.
///
/// A command that runs but exits non-zero is not an error; its output is used all the same.
pub trait SubshellRunner {
    fn run(&self, cmd: &wstr) -> Result<Vec<WString>, SubshellError>;
}

/// Split the raw output of a command into the items of a command substitution: one per line, with
/// the newline removed. A final newline does not start another item.
pub fn split_output_lines(output: &wstr) -> Vec<WString> {
    if output.is_empty() {
        return vec![];
    }
    let output = if output.ends_with('\n') {
        output.slice_to(output.len() - 1)
    } else {
        output
    };
    output.split('\n').map(|line| line.to_owned()).collect()
}

impl<F> SubshellRunner for F
where
    F: Fn(&wstr) -> Result<Vec<WString>, SubshellError>,
{
    fn run(&self, cmd: &wstr) -> Result<Vec<WString>, SubshellError> {
        self(cmd)
    }
}
