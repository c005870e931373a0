use crate::common::CancelChecker;
use crate::env::{EnvNull, Environment};
use crate::history::HistorySource;
use crate::subshell::SubshellRunner;
use crate::wildcard::{DirectoryLister, FsDirectoryLister};

/// A cancel checker that never cancels.
pub fn no_cancel() -> bool {
    false
}

/// How many results an expansion may produce when a command line runs.
pub const EXPANSION_LIMIT_DEFAULT: usize = 512 * 1024;
/// The limit for work nobody waits on, like highlighting.
pub const EXPANSION_LIMIT_BACKGROUND: usize = 512;

/// Everything an expansion reads from outside the word: variables, history, directory listings,
/// a runner for command substitutions, a result limit and a way to ask whether to stop.
pub struct OperationContext<'a> {
    vars: &'a dyn Environment,
    /// Backs `$history`. Without it, `$history` is a missing variable.
    history: Option<&'a dyn HistorySource>,
    /// Expanding a command substitution without a runner is an error.
    subshell: Option<&'a dyn SubshellRunner>,
    lister: &'a dyn DirectoryLister,
    pub expansion_limit: usize,
    pub cancel_checker: CancelChecker,
}

static NULL_ENV: EnvNull = EnvNull;
static FS_LISTER: FsDirectoryLister = FsDirectoryLister;

impl<'a> OperationContext<'a> {
    fn with_parts(
        vars: &'a dyn Environment,
        subshell: Option<&'a dyn SubshellRunner>,
        cancel_checker: CancelChecker,
        expansion_limit: usize,
    ) -> Self {
        OperationContext {
            vars,
            history: None,
            subshell,
            lister: &FS_LISTER,
            expansion_limit,
            cancel_checker,
        }
    }

    /// No variables, no runner, never cancelled.
    pub fn empty() -> OperationContext<'static> {
        OperationContext::background(&NULL_ENV, EXPANSION_LIMIT_DEFAULT)
    }

    /// For running a command line: command substitutions work.
    pub fn foreground(
        vars: &'a dyn Environment,
        subshell: &'a dyn SubshellRunner,
        cancel_checker: CancelChecker,
        expansion_limit: usize,
    ) -> Self {
        Self::with_parts(vars, Some(subshell), cancel_checker, expansion_limit)
    }

    pub fn background(vars: &'a dyn Environment, expansion_limit: usize) -> Self {
        Self::with_parts(vars, None, Box::new(no_cancel), expansion_limit)
    }

    pub fn background_with_cancel_checker(
        vars: &'a dyn Environment,
        cancel_checker: CancelChecker,
        expansion_limit: usize,
    ) -> Self {
        Self::with_parts(vars, None, cancel_checker, expansion_limit)
    }

    pub fn with_history(self, history: &'a dyn HistorySource) -> Self {
        OperationContext {
            history: Some(history),
            ..self
        }
    }

    pub fn with_subshell(self, subshell: &'a dyn SubshellRunner) -> Self {
        OperationContext {
            subshell: Some(subshell),
            ..self
        }
    }

    /// Read directories through `lister` instead of the filesystem.
    pub fn with_lister(self, lister: &'a dyn DirectoryLister) -> Self {
        OperationContext { lister, ..self }
    }

    pub fn vars(&self) -> &dyn Environment {
        self.vars
    }

    pub fn history(&self) -> Option<&dyn HistorySource> {
        self.history
    }

    pub fn subshell(&self) -> Option<&dyn SubshellRunner> {
        self.subshell
    }

    pub fn has_subshell(&self) -> bool {
        self.subshell.is_some()
    }

    pub fn lister(&self) -> &dyn DirectoryLister {
        self.lister
    }

    /// Whether the operation should stop now.
    pub fn check_cancel(&self) -> bool {
        (self.cancel_checker)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvMap;
    use crate::history::History;
    use crate::subshell::SubshellError;
    use crate::wchar::prelude::*;
    use std::cell::Cell;

    #[test]
    fn test_context_collaborators() {
        let ctx = OperationContext::empty();
        assert!(!ctx.has_subshell());
        assert!(ctx.history().is_none());
        assert!(!ctx.check_cancel());
        assert!(ctx.vars().get(L!("HOME")).is_none());
        assert_eq!(ctx.expansion_limit, EXPANSION_LIMIT_DEFAULT);

        let vars = EnvMap::new();
        let history: History = [L!("ls")].into_iter().collect();
        let runner = |_: &wstr| -> Result<Vec<WString>, SubshellError> { Ok(vec![]) };
        let ctx = OperationContext::foreground(&vars, &runner, Box::new(no_cancel), 10)
            .with_history(&history);
        assert!(ctx.has_subshell());
        assert_eq!(ctx.history().map(|h| h.size()), Some(1));
        assert_eq!(ctx.expansion_limit, 10);
    }

    #[test]
    fn test_cancel_checker() {
        let vars = EnvMap::new();
        let flag = std::rc::Rc::new(Cell::new(false));
        let checker_flag = flag.clone();
        let ctx = OperationContext::background_with_cancel_checker(
            &vars,
            Box::new(move || checker_flag.get()),
            EXPANSION_LIMIT_BACKGROUND,
        );
        assert!(!ctx.check_cancel());
        flag.set(true);
        assert!(ctx.check_cancel());
    }
}
