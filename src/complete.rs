//! Expansion results and the bounded list they are collected into.

use crate::wchar::prelude::*;
use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct CompleteFlags: u8 {
        /// No space should follow this result when it is inserted.
        const NO_SPACE = 1 << 0;
        /// The result is a whole token, not a suffix of what was typed.
        const REPLACES_TOKEN = 1 << 1;
        /// A leading `~` must stay unescaped.
        const DONT_ESCAPE_TILDES = 1 << 2;
    }
}

pub type CompletionList = Vec<Completion>;

/// One expanded word, or one candidate when completing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Completion {
    pub completion: WString,
    /// Shown next to candidates, e.g. "directory".
    pub description: WString,
    pub flags: CompleteFlags,
}

impl From<WString> for Completion {
    fn from(completion: WString) -> Completion {
        Completion::from_completion(completion)
    }
}

impl Completion {
    pub fn new(completion: WString, description: WString, flags: CompleteFlags) -> Self {
        Completion {
            completion,
            description,
            flags,
        }
    }

    pub fn from_completion(completion: WString) -> Self {
        Completion {
            completion,
            ..Default::default()
        }
    }

    pub fn replaces_token(&self) -> bool {
        self.flags.contains(CompleteFlags::REPLACES_TOKEN)
    }

    /// Put `prefix` in front of a whole-token result. Suffix results are left alone.
    pub fn prepend_token_prefix(&mut self, prefix: &wstr) {
        if self.replaces_token() {
            self.completion.insert_utfstr(0, prefix);
        }
    }
}

/// Collects results up to a fixed limit. Every insertion reports whether it fit, so that
/// callers can turn a full receiver into an overflow error.
pub struct CompletionReceiver {
    completions: Vec<Completion>,
    limit: usize,
}

impl std::ops::Deref for CompletionReceiver {
    type Target = [Completion];

    fn deref(&self) -> &[Completion] {
        &self.completions
    }
}

impl std::ops::DerefMut for CompletionReceiver {
    fn deref_mut(&mut self) -> &mut [Completion] {
        &mut self.completions
    }
}

impl CompletionReceiver {
    pub fn new(limit: usize) -> Self {
        Self::from_list(Vec::new(), limit)
    }

    /// Start from `completions`, which count against `limit`.
    pub fn from_list(completions: Vec<Completion>, limit: usize) -> Self {
        CompletionReceiver { completions, limit }
    }

    #[must_use]
    pub fn add(&mut self, comp: impl Into<Completion>) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.completions.push(comp.into());
        true
    }

    /// All or nothing: when the items do not fit, none are added.
    #[must_use]
    pub fn extend(&mut self, items: Vec<Completion>) -> bool {
        if items.len() > self.remaining() {
            return false;
        }
        self.completions.extend(items);
        true
    }

    pub fn size(&self) -> usize {
        self.completions.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.completions.len())
    }

    pub fn get_list(&self) -> &[Completion] {
        &self.completions
    }

    pub fn take(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    /// An empty receiver limited to what is left of ours, for results that get post-processed
    /// before they are added here.
    pub fn subreceiver(&self) -> Self {
        Self::new(self.remaining())
    }
}
