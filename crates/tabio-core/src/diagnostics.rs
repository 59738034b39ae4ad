//! Non-fatal diagnostics and the scoped verbosity policy.
//!
//! Diagnostics are logged through `tracing::warn!`. Whether they are emitted
//! is a per-thread policy: dispatch installs a [`ScopeGuard`] for the duration
//! of a read or write and the previous policy comes back when the guard drops,
//! including on early returns and errors.

use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::warn;

/// A non-fatal condition worth telling the user about.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A source descriptor replaced an explicitly supplied column argument.
    HeaderOverride { column: String, field: &'static str },
    /// A null sentinel was given for a column of a masked table.
    NullIgnored { column: String },
    /// A mask was given for a column of an unmasked table.
    MaskIgnored { column: String },
    /// A table was renamed to avoid a collision inside a table set.
    TableRenamed { from: String, to: String },
    /// An unnamed table was given a generated name inside a table set.
    UntitledTable { name: String },
    /// A deprecated entry point was used.
    Deprecated { old: String, replacement: String },
    /// Codec-specific warning.
    Codec { format: String, message: String },
}

impl Diagnostic {
    pub fn codec(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Short stable identifier, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::HeaderOverride { .. } => "header_override",
            Diagnostic::NullIgnored { .. } => "null_ignored",
            Diagnostic::MaskIgnored { .. } => "mask_ignored",
            Diagnostic::TableRenamed { .. } => "table_renamed",
            Diagnostic::UntitledTable { .. } => "untitled_table",
            Diagnostic::Deprecated { .. } => "deprecated",
            Diagnostic::Codec { .. } => "codec",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::HeaderOverride { column, field } => write!(
                f,
                "column {column:?}: {field} argument overridden by the column header"
            ),
            Diagnostic::NullIgnored { column } => write!(
                f,
                "column {column:?}: null value ignored because the table is masked"
            ),
            Diagnostic::MaskIgnored { column } => write!(
                f,
                "column {column:?}: mask ignored because the table is not masked"
            ),
            Diagnostic::TableRenamed { from, to } => {
                write!(f, "table {from:?} already exists, renamed to {to:?}")
            }
            Diagnostic::UntitledTable { name } => {
                write!(f, "table has no name, using {name:?}")
            }
            Diagnostic::Deprecated { old, replacement } => {
                write!(f, "{old} is deprecated; use {replacement} instead")
            }
            Diagnostic::Codec { format, message } => write!(f, "{format}: {message}"),
        }
    }
}

/// Whether diagnostics are emitted on the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Emit,
    Suppress,
}

impl Policy {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Policy::Emit
        } else {
            Policy::Suppress
        }
    }
}

thread_local! {
    static POLICY: Cell<Policy> = const { Cell::new(Policy::Emit) };
    static CAPTURED: RefCell<Option<Vec<Diagnostic>>> = const { RefCell::new(None) };
}

/// Restores the previous policy when dropped.
#[must_use = "the policy is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    previous: Policy,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        POLICY.with(|policy| policy.set(self.previous));
    }
}

/// Install a policy until the returned guard is dropped.
pub fn scoped(policy: Policy) -> ScopeGuard {
    let previous = POLICY.with(|current| current.replace(policy));
    ScopeGuard { previous }
}

/// Current policy of this thread.
pub fn policy() -> Policy {
    POLICY.with(Cell::get)
}

/// Emit a diagnostic unless the current policy suppresses it.
pub fn emit(diagnostic: Diagnostic) {
    if policy() == Policy::Suppress {
        return;
    }
    warn!(code = diagnostic.code(), "{diagnostic}");
    CAPTURED.with(|captured| {
        if let Some(buffer) = captured.borrow_mut().as_mut() {
            buffer.push(diagnostic);
        }
    });
}

/// Run `f` and collect every diagnostic it emits on this thread.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<Diagnostic>) {
    let outer = CAPTURED.with(|captured| captured.replace(Some(Vec::new())));
    let result = f();
    let collected = CAPTURED.with(|captured| captured.replace(outer));
    (result, collected.unwrap_or_default())
}
