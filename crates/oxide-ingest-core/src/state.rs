//! Lifecycle of one load cycle.
//!
//! ```text
//! Start -> ShapeChecked -> TableCreated   -> ColumnsReconciled -> RowsWritten -> Committed
//!                       \> TableConfirmed /
//! ```
//!
//! Any non-terminal state may move to `RolledBack`.

use std::fmt;

/// Where a load cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Transaction open, nothing read yet.
    Start,
    /// The table's shape has been read from the catalog.
    ShapeChecked,
    /// The table did not exist and was created.
    TableCreated,
    /// The table already existed.
    TableConfirmed,
    /// Every batch column exists in the table.
    ColumnsReconciled,
    /// Every row has been written.
    RowsWritten,
    /// The transaction committed.
    Committed,
    /// The transaction rolled back.
    RolledBack,
}

/// A transition the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid load state transition {from} -> {to}")]
pub struct InvalidTransition {
    /// State the cycle was in.
    pub from: LoadState,
    /// State that was requested.
    pub to: LoadState,
}

impl LoadState {
    /// Returns true for `Committed` and `RolledBack`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }

    /// Returns whether the lifecycle allows moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::RolledBack)
                | (Self::Start, Self::ShapeChecked)
                | (Self::ShapeChecked, Self::TableCreated | Self::TableConfirmed)
                | (
                    Self::TableCreated | Self::TableConfirmed,
                    Self::ColumnsReconciled
                )
                | (Self::ColumnsReconciled, Self::RowsWritten)
                | (Self::RowsWritten, Self::Committed)
        )
    }

    /// Moves to `next`, or reports the invalid transition.
    pub fn advance(&mut self, next: Self) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(next) {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ShapeChecked => "shape_checked",
            Self::TableCreated => "table_created",
            Self::TableConfirmed => "table_confirmed",
            Self::ColumnsReconciled => "columns_reconciled",
            Self::RowsWritten => "rows_written",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
