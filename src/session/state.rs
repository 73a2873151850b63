use crate::Result;
use serde::Serialize;

/// Transaction affinity of a router session.
///
/// Transitions are driven by the outcome of the primary's own
/// begin/commit/rollback call:
///
/// | call | primary succeeds | primary fails |
/// |---|---|---|
/// | begin | `InTransaction` | unchanged |
/// | commit | `Autocommit` | unchanged |
/// | rollback | `Autocommit` | `Autocommit` |
///
/// A failed commit leaves the backend transaction open, so reads keep
/// going to the primary until the caller rolls back. A rollback always
/// ends affinity: after it there is no transaction left to be consistent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TransactionState {
    #[default]
    Autocommit,
    InTransaction,
}

impl TransactionState {
    pub fn in_transaction(self) -> bool {
        self == TransactionState::InTransaction
    }

    pub fn after_begin<T>(&mut self, outcome: &Result<T>) {
        if outcome.is_ok() {
            *self = TransactionState::InTransaction;
        }
    }

    pub fn after_commit<T>(&mut self, outcome: &Result<T>) {
        if outcome.is_ok() {
            *self = TransactionState::Autocommit;
        }
    }

    pub fn after_rollback<T>(&mut self, _outcome: &Result<T>) {
        *self = TransactionState::Autocommit;
    }
}
