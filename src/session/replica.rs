use crate::adapter::DatabaseAdapter;
use crate::Result;
use std::fmt;
use tracing::warn;

/// The optional secondary of a router, decided once at construction.
pub enum Replica {
    Absent,
    Present(Box<dyn DatabaseAdapter>),
}

impl Replica {
    pub fn new(adapter: Option<Box<dyn DatabaseAdapter>>) -> Self {
        match adapter {
            Some(adapter) => Replica::Present(adapter),
            None => Replica::Absent,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Replica::Present(_))
    }

    /// Apply `op` to the replica if there is one.
    ///
    /// An absent replica is a valid configuration, not a failure: the call
    /// is a no-op and returns `Ok`. Errors from a present replica are
    /// returned unchanged.
    pub fn guard<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&mut dyn DatabaseAdapter) -> Result<()>,
    {
        match self {
            Replica::Absent => Ok(()),
            Replica::Present(adapter) => {
                let name = adapter.config().name.clone();
                op(&mut **adapter).inspect_err(|e| warn!("Mirrored call failed on {}: {}", name, e))
            }
        }
    }

    /// `false` when absent
    pub fn is_connected(&self) -> bool {
        match self {
            Replica::Absent => false,
            Replica::Present(adapter) => adapter.is_connected(),
        }
    }

    pub fn as_adapter(&self) -> Option<&dyn DatabaseAdapter> {
        match self {
            Replica::Absent => None,
            Replica::Present(adapter) => Some(&**adapter),
        }
    }

    pub fn as_adapter_mut(&mut self) -> Option<&mut dyn DatabaseAdapter> {
        match self {
            Replica::Absent => None,
            Replica::Present(adapter) => Some(&mut **adapter),
        }
    }

    pub fn into_inner(self) -> Option<Box<dyn DatabaseAdapter>> {
        match self {
            Replica::Absent => None,
            Replica::Present(adapter) => Some(adapter),
        }
    }
}

impl fmt::Debug for Replica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replica::Absent => f.write_str("Absent"),
            Replica::Present(adapter) => f
                .debug_tuple("Present")
                .field(&adapter.config().name)
                .finish(),
        }
    }
}
