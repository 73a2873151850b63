// Routing session: transaction affinity, the optional replica and the router
pub mod replica;
pub mod replication;
pub mod state;

pub use replica::Replica;
pub use replication::{determine_route, QueryRoute, ReplicationAdapter};
pub use state::TransactionState;
