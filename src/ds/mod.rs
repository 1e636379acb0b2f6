pub mod node_store;
pub mod shard;

pub use node_store::{ListHandle, ListIter, NodeId, NodeStore};
pub use shard::{DefaultShardHasher, ShardSelector};
