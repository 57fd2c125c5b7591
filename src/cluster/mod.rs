pub mod leader;
pub mod peers;

pub use leader::{LeaderCoordinator, LeaderSettlement, Role};
pub use peers::{LeadershipProbe, PeerAddress, PeerSet, PeerSetResolver, PeerStore};
