pub mod router;
pub mod table;

pub use router::Router;
pub use table::{AgentKeywords, RoutingTable};
