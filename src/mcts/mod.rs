pub mod config;
pub mod node;
pub mod search;
pub mod time_budget;
pub mod tree;

pub use config::{ConfigError, MctsConfig};
pub use node::{MctsNode, NodeId};
pub use search::{SearchBudget, SearchController};
pub use time_budget::time_recommendation;
pub use tree::SearchTree;
