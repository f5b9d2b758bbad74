pub mod hub;
pub mod ranker;

pub use hub::{LeaderboardError, LeaderboardHub};
pub use ranker::{LeaderboardRow, Standings};
