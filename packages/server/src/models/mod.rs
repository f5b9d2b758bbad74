pub mod leaderboard;
pub mod shared;
pub mod submission;
