mod common;
mod gate;
mod leaderboard;
mod run;
