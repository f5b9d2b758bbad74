pub mod execution;
pub mod judge_request;
pub mod judge_result;
pub mod retry;
pub mod text;
pub mod verdict;

pub use verdict::{CaseVerdict, Verdict};
