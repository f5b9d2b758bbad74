pub mod contest;
pub mod jwt;
