pub mod contest;
pub mod contest_participant;
pub mod question;
pub mod submission;
pub mod test_case;
