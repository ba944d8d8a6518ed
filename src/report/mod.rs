//! Terminal rendering for attempts, sessions and the interval table.

pub mod attempt;
pub mod history;

pub use attempt::print_score_result;
pub use history::{print_cumulative, print_intervals, print_mastery, print_session, print_session_list};
