//! Session persistence. Kept outside the scoring core: the engine only
//! produces records, these modules store them.

pub mod db;
pub mod session_data;
pub mod store;

pub use session_data::{CumulativeResult, NoteResult, SessionResult};
