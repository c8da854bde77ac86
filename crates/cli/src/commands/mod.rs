pub mod check;
pub mod query;
pub mod watch;

pub use check::run_check;
pub use query::{run_query, QueryArgs, QueryOutcome};
pub use watch::run_watch;
