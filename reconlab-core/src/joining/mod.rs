//! Cross-source joins: fee backfill and the late authoritative feed.

pub mod fees;
pub mod late_feed;

pub use fees::{distribute_proportional, join_fees};
pub use late_feed::merge_late_feed;
