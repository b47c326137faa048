pub mod guards;
pub mod search;
pub mod stats;
pub mod unused;
