pub mod ids;
pub mod segment_best;
pub mod user;
