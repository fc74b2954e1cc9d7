pub mod job;
pub mod operation;
pub mod wizard;
