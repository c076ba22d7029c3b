pub mod agents;
pub mod beads;
pub mod common;
pub mod config;
pub mod escalations;
pub mod mail;
pub mod mayor;
pub mod mayor_tools;
pub mod molecules;
pub mod review_queue;
