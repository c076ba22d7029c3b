//! Business-logic services composed over the domain ports.

pub mod mail;
pub mod molecule;
pub mod review_queue;
pub mod sling;

pub use sling::{SlingRequest, SlingResult};
