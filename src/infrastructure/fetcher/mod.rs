//! Job source implementations

mod indeed;

pub use indeed::{IndeedConfig, IndeedJobFetcher};
