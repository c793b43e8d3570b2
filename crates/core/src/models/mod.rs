//! Domain models shared by the Cloudlift crates.

pub mod directory;
pub mod identity;
pub mod plan;
pub mod report;
pub mod source;
