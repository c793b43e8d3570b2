//! On-premise directory export parsing.
//!
//! Two formats are recognized by file extension: a JSON document with
//! `users` and `groups` arrays, and a flat CSV of user rows as produced by
//! `Get-ADUser | Export-Csv`. Only presence checks are applied.

pub mod reader;
pub mod rows;

pub use reader::read_export;
