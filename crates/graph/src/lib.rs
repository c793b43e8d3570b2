//! Cloudlift Graph: Microsoft Entra ID directory client and the
//! migration execution engine.
//!
//! The client speaks Microsoft Graph over reqwest with a client-credentials
//! token; the engine drives any `DirectoryClient` through the execution
//! phase of a migration plan.

pub mod auth;
pub mod client;
pub mod groups;
pub mod models;
pub mod password;
pub mod retry;
pub mod sync;

#[cfg(test)]
mod testing;
