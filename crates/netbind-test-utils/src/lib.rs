//! Test utilities and mock collaborators for netbind development.
//!
//! [`MockEngine`] and [`MockScriptHost`] are cheap handles onto shared
//! state: hand one clone to a `Context` and keep another in the test to
//! drive peers, complete sends, drop script references and inspect what
//! the bridge did, including after the context is gone.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod engine;
mod host;

pub use engine::{EncodedToken, MockEngine, MESSAGE_CAPACITY};
pub use host::{MockScriptHost, PromiseState};
