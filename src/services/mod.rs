//! Domain services used by the HTTP routes and the terminal front end.
//!
//! ARCHITECTURE
//! ============
//! `analysis` turns one prompt into a quotation report; `session` owns the
//! transcript and serializes turns. Routes and the CLI only translate
//! protocol and never touch session state directly.

pub mod analysis;
pub mod session;
