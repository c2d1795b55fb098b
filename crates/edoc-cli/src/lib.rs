//! # edoc-cli — Electronic Document Pipeline Command-Line Interface
//!
//! Thin clap front end over the pipeline crates.
//!
//! ## Subcommands
//!
//! - `sign` — Sign a business document with an RSA identity
//! - `verify` — Verify every signed document in a file, envelope or package
//! - `qr` — Derive a verification URL from a field string
//! - `assemble` — Sign documents and wrap them into an envelope or package
//! - `validate` — Run the structural validator over an envelope
//! - `submit` — Drive documents through submission and correction
//!
//! ## Crate Policy
//!
//! - Handlers delegate to domain crates; no pipeline logic lives here.
//! - Handlers return an exit code: 0 success, 2 a negative verdict
//!   (failed verification, structural issues, rejection). Errors exit 1.

pub mod assemble;
pub mod input;
pub mod qr;
pub mod sign;
pub mod submit;
pub mod validate;
pub mod verify;
