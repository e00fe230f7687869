//! Stages of the upload pipeline.
//!
//! Each submodule implements one step; [`crate::upload`] strings them
//! together and owns the rollback.
//!
//! ## Data Flow
//!
//! ```text
//! filename ──▶ (write) ──▶ text ──▶ llm ──▶ postprocess ──▶ JSON
//! (sanitise)             (pdf)    (chat)   (unfence)
//! ```
//!
//! 1. [`filename`]    — sanitise, extension check, collision-free reservation
//! 2. [`text`]        — PDF bytes to plain text
//! 3. [`llm`]         — the only stage with network I/O
//! 4. [`postprocess`] — strip packaging from the model answer before parsing

pub mod filename;
pub mod llm;
pub mod postprocess;
pub mod text;
