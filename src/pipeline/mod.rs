//! Pipeline stages shared by the engine and the built-in converters.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ (dispatch) ──▶ converter ──▶ postprocess
//!                            │
//!                            ├─ layout          (PDF glyphs → text)
//!                            └─ encode ──▶ llm  (image → caption)
//! ```
//!
//! 1. [`input`]       — resolve paths, `file:`/`data:` URIs and HTTP responses
//!    to bytes plus [`crate::StreamInfo`] hints
//! 2. [`layout`]      — rebuild lines and paragraphs from positioned glyphs
//! 3. [`encode`]      — base64-wrap image bytes for the multimodal API
//! 4. [`llm`]         — caption call with retry/backoff; the only stage that
//!    talks to an LLM
//! 5. [`postprocess`] — the single normalisation pass applied to every result

pub mod encode;
pub mod input;
pub mod layout;
pub mod llm;
pub mod postprocess;
