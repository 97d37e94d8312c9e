//! The contract every format converter implements.
//!
//! The engine only ever talks to converters through [`DocumentConverter`]:
//! a cheap [`accepts`](DocumentConverter::accepts) test and a
//! [`convert`](DocumentConverter::convert) operation. Neither may assume
//! where the stream is positioned on entry, and neither has to restore it;
//! the engine seeks back to the original start offset before every call.

use crate::config::EngineConfig;
use crate::engine::DocumentEngine;
use crate::error::{ConverterError, Doc2MdError};
use crate::output::ConversionResult;
use crate::stream_info::StreamInfo;
use async_trait::async_trait;
use edgequake_llm::LLMProvider;
use std::io::{Read, Seek};
use std::sync::Arc;

/// A seekable byte stream the engine can rewind between candidates.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A format converter.
///
/// Implementations are registered once on a [`DocumentEngine`] and shared
/// across concurrent conversions, hence `Send + Sync` and `&self`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Identity used in logs and in [`crate::error::FailedAttempt`].
    fn name(&self) -> &str;

    /// Extensions (e.g. `.pdf`) this converter wants to be tried first for.
    fn claimed_extensions(&self) -> &[&str] {
        &[]
    }

    /// Cheap, side-effect-free check of whether this converter can handle
    /// the input. An `Err` is treated as "no".
    fn accepts(&self, input: &mut dyn ReadSeek, info: &StreamInfo) -> Result<bool, ConverterError>;

    /// Produce Markdown. Only called after `accepts` returned `Ok(true)`.
    async fn convert(
        &self,
        input: &mut dyn ReadSeek,
        info: &StreamInfo,
        ctx: &ConversionContext<'_>,
    ) -> Result<ConversionResult, ConverterError>;
}

/// What a converter may reach back into while converting.
pub struct ConversionContext<'a> {
    engine: &'a DocumentEngine,
    depth: usize,
}

impl<'a> ConversionContext<'a> {
    pub(crate) fn new(engine: &'a DocumentEngine, depth: usize) -> Self {
        Self { engine, depth }
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// The caption provider resolved when the engine was built, if any.
    pub fn llm_provider(&self) -> Option<&Arc<dyn LLMProvider>> {
        self.engine.llm_provider()
    }

    /// How many archive levels deep this conversion is (0 = top level).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run an embedded document (e.g. an archive member) through the full
    /// dispatch loop one level deeper.
    pub async fn convert_nested(
        &self,
        bytes: Vec<u8>,
        hint: StreamInfo,
    ) -> Result<Result<ConversionResult, Doc2MdError>, ConverterError> {
        let depth = self.depth + 1;
        let limit = self.config().max_nesting_depth;
        if depth > limit {
            return Err(ConverterError::NestingTooDeep { depth, limit });
        }
        let mut cursor = std::io::Cursor::new(bytes);
        Ok(self.engine.dispatch(&mut cursor, &hint, depth).await)
    }
}
