//! Converter registry: who gets tried, in what order.
//!
//! Ordering has two tiers:
//!
//! 1. Converters that claimed the input's extension, in priority order.
//! 2. Every other converter, in priority order.
//!
//! Within a tier, lower priority numbers go first, and at equal priority the
//! most recently registered converter goes first. That tie-break is what lets
//! a caller override a built-in: register a replacement at the same priority
//! after the built-ins and it wins.
//!
//! The registry is filled while the engine is built and never mutated
//! afterwards, so concurrent conversions read it without locking.

use crate::converter::DocumentConverter;
use crate::error::Doc2MdError;
use crate::stream_info::{normalize_extension, StreamInfo};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// For converters that handle one specific format (PDF, CSV, …).
pub const PRIORITY_SPECIFIC_FILE_FORMAT: f64 = 0.0;

/// For converters that handle broad families (any text, any HTML, any zip).
pub const PRIORITY_GENERIC_FILE_FORMAT: f64 = 10.0;

/// One registered converter.
#[derive(Clone)]
pub struct ConverterRegistration {
    pub converter: Arc<dyn DocumentConverter>,
    pub priority: f64,
    pub claimed_extensions: BTreeSet<String>,
    /// Registration sequence number; higher = registered later.
    pub seq: usize,
}

impl fmt::Debug for ConverterRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistration")
            .field("converter", &self.converter.name())
            .field("priority", &self.priority)
            .field("claimed_extensions", &self.claimed_extensions)
            .field("seq", &self.seq)
            .finish()
    }
}

/// All registrations, kept sorted in dispatch order.
#[derive(Debug, Default, Clone)]
pub struct ConverterRegistry {
    /// Sorted: ascending priority, then descending `seq`.
    registrations: Vec<ConverterRegistration>,
    /// Extension → positions in `registrations`, in dispatch order.
    by_extension: HashMap<String, Vec<usize>>,
    next_seq: usize,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter under the extensions it claims itself.
    pub fn register(
        &mut self,
        converter: Arc<dyn DocumentConverter>,
        priority: f64,
    ) -> Result<(), Doc2MdError> {
        let claims: Vec<String> = converter
            .claimed_extensions()
            .iter()
            .map(|e| e.to_string())
            .collect();
        self.register_with_extensions(converter, priority, claims)
    }

    /// Register a converter under an explicit set of extensions.
    pub fn register_with_extensions<I, S>(
        &mut self,
        converter: Arc<dyn DocumentConverter>,
        priority: f64,
        extensions: I,
    ) -> Result<(), Doc2MdError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !priority.is_finite() {
            return Err(Doc2MdError::InvalidConfig(format!(
                "priority for '{}' must be a finite number, got {}",
                converter.name(),
                priority
            )));
        }

        let claimed_extensions: BTreeSet<String> = extensions
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();

        let registration = ConverterRegistration {
            converter,
            priority,
            claimed_extensions,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        // Insert ahead of every registration with the same or a higher
        // priority number: newest first among equals.
        let at = self
            .registrations
            .iter()
            .position(|r| r.priority >= priority)
            .unwrap_or(self.registrations.len());
        self.registrations.insert(at, registration);
        self.rebuild_index();
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.by_extension.clear();
        for (idx, reg) in self.registrations.iter().enumerate() {
            for ext in &reg.claimed_extensions {
                self.by_extension.entry(ext.clone()).or_default().push(idx);
            }
        }
    }

    /// Every registration in full priority order.
    pub fn registrations(&self) -> &[ConverterRegistration] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Candidates for `info`, in the order they should be tried.
    pub fn candidates_for(&self, info: &StreamInfo) -> Vec<&ConverterRegistration> {
        let claimed: &[usize] = info
            .extension
            .as_deref()
            .and_then(normalize_extension)
            .and_then(|ext| self.by_extension.get(&ext))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut ordered: Vec<&ConverterRegistration> = Vec::with_capacity(self.registrations.len());
        ordered.extend(claimed.iter().map(|&i| &self.registrations[i]));
        ordered.extend(
            self.registrations
                .iter()
                .enumerate()
                .filter(|(i, _)| !claimed.contains(i))
                .map(|(_, r)| r),
        );
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConversionContext, ReadSeek};
    use crate::error::ConverterError;
    use crate::output::ConversionResult;
    use async_trait::async_trait;

    struct Named(&'static str, &'static [&'static str]);

    #[async_trait]
    impl DocumentConverter for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn claimed_extensions(&self) -> &[&str] {
            self.1
        }
        fn accepts(&self, _: &mut dyn ReadSeek, _: &StreamInfo) -> Result<bool, ConverterError> {
            Ok(true)
        }
        async fn convert(
            &self,
            _: &mut dyn ReadSeek,
            _: &StreamInfo,
            _: &ConversionContext<'_>,
        ) -> Result<ConversionResult, ConverterError> {
            Ok(ConversionResult::new(self.0))
        }
    }

    fn named(name: &'static str) -> Arc<dyn DocumentConverter> {
        Arc::new(Named(name, &[]))
    }

    fn names(regs: &[&ConverterRegistration]) -> Vec<String> {
        regs.iter().map(|r| r.converter.name().to_string()).collect()
    }

    #[test]
    fn lower_priority_number_first() {
        let mut reg = ConverterRegistry::new();
        reg.register(named("generic"), PRIORITY_GENERIC_FILE_FORMAT).unwrap();
        reg.register(named("specific"), PRIORITY_SPECIFIC_FILE_FORMAT).unwrap();
        reg.register(named("middle"), 5.0).unwrap();
        let order = names(&reg.candidates_for(&StreamInfo::default()));
        assert_eq!(order, ["specific", "middle", "generic"]);
    }

    #[test]
    fn later_registration_wins_ties() {
        let mut reg = ConverterRegistry::new();
        reg.register(named("first"), 1.0).unwrap();
        reg.register(named("second"), 1.0).unwrap();
        reg.register(named("third"), 1.0).unwrap();
        reg.register(named("early"), 0.5).unwrap();
        let order = names(&reg.candidates_for(&StreamInfo::default()));
        assert_eq!(order, ["early", "third", "second", "first"]);
    }

    #[test]
    fn claimed_extension_goes_first_regardless_of_priority() {
        let mut reg = ConverterRegistry::new();
        reg.register(Arc::new(Named("foo", &["FOO"])), 5.0).unwrap();
        reg.register(named("generic"), 1.0).unwrap();

        let info = StreamInfo::new().with_extension(".foo");
        assert_eq!(names(&reg.candidates_for(&info)), ["foo", "generic"]);

        // without the extension, plain priority order applies
        assert_eq!(names(&reg.candidates_for(&StreamInfo::default())), ["generic", "foo"]);
    }

    #[test]
    fn claimed_tier_is_ordered_and_not_repeated() {
        let mut reg = ConverterRegistry::new();
        reg.register(Arc::new(Named("csv-old", &[".csv"])), 0.0).unwrap();
        reg.register(named("text"), 10.0).unwrap();
        reg.register(Arc::new(Named("csv-new", &["csv"])), 0.0).unwrap();
        reg.register(Arc::new(Named("csv-slow", &[".csv"])), 3.0).unwrap();
        reg.register(named("fast"), -1.0).unwrap();

        let info = StreamInfo::new().with_extension("CSV");
        assert_eq!(
            names(&reg.candidates_for(&info)),
            ["csv-new", "csv-old", "csv-slow", "fast", "text"]
        );
    }

    #[test]
    fn unknown_extension_falls_back_to_full_order() {
        let mut reg = ConverterRegistry::new();
        reg.register(Arc::new(Named("pdf", &[".pdf"])), 0.0).unwrap();
        reg.register(named("text"), 10.0).unwrap();
        let info = StreamInfo::new().with_extension(".weird");
        assert_eq!(names(&reg.candidates_for(&info)), ["pdf", "text"]);
    }

    #[test]
    fn explicit_extension_registration() {
        let mut reg = ConverterRegistry::new();
        reg.register(named("text"), 0.0).unwrap();
        reg.register_with_extensions(named("log"), 10.0, [".LOG", "log", ""])
            .unwrap();
        let log = reg
            .registrations()
            .iter()
            .find(|r| r.converter.name() == "log")
            .unwrap();
        assert_eq!(log.claimed_extensions.len(), 1);
        assert!(log.claimed_extensions.contains(".log"));
        let info = StreamInfo::new().with_extension("log");
        assert_eq!(names(&reg.candidates_for(&info)), ["log", "text"]);
    }

    #[test]
    fn non_finite_priority_is_rejected() {
        let mut reg = ConverterRegistry::new();
        assert!(matches!(
            reg.register(named("nan"), f64::NAN),
            Err(Doc2MdError::InvalidConfig(_))
        ));
        assert!(reg.is_empty());
    }
}
