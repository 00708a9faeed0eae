//! # Collector
//!
//! Every instrumentation entry point, each logged under its ITT name.
//!
//! ```text
//! call(args)
//!   -> validate required references     (missing: WARN "Incorrect function call")
//!   -> render metadata / templates      (MetadataFormatter, printf)
//!   -> INFO "functions args: ..."       (EventLogger)
//! ```
//!
//! Validation always comes first: a rejected call renders nothing and logs
//! exactly one warning.

use std::env::VarError;
use std::fmt;
use std::sync::Arc;

use refcol_core::metadata::printf;
use refcol_core::{
    clamp_line, ContextMetadata, DomainRef, EventLogger, FormatArg, Level, MetadataFormatter,
    MetadataSlice, Registry, StringHandleRef, INCORRECT_CALL,
};

use crate::api::{CollectionScope, Counter, Histogram, Id, Timestamp};
use crate::config::CollectorConfig;
use crate::error::CollectorResult;
use crate::sink::build_sink;
use crate::symbols::{
    collector_hooks, BindReport, ErrorCode, ErrorHandler, SymbolResolver, SymbolTable,
    ERROR_HANDLER_SYMBOL,
};

/// Log source names, one per entry point.
mod source {
    pub const API_INIT: &str = "__itt_api_init";
    pub const DOMAIN_CREATE: &str = "__itt_domain_create";
    pub const STRING_HANDLE_CREATE: &str = "__itt_string_handle_create";
    pub const PAUSE: &str = "__itt_pause";
    pub const PAUSE_SCOPED: &str = "__itt_pause_scoped";
    pub const RESUME: &str = "__itt_resume";
    pub const RESUME_SCOPED: &str = "__itt_resume_scoped";
    pub const DETACH: &str = "__itt_detach";
    pub const FRAME_BEGIN: &str = "__itt_frame_begin_v3";
    pub const FRAME_END: &str = "__itt_frame_end_v3";
    pub const FRAME_SUBMIT: &str = "__itt_frame_submit_v3";
    pub const TASK_BEGIN: &str = "__itt_task_begin";
    pub const TASK_END: &str = "__itt_task_end";
    pub const METADATA_ADD: &str = "__itt_metadata_add";
    pub const FORMATTED_METADATA_ADD: &str = "__itt_formatted_metadata_add";
    pub const HISTOGRAM_SUBMIT: &str = "__itt_histogram_submit";
    pub const BIND_CONTEXT_METADATA: &str = "__itt_bind_context_metadata_to_counter";
    pub const COUNTER_SET_VALUE: &str = "__itt_counter_set_value_v3";
}

const FUNCTION_CALL: &str = "function call";

/// The reference collector.
///
/// Owns the registry, the formatter, the event sink and the host hooks.
/// Every method is safe to call from any thread.
pub struct Collector {
    config: CollectorConfig,
    registry: Registry,
    formatter: MetadataFormatter,
    logger: Arc<dyn EventLogger>,
    hooks: SymbolTable<ErrorHandler>,
}

impl Collector {
    /// Builds a collector around `logger`. Hooks stay at their no-op
    /// fallbacks and the registry lock is built on first use.
    #[must_use]
    pub fn new(config: CollectorConfig, logger: Arc<dyn EventLogger>) -> Self {
        Self {
            registry: Registry::with_options(Arc::clone(&logger), config.gate_options()),
            formatter: MetadataFormatter::with_max_line_len(
                Arc::clone(&logger),
                config.max_line_len,
            ),
            hooks: collector_hooks(),
            logger,
            config,
        }
    }

    /// Builds the configured sink, binds hooks and runs [`Collector::api_init`].
    ///
    /// # Errors
    ///
    /// [`crate::CollectorError::Config`] if `config` is invalid. A registry
    /// failure is reported through the hooks and the log instead.
    pub fn init(
        config: CollectorConfig,
        resolver: &dyn SymbolResolver<ErrorHandler>,
    ) -> CollectorResult<Self> {
        config.validate()?;
        let logger = build_sink(&config);
        let mut collector = Self::new(config, logger);
        collector.bind_hooks(resolver);
        collector.api_init();
        Ok(collector)
    }

    /// [`Collector::init`] with configuration from the process environment.
    ///
    /// An unreadable environment falls back to defaults and is reported as
    /// [`ErrorCode::CantReadEnv`].
    ///
    /// # Errors
    ///
    /// As [`Collector::init`].
    pub fn from_env(resolver: &dyn SymbolResolver<ErrorHandler>) -> CollectorResult<Self> {
        Self::from_lookup(|key| std::env::var(key), resolver)
    }

    /// [`Collector::init`] with configuration from an environment lookup.
    ///
    /// On a lookup failure the defaults are used, still honouring the log
    /// directory variable, and the failure is reported as
    /// [`ErrorCode::CantReadEnv`].
    ///
    /// # Errors
    ///
    /// As [`Collector::init`].
    pub fn from_lookup<F>(
        lookup: F,
        resolver: &dyn SymbolResolver<ErrorHandler>,
    ) -> CollectorResult<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        match CollectorConfig::from_lookup(&lookup) {
            Ok(config) => Self::init(config, resolver),
            Err(err) => {
                let fallback = CollectorConfig::fallback_from_lookup(&lookup);
                let collector = Self::init(fallback, resolver)?;
                let message = err.to_string();
                collector.report_error(ErrorCode::CantReadEnv, &message);
                collector.logger.log(Level::Error, source::API_INIT, &message);
                Ok(collector)
            }
        }
    }

    /// Resolves the host hooks.
    pub fn bind_hooks(&mut self, resolver: &dyn SymbolResolver<ErrorHandler>) -> BindReport {
        let report = self.hooks.bind(resolver);
        tracing::debug!(resolved = ?report.resolved, fallback = ?report.fallback, "hooks bound");
        report
    }

    /// Builds the registry lock and logs the start of collection.
    ///
    /// A registry failure is reported as [`ErrorCode::System`] and logged
    /// as fatal. [`Collector::init`] calls this before anything else, so
    /// there it cannot fail. It can fail on a collector built with
    /// [`Collector::new`] when another thread is still building the lock
    /// and `init_timeout_ms` runs out.
    pub fn api_init(&self) {
        if let Err(err) = self.registry.ensure_initialized() {
            let message = err.to_string();
            self.report_error(ErrorCode::System, &message);
            self.logger.log(Level::Fatal, source::API_INIT, &message);
        }
        tracing::info!("{}", source::API_INIT);
        self.info(source::API_INIT, FUNCTION_CALL);
    }

    /// Passes an error to the host's error handler.
    pub fn report_error(&self, code: ErrorCode, message: &str) {
        tracing::warn!(%code, detail = message, "collector error");
        if let Some(handler) = self.hooks.get(ERROR_HANDLER_SYMBOL) {
            handler(code, message);
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// The name registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The event sink.
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn EventLogger> {
        &self.logger
    }

    /// Host hooks.
    #[must_use]
    pub fn hooks(&self) -> &SymbolTable<ErrorHandler> {
        &self.hooks
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Finds or creates the domain `name`. `None` for an empty name.
    pub fn domain_create(&self, name: &str) -> Option<DomainRef> {
        let domain = self.registry.find_or_create_domain(name)?;
        self.info(source::DOMAIN_CREATE, &format!("function args: name={name}"));
        Some(domain)
    }

    /// Finds or creates the string handle `name`. `None` for an empty name.
    pub fn string_handle_create(&self, name: &str) -> Option<StringHandleRef> {
        let handle = self.registry.find_or_create_string_handle(name)?;
        self.info(source::STRING_HANDLE_CREATE, &format!("function args: name={name}"));
        Some(handle)
    }

    // =========================================================================
    // Collection control
    // =========================================================================

    /// Pauses collection.
    pub fn pause(&self) {
        self.info(source::PAUSE, FUNCTION_CALL);
    }

    /// Pauses collection for `scope`.
    pub fn pause_scoped(&self, scope: CollectionScope) {
        self.info(source::PAUSE_SCOPED, &format!("functions args: scope={scope}"));
    }

    /// Resumes collection.
    pub fn resume(&self) {
        self.info(source::RESUME, FUNCTION_CALL);
    }

    /// Resumes collection for `scope`.
    pub fn resume_scoped(&self, scope: CollectionScope) {
        self.info(source::RESUME_SCOPED, &format!("functions args: scope={scope}"));
    }

    /// Detaches the collector.
    pub fn detach(&self) {
        self.info(source::DETACH, FUNCTION_CALL);
    }

    // =========================================================================
    // Frames and tasks
    // =========================================================================

    /// Marks the start of a frame.
    pub fn frame_begin(&self, domain: Option<&DomainRef>, _id: Option<&Id>) {
        self.log_domain(source::FRAME_BEGIN, domain);
    }

    /// Marks the end of a frame.
    pub fn frame_end(&self, domain: Option<&DomainRef>, _id: Option<&Id>) {
        self.log_domain(source::FRAME_END, domain);
    }

    /// Submits a complete frame.
    pub fn frame_submit(
        &self,
        domain: Option<&DomainRef>,
        _id: Option<&Id>,
        begin: Timestamp,
        end: Timestamp,
    ) {
        match domain {
            Some(domain) => self.info(
                source::FRAME_SUBMIT,
                &format!(
                    "functions args: domain={}, time_begin={begin}, time_end={end}",
                    domain.name()
                ),
            ),
            None => self.incorrect_call(source::FRAME_SUBMIT),
        }
    }

    /// Starts a task named by `name`.
    pub fn task_begin(
        &self,
        domain: Option<&DomainRef>,
        _task_id: Id,
        _parent_id: Id,
        name: Option<&StringHandleRef>,
    ) {
        match (domain, name) {
            (Some(domain), Some(name)) => self.info(
                source::TASK_BEGIN,
                &format!("functions args: domain={} handle={}", domain.name(), name.name()),
            ),
            _ => self.incorrect_call(source::TASK_BEGIN),
        }
    }

    /// Ends the current task.
    pub fn task_end(&self, domain: Option<&DomainRef>) {
        self.log_domain(source::TASK_END, domain);
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Attaches `count` elements of type `type_tag` read from `data`.
    pub fn metadata_add(
        &self,
        domain: Option<&DomainRef>,
        _id: Id,
        _key: Option<&StringHandleRef>,
        type_tag: u32,
        count: usize,
        data: &[u8],
    ) {
        let Some(domain) = domain.filter(|_| count != 0) else {
            self.incorrect_call(source::METADATA_ADD);
            return;
        };

        let metadata = self.formatter.format_array(type_tag, count, data);
        self.info(
            source::METADATA_ADD,
            &format!(
                "functions args: domain={} metadata_size={count} metadata[]={metadata}",
                domain.name()
            ),
        );
    }

    /// Typed form of [`Collector::metadata_add`].
    pub fn metadata_add_values(
        &self,
        domain: Option<&DomainRef>,
        id: Id,
        key: Option<&StringHandleRef>,
        values: MetadataSlice<'_>,
    ) {
        self.metadata_add(
            domain,
            id,
            key,
            values.metadata_type().tag(),
            values.len(),
            values.as_bytes(),
        );
    }

    /// Attaches text rendered from the printf-style template named by
    /// `format`.
    pub fn formatted_metadata_add(
        &self,
        domain: Option<&DomainRef>,
        format: Option<&StringHandleRef>,
        args: &[FormatArg],
    ) {
        let (Some(domain), Some(format)) = (domain, format) else {
            self.incorrect_call(source::FORMATTED_METADATA_ADD);
            return;
        };

        let rendered = printf::render(format.name(), args);
        let rendered = clamp_line(&rendered, self.config.max_line_len.saturating_sub(1));
        self.info(
            source::FORMATTED_METADATA_ADD,
            &format!(
                "functions args: domain={} formatted_metadata={rendered}",
                domain.name()
            ),
        );
    }

    /// Submits `length` histogram points. `x_data` may be omitted.
    pub fn histogram_submit(
        &self,
        histogram: Option<&Histogram>,
        length: usize,
        x_data: Option<&[u8]>,
        y_data: Option<&[u8]>,
    ) {
        let Some(histogram) = histogram else {
            self.logger.log(Level::Warn, source::HISTOGRAM_SUBMIT, "Histogram is NULL");
            return;
        };
        let Some(domain) = histogram.domain.as_ref() else {
            self.logger.log(Level::Warn, source::HISTOGRAM_SUBMIT, "Histogram domain is NULL");
            return;
        };
        let (Some(name), Some(y_data), true) = (histogram.name.as_deref(), y_data, length != 0)
        else {
            self.incorrect_call(source::HISTOGRAM_SUBMIT);
            return;
        };

        let x = x_data.map(|x_data| self.formatter.format_array(histogram.x_type, length, x_data));
        let y = self.formatter.format_array(histogram.y_type, length, y_data);

        let message = match x {
            Some(x) => format!(
                "functions args: domain={} name={name} histogram_size={length} x[]={x} y[]={y}",
                domain.name()
            ),
            None => format!(
                "functions args: domain={} name={name} histogram_size={length} y[]={y}",
                domain.name()
            ),
        };
        self.info(source::HISTOGRAM_SUBMIT, &message);
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Describes `counter` with context metadata.
    pub fn bind_context_metadata_to_counter(
        &self,
        counter: Option<&Counter>,
        metadata: &[ContextMetadata],
    ) {
        let Some(counter) = counter.filter(|_| !metadata.is_empty()) else {
            self.incorrect_call(source::BIND_CONTEXT_METADATA);
            return;
        };

        let rendered = self.formatter.format_context_list(metadata);
        self.info(
            source::BIND_CONTEXT_METADATA,
            &format!(
                "functions args: counter_name={} context_metadata_size={} context_metadata[]={rendered}",
                counter.name,
                metadata.len()
            ),
        );
    }

    /// Sets `counter` to `value`.
    pub fn counter_set_value(&self, counter: Option<&Counter>, value: Option<u64>) {
        match (counter, value) {
            (Some(counter), Some(value)) => self.info(
                source::COUNTER_SET_VALUE,
                &format!(
                    "functions args: counter_name={} counter_value={value}",
                    counter.name
                ),
            ),
            _ => self.incorrect_call(source::COUNTER_SET_VALUE),
        }
    }

    fn log_domain(&self, source: &str, domain: Option<&DomainRef>) {
        match domain {
            Some(domain) => {
                self.info(source, &format!("functions args: domain={}", domain.name()));
            }
            None => self.incorrect_call(source),
        }
    }

    fn info(&self, source: &str, message: &str) {
        self.logger.log(Level::Info, source, message);
    }

    fn incorrect_call(&self, source: &str) {
        self.logger.log(Level::Warn, source, INCORRECT_CALL);
    }
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refcol_core::{ContextType, LogRecord, MemoryLogger, MetadataType};

    fn collector() -> (Collector, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        (Collector::new(CollectorConfig::default(), logger.clone()), logger)
    }

    fn last(logger: &MemoryLogger) -> LogRecord {
        logger.last().unwrap()
    }

    #[test]
    fn test_domain_create_logs_registry_then_args() {
        let (collector, logger) = collector();

        let domain = collector.domain_create("gpu").unwrap();
        assert_eq!(domain.name(), "gpu");

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "created new domain name=gpu");
        assert_eq!(records[1].source, "__itt_domain_create");
        assert_eq!(records[1].message, "function args: name=gpu");

        assert_eq!(collector.domain_create("gpu").unwrap(), domain);
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let (collector, logger) = collector();

        assert!(collector.domain_create("").is_none());
        assert!(collector.string_handle_create("").is_none());

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.level == Level::Warn && r.message == INCORRECT_CALL));
        assert_eq!(records[1].source, "__itt_string_handle_create");
    }

    #[test]
    fn test_control_calls() {
        let (collector, logger) = collector();

        collector.pause();
        collector.resume_scoped(2);
        collector.detach();

        let records = logger.records();
        assert_eq!(records[0].source, "__itt_pause");
        assert_eq!(records[0].message, "function call");
        assert_eq!(records[1].message, "functions args: scope=2");
        assert_eq!(records[2].source, "__itt_detach");
    }

    #[test]
    fn test_frames_and_tasks() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("render").unwrap();
        let task = collector.string_handle_create("draw").unwrap();
        logger.clear();

        collector.frame_begin(Some(&domain), None);
        collector.frame_submit(Some(&domain), Some(&Id::new(1, 2, 3)), 100, 250);
        collector.task_begin(Some(&domain), Id::NULL, Id::NULL, Some(&task));
        collector.task_end(Some(&domain));

        let messages: Vec<String> = logger.records().into_iter().map(|r| r.message).collect();
        assert_eq!(
            messages,
            [
                "functions args: domain=render",
                "functions args: domain=render, time_begin=100, time_end=250",
                "functions args: domain=render handle=draw",
                "functions args: domain=render",
            ]
        );
    }

    #[test]
    fn test_missing_references_warn() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("d").unwrap();
        logger.clear();

        collector.frame_end(None, None);
        collector.task_begin(Some(&domain), Id::NULL, Id::NULL, None);
        collector.task_end(None);
        collector.counter_set_value(Some(&Counter::new("c")), None);

        assert_eq!(logger.count(Level::Warn), 4);
        assert_eq!(logger.count(Level::Info), 0);
        assert_eq!(logger.records()[0].source, "__itt_frame_end_v3");
    }

    #[test]
    fn test_metadata_add() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("d").unwrap();

        collector.metadata_add_values(Some(&domain), Id::NULL, None, MetadataSlice::U32(&[1, 2, 3]));
        assert_eq!(
            last(&logger).message,
            "functions args: domain=d metadata_size=3 metadata[]=1;2;3;"
        );

        let values = [0.5f64];
        collector.metadata_add(
            Some(&domain),
            Id::NULL,
            None,
            MetadataType::Double.tag(),
            1,
            double_bytes(&values),
        );
        assert_eq!(
            last(&logger).message,
            "functions args: domain=d metadata_size=1 metadata[]=0.500000;"
        );
    }

    fn double_bytes(values: &[f64]) -> &[u8] {
        MetadataSlice::Double(values).as_bytes()
    }

    #[test]
    fn test_metadata_add_validates_before_formatting() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("d").unwrap();
        logger.clear();

        // Unknown type, but count == 0 rejects first: no formatter warning
        collector.metadata_add(Some(&domain), Id::NULL, None, 99, 0, &[]);
        assert_eq!(logger.len(), 1);
        assert_eq!(last(&logger).message, INCORRECT_CALL);
        assert_eq!(last(&logger).source, "__itt_metadata_add");
    }

    #[test]
    fn test_metadata_unknown_type() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("d").unwrap();
        logger.clear();

        collector.metadata_add(Some(&domain), Id::NULL, None, 0, 2, &[0; 16]);
        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Level::Warn);
        assert_eq!(
            records[1].message,
            "functions args: domain=d metadata_size=2 metadata[]=<unknown>"
        );
    }

    #[test]
    fn test_formatted_metadata() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("d").unwrap();
        let format = collector.string_handle_create("frame %d took %.1fms").unwrap();

        collector.formatted_metadata_add(
            Some(&domain),
            Some(&format),
            &[FormatArg::from(7i64), FormatArg::from(16.5f64)],
        );
        assert_eq!(
            last(&logger).message,
            "functions args: domain=d formatted_metadata=frame 7 took 16.5ms"
        );

        collector.formatted_metadata_add(Some(&domain), None, &[]);
        assert_eq!(last(&logger).message, INCORRECT_CALL);
    }

    #[test]
    fn test_histogram_submit() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("d").unwrap();
        let histogram = Histogram::new(domain, "latency", MetadataType::U32, MetadataType::U64);

        let x = [1u32, 2];
        let y = [10u64, 20];
        let x_bytes = MetadataSlice::U32(&x).as_bytes();
        let y_bytes = MetadataSlice::U64(&y).as_bytes();

        collector.histogram_submit(Some(&histogram), 2, Some(x_bytes), Some(y_bytes));
        assert_eq!(
            last(&logger).message,
            "functions args: domain=d name=latency histogram_size=2 x[]=1;2; y[]=10;20;"
        );

        collector.histogram_submit(Some(&histogram), 2, None, Some(y_bytes));
        assert_eq!(
            last(&logger).message,
            "functions args: domain=d name=latency histogram_size=2 y[]=10;20;"
        );
    }

    #[test]
    fn test_histogram_preconditions() {
        let (collector, logger) = collector();
        let domain = collector.domain_create("d").unwrap();
        logger.clear();

        collector.histogram_submit(None, 1, None, Some(&[0; 8]));
        assert_eq!(last(&logger).message, "Histogram is NULL");

        let orphan = Histogram {
            domain: None,
            name: Some("h".into()),
            x_type: 0,
            y_type: MetadataType::U64.tag(),
        };
        collector.histogram_submit(Some(&orphan), 1, None, Some(&[0; 8]));
        assert_eq!(last(&logger).message, "Histogram domain is NULL");

        let histogram = Histogram::new(domain, "h", MetadataType::U64, MetadataType::U64);
        collector.histogram_submit(Some(&histogram), 0, None, Some(&[0; 8]));
        collector.histogram_submit(Some(&histogram), 1, None, None);

        assert_eq!(logger.count(Level::Warn), 4);
        assert_eq!(last(&logger).message, INCORRECT_CALL);
    }

    #[test]
    fn test_counters() {
        let (collector, logger) = collector();
        let counter = Counter::new("bytes");

        collector.bind_context_metadata_to_counter(
            Some(&counter),
            &[
                ContextMetadata::text(ContextType::Device, "gpu0"),
                ContextMetadata::value(ContextType::BandwidthFlag, 1),
            ],
        );
        assert_eq!(
            last(&logger).message,
            "functions args: counter_name=bytes context_metadata_size=2 context_metadata[]=gpu0;1;"
        );

        collector.counter_set_value(Some(&counter), Some(4096));
        assert_eq!(
            last(&logger).message,
            "functions args: counter_name=bytes counter_value=4096"
        );

        collector.bind_context_metadata_to_counter(Some(&counter), &[]);
        assert_eq!(last(&logger).level, Level::Warn);
    }

    #[test]
    fn test_api_init_builds_registry_lock() {
        let (collector, logger) = collector();
        collector.api_init();

        assert!(collector.registry().ensure_initialized().is_ok());
        let record = last(&logger);
        assert_eq!(record.source, "__itt_api_init");
        assert_eq!(record.level, Level::Info);
    }
}
