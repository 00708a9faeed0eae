//! Host error handler wiring.

use parking_lot::Mutex;
use refcol::symbols::ERROR_HANDLER_SYMBOL;
use refcol::{Collector, CollectorConfig, ErrorCode, ErrorHandler, StaticResolver};

static REPORTED: Mutex<Vec<(ErrorCode, String)>> = parking_lot::const_mutex(Vec::new());

fn record_error(code: ErrorCode, message: &str) {
    REPORTED.lock().push((code, message.to_owned()));
}

#[test]
fn test_bound_handler_receives_reports() {
    let resolver = StaticResolver::new().with(ERROR_HANDLER_SYMBOL, record_error as ErrorHandler);
    let collector = Collector::init(CollectorConfig::tracing_only(), &resolver).unwrap();

    assert!(collector.hooks().is_resolved(ERROR_HANDLER_SYMBOL));
    collector.report_error(ErrorCode::CantReadEnv, "INTEL_LIBITTNOTIFY_LOG_DIR is not valid unicode");

    let reported = REPORTED.lock();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].0, ErrorCode::CantReadEnv);
    assert!(reported[0].1.contains("INTEL_LIBITTNOTIFY_LOG_DIR"));
}

#[test]
fn test_unbound_handler_is_a_noop() {
    let collector = Collector::init(CollectorConfig::tracing_only(), &StaticResolver::<ErrorHandler>::new()).unwrap();

    assert!(!collector.hooks().is_resolved(ERROR_HANDLER_SYMBOL));
    collector.report_error(ErrorCode::System, "ignored");
}
