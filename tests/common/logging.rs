use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

/// the #[traced_test] decorator does not work well with integration
/// tests because each test module runs in its own crate, and the
/// decorator macro filters out events from peer_framing.
///
/// A solution is to NOT use #[traced_test] and instead call this
/// method at start of each test.
///
/// note that one cannot do both as there can be only one global
/// default subscriber.
pub fn tracing_logger() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("self=trace,peer_framing=trace"));
    let subscriber = FmtSubscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(env_filter)
        .with_thread_ids(true)
        .with_test_writer()
        .finish();

    // fails if another test in this process already set it
    let _result = tracing::subscriber::set_global_default(subscriber);
}
