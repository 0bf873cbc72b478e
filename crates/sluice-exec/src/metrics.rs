//! Metrics/tracing hooks.
//!
//! Counters and timings are emitted as `tracing` events under the `sluice`
//! span; the binary decides where they go.

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "sluice", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}
