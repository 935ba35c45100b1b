//! Reporting of contained delivery failures.
//!
//! A failing subscriber must not disturb the mutation that triggered it or
//! any sibling delivery. The host therefore never propagates a
//! [`CallbackFailure`]; it hands it to the [`FailureSink`] it was built with.

use crate::error::CallbackFailure;

/// Receives callback failures from a binding host.
pub trait FailureSink {
    fn report(&self, failure: &CallbackFailure);
}

/// Default sink: logs each failure as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn report(&self, failure: &CallbackFailure) {
        tracing::warn!(
            path = %failure.path,
            reason = %failure.reason,
            "binding callback failed"
        );
    }
}

impl<F> FailureSink for F
where
    F: Fn(&CallbackFailure),
{
    fn report(&self, failure: &CallbackFailure) {
        self(failure)
    }
}
