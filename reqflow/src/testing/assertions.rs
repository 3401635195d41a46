//! Test assertions for pipeline outcomes.

use crate::processor::Processor;
use crate::testing::CallLog;

/// Asserts that the pipeline finished normally with `code`.
pub fn assert_answered(processor: &dyn Processor, code: u16) {
    assert!(
        processor.is_finished(),
        "Expected finished processor, it is still running"
    );
    assert!(
        !processor.aborted(),
        "Expected answered pipeline, got abort with code {}",
        processor.response_code()
    );
    assert_eq!(
        processor.response_code(),
        code,
        "Expected response code {}, got {}",
        code,
        processor.response_code()
    );
}

/// Asserts that the pipeline was aborted with `code`.
pub fn assert_aborted(processor: &dyn Processor, code: u16) {
    assert!(
        processor.aborted(),
        "Expected aborted pipeline, got answer with code {}",
        processor.response_code()
    );
    assert!(processor.is_finished(), "Aborted processor must be finished");
    assert_eq!(
        processor.response_code(),
        code,
        "Expected response code {}, got {}",
        code,
        processor.response_code()
    );
}

/// Asserts that the log recorded exactly `expected`, in order.
pub fn assert_calls(log: &CallLog, expected: &[&str]) {
    let actual = log.entries();
    assert_eq!(
        actual, expected,
        "Expected calls {expected:?}, got {actual:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{handler, RootProcessor};
    use crate::testing::{RecordingResponder, TestRequest};

    fn run_root(h: crate::processor::Handler) -> RootProcessor {
        let responder = RecordingResponder::new();
        let mut root = RootProcessor::new("assert", TestRequest::get("/").build(), 200, responder.handler());
        root.then(h);
        root.run();
        root
    }

    #[test]
    fn test_assert_answered() {
        let root = run_root(handler(|p, _| p.answer(202)));
        assert_answered(&root, 202);
    }

    #[test]
    #[should_panic(expected = "Expected answered pipeline")]
    fn test_assert_answered_fails_on_abort() {
        let root = run_root(handler(|p, _| p.abort(500, None)));
        assert_answered(&root, 500);
    }

    #[test]
    fn test_assert_aborted() {
        let root = run_root(handler(|p, _| p.abort(418, None)));
        assert_aborted(&root, 418);
    }

    #[test]
    fn test_assert_calls() {
        let log = CallLog::new();
        log.push("a");
        log.push("b");
        assert_calls(&log, &["a", "b"]);
    }
}
