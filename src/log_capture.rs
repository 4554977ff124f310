//! Records the log events of the calling thread, for tests that check what got reported.

use std::{io, sync::Arc};

use parking_lot::Mutex;

#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Runs `f` with the events of this thread formatted into the buffer.
    pub(crate) fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    /// Everything recorded so far, the buffer is emptied.
    pub(crate) fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_records_only_inside() {
        let logs = CapturedLogs::default();
        tracing::warn!("outside");
        logs.record(|| tracing::warn!(answer = 42, "inside"));

        let recorded = logs.take();
        assert!(recorded.contains("inside") && recorded.contains("answer=42"), "{recorded}");
        assert!(!recorded.contains("outside"));
        assert!(logs.take().is_empty());
    }
}
