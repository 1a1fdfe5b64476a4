//! Console recorder: routes rendered records to `tracing` events so chain
//! logs end up wherever the process subscriber sends them.

use tracing::{debug, error, info};

use super::LogRecorder;
use crate::record::{LogRecord, RecordKind, RecordTemplate};

/// Emits each record as a `tracing` event at a level matching the record
/// kind (`log` and `info` map to info, there is no separate `log` level).
#[derive(Debug, Default)]
pub struct ConsoleRecorder {
    template: RecordTemplate,
}

impl ConsoleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: RecordTemplate) -> Self {
        self.template = template;
        self
    }
}

impl LogRecorder for ConsoleRecorder {
    fn record(&self, record: &LogRecord) {
        let line = self.template.render(record);
        match record.kind {
            RecordKind::Log | RecordKind::Info => info!(target: "micromesh::chain", "{line}"),
            RecordKind::Debug => debug!(target: "micromesh::chain", "{line}"),
            RecordKind::Error => error!(target: "micromesh::chain", "{line}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;
    use std::sync::Arc;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl SharedWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedWriter {
        type Writer = SharedWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn record(kind: RecordKind, content: &str) -> LogRecord {
        LogRecord {
            time: "2016-08-01T12:00:00.000Z".to_string(),
            id: "abc123".to_string(),
            kind,
            service: "user.get".to_string(),
            uptime: 3,
            content: content.to_string(),
        }
    }

    #[test]
    fn record_kinds_route_to_matching_tracing_levels() {
        let writer = SharedWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();
        let recorder =
            ConsoleRecorder::new().with_template(RecordTemplate::Custom("$type>$content".into()));

        tracing::subscriber::with_default(subscriber, || {
            recorder.record(&record(RecordKind::Log, "plain"));
            recorder.record(&record(RecordKind::Info, "informational"));
            recorder.record(&record(RecordKind::Debug, "detail"));
            recorder.record(&record(RecordKind::Error, "broken"));
        });

        let out = writer.contents();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        // `log` has no dedicated tracing level; it shares info.
        assert!(lines[0].contains("INFO") && lines[0].contains("log>plain"));
        assert!(lines[1].contains("INFO") && lines[1].contains("info>informational"));
        assert!(lines[2].contains("DEBUG") && lines[2].contains("debug>detail"));
        assert!(lines[3].contains("ERROR") && lines[3].contains("error>broken"));
    }

    #[test]
    fn events_carry_the_chain_target() {
        let writer = SharedWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            ConsoleRecorder::new().record(&record(RecordKind::Info, "hello"));
        });

        assert!(writer.contents().contains("micromesh::chain"));
    }
}
