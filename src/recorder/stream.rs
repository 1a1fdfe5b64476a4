//! Stream-backed recorder: renders each record through a template and
//! appends it to any `Write` sink (log file, pipe, test buffer).

use std::io::Write;

use parking_lot::Mutex;
use tracing::debug;

use super::LogRecorder;
use crate::record::{LogRecord, RecordTemplate};

/// Writes one rendered line per record to an owned sink.
///
/// The sink sits behind a mutex so the recorder can be shared across
/// contexts running on different runtime threads; records from one
/// context therefore land in emission order.
pub struct StreamRecorder {
    sink: Mutex<Box<dyn Write + Send>>,
    template: RecordTemplate,
    newline: String,
}

impl StreamRecorder {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
            template: RecordTemplate::default(),
            newline: "\n".to_string(),
        }
    }

    pub fn with_template(mut self, template: RecordTemplate) -> Self {
        self.template = template;
        self
    }

    /// Overrides the line terminator appended after each record.
    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }
}

impl LogRecorder for StreamRecorder {
    fn record(&self, record: &LogRecord) {
        let mut line = self.template.render(record);
        line.push_str(&self.newline);
        let mut sink = self.sink.lock();
        if let Err(e) = sink.write_all(line.as_bytes()) {
            debug!(error = %e, "log sink write failed, record dropped");
        }
    }
}
