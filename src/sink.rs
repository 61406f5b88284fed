/// Destinations for forwarded text.
///
/// A sink accepts one chunk at a time. Sinks never report failure to the
/// caller; a sink that cannot deliver logs the problem itself.
use std::io::Write;

pub trait Sink {
    /// Deliver one chunk to the destination.
    fn accept(&mut self, chunk: &str);
}

/// Writes chunks verbatim to any `Write` (stdout in the CLI) and flushes
/// after each one so output appears as soon as it is forwarded.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn accept(&mut self, chunk: &str) {
        if let Err(e) = self
            .writer
            .write_all(chunk.as_bytes())
            .and_then(|()| self.writer.flush())
        {
            tracing::warn!(error = %e, bytes = chunk.len(), "sink write failed, chunk dropped");
        }
    }
}

/// Emits each chunk as a `tracing` event under the `tailforward::forwarded`
/// target, so a subscriber decides where forwarded text ends up.
#[derive(Debug, Default)]
pub struct TraceSink;

impl Sink for TraceSink {
    fn accept(&mut self, chunk: &str) {
        tracing::info!(target: "tailforward::forwarded", "{}", chunk.trim_end_matches('\n'));
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn accept(&mut self, chunk: &str) {
        (**self).accept(chunk)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_sink_writes_chunks_in_order() {
        let mut sink = WriterSink::new(Vec::new());
        sink.accept("first\n");
        sink.accept("second\n");
        let written = sink.into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_writer_sink_swallows_write_errors() {
        let mut sink = WriterSink::new(BrokenWriter);
        // Must not panic or propagate
        sink.accept("lost\n");
    }

    #[test]
    fn test_boxed_sink_delegates() {
        fn deliver<S: Sink>(sink: &mut S) {
            sink.accept("y");
            sink.accept("z");
        }

        let mut boxed: Box<dyn Sink> = Box::new(WriterSink::new(Vec::new()));
        deliver(&mut boxed);

        let mut recorder = Box::new(testing::RecordingSink::default());
        deliver(&mut recorder);
        assert_eq!(recorder.chunks, vec!["y", "z"]);
    }

    #[test]
    fn test_trace_sink_accepts_without_subscriber() {
        let mut sink = TraceSink;
        sink.accept("line\n");
    }
}
