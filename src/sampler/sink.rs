use std::io::Write;
use std::ops::ControlFlow;
use std::sync::mpsc;

use tracing::warn;

use super::Sample;

/// Receiver of the sample stream.
///
/// Returning [`ControlFlow::Break`] tells the sampler nobody is listening
/// anymore, which ends the sampling loop and tears the session down.
pub trait Sink: Send + 'static {
    fn emit(&mut self, sample: Sample) -> ControlFlow<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&mut self, sample: Sample) -> ControlFlow<()> {
        (**self).emit(sample)
    }
}

impl Sink for mpsc::Sender<Sample> {
    fn emit(&mut self, sample: Sample) -> ControlFlow<()> {
        self.send(sample)
            .map_or(ControlFlow::Break(()), ControlFlow::Continue)
    }
}

impl Sink for mpsc::SyncSender<Sample> {
    fn emit(&mut self, sample: Sample) -> ControlFlow<()> {
        self.send(sample)
            .map_or(ControlFlow::Break(()), ControlFlow::Continue)
    }
}

impl Sink for futures::channel::mpsc::UnboundedSender<Sample> {
    fn emit(&mut self, sample: Sample) -> ControlFlow<()> {
        self.unbounded_send(sample)
            .map_or(ControlFlow::Break(()), ControlFlow::Continue)
    }
}

/// Sink calling a closure on every sample.
pub struct FnSink<F>(pub F);

impl<F> Sink for FnSink<F>
where
    F: FnMut(Sample) -> ControlFlow<()> + Send + 'static,
{
    fn emit(&mut self, sample: Sample) -> ControlFlow<()> {
        (self.0)(sample)
    }
}

/// Writes every sample as one line, see the [`Display`][std::fmt::Display]
/// impl of [`Sample`] for the format.
///
/// A write failure (e.g. a closed pipe) ends the stream.
pub struct LineSink<W> {
    writer: W,
}

impl<W> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + 'static> Sink for LineSink<W> {
    fn emit(&mut self, sample: Sample) -> ControlFlow<()> {
        let result = writeln!(self.writer, "{}", sample).and_then(|_| self.writer.flush());
        match result {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                warn!(error = %e, "failed to write sample");
                ControlFlow::Break(())
            }
        }
    }
}
