use crate::config::{OutputFormat, PipeConfig};
use crate::error::Error;
use crate::shared::SharedByteQueue;
use crate::sources::{open_source, ChunkSource};
use log::{debug, info, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Feeds every source, in order, into a queue.
pub struct Pump {
    sources: Vec<Box<dyn ChunkSource>>,
}

impl Pump {
    pub async fn from_config(cfg: &PipeConfig) -> Result<Self, Error> {
        let mut sources = Vec::with_capacity(cfg.sources.len());
        for src in &cfg.sources {
            sources.push(open_source(src).await?);
        }
        Ok(Self::new(sources))
    }

    pub fn new(sources: Vec<Box<dyn ChunkSource>>) -> Self {
        Self { sources }
    }

    /// Push every chunk of every source, then close the queue.
    ///
    /// The queue is closed on failure as well, so readers never wait forever.
    /// Returns the number of bytes pushed.
    pub async fn run(mut self, queue: SharedByteQueue) -> Result<u64, Error> {
        let mut total = 0u64;
        let result = self.feed(&queue, &mut total).await;
        queue.close();
        info!("Pushed {} bytes from {} sources", total, self.sources.len());
        result.map(|()| total)
    }

    async fn feed(&mut self, queue: &SharedByteQueue, total: &mut u64) -> Result<(), Error> {
        for src in self.sources.iter_mut() {
            let mut from_source = 0u64;
            while let Some(chunk) = src.read_chunk().await? {
                from_source += chunk.len() as u64;
                queue.push(chunk);
            }
            debug!("Source '{}' finished after {} bytes", src.id(), from_source);
            *total += from_source;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    pub records: u64,
    pub bytes: u64,
    pub partial: bool,
}

/// Reads fixed-size records from a queue and writes them out.
#[derive(Debug, Clone)]
pub struct RecordSink {
    record_size: usize,
    format: OutputFormat,
    emit_partial: bool,
}

impl RecordSink {
    pub fn new(record_size: usize, format: OutputFormat, emit_partial: bool) -> Self {
        Self {
            record_size: record_size.max(1),
            format,
            emit_partial,
        }
    }

    pub fn from_config(cfg: &PipeConfig) -> Self {
        Self::new(cfg.record_size, cfg.format, cfg.emit_partial)
    }

    /// Take records until the queue is closed, then flush out what is left.
    pub async fn run<W>(&self, queue: SharedByteQueue, out: &mut W) -> Result<SinkStats, Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut stats = SinkStats::default();
        loop {
            match queue.take(self.record_size).await {
                Ok(record) => {
                    self.write_record(out, &record).await?;
                    stats.records += 1;
                    stats.bytes += record.len() as u64;
                }
                Err(Error::Closed) => break,
                Err(e) => return Err(e),
            }
        }

        let rest = queue.drain();
        if !rest.is_empty() {
            if self.emit_partial {
                self.write_record(out, &rest).await?;
                stats.bytes += rest.len() as u64;
                stats.partial = true;
            } else {
                warn!("Discarding {} trailing bytes short of a full record", rest.len());
            }
        }
        out.flush().await?;
        Ok(stats)
    }

    async fn write_record<W>(&self, out: &mut W, record: &[u8]) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin,
    {
        match self.format {
            OutputFormat::Hex => {
                let mut line: String = record.iter().map(|b| format!("{:02x}", b)).collect();
                line.push('\n');
                out.write_all(line.as_bytes()).await?;
            }
            OutputFormat::Raw => out.write_all(record).await?,
        }
        Ok(())
    }
}
