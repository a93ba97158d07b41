use crate::config::{InputSource, STDIN_PATH};
use crate::error::Error;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

#[async_trait]
pub trait ChunkSource: Send {
    fn id(&self) -> &str;

    /// Next chunk of at most the source's read size, or `None` at end of stream.
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, Error>;
}

/// Chunk source over any async reader: a file, stdin or an in-memory buffer.
pub struct ReaderSource<R> {
    id: String,
    reader: R,
    read_size: usize,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(id: impl Into<String>, reader: R, read_size: usize) -> Self {
        Self {
            id: id.into(),
            reader,
            read_size: read_size.max(1),
        }
    }
}

impl ReaderSource<File> {
    pub async fn open(cfg: &InputSource) -> Result<Self, Error> {
        let file = File::open(&cfg.path).await?;
        Ok(Self::new(cfg.id.clone(), file, cfg.read_size))
    }
}

/// Open the source described by `cfg`, treating `-` as standard input.
pub async fn open_source(cfg: &InputSource) -> Result<Box<dyn ChunkSource>, Error> {
    if cfg.path == STDIN_PATH {
        return Ok(Box::new(ReaderSource::new(
            cfg.id.clone(),
            tokio::io::stdin(),
            cfg.read_size,
        )));
    }
    Ok(Box::new(ReaderSource::open(cfg).await?))
}

#[async_trait]
impl<R> ChunkSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        let mut buf = BytesMut::with_capacity(self.read_size);
        loop {
            let mut limited = (&mut self.reader).take(self.read_size as u64);
            match limited.read_buf(&mut buf).await {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf.freeze())),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_reader_chunks() {
        let mut src = ReaderSource::new("mem", Cursor::new(b"abcdefg".to_vec()), 3);
        assert_eq!(src.id(), "mem");

        let mut chunks = Vec::new();
        while let Some(chunk) = src.read_chunk().await.unwrap() {
            assert!(chunk.len() <= 3);
            chunks.push(chunk);
        }
        let joined: Vec<u8> = chunks.concat();
        assert_eq!(joined, b"abcdefg");
        assert!(src.read_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let cfg = InputSource {
            id: "missing".into(),
            path: "/nonexistent/bqpipe/input.bin".into(),
            read_size: 4,
        };
        assert!(matches!(open_source(&cfg).await, Err(Error::Io(_))));
    }
}
