//! Lazy NDJSON record source.

use std::path::Path;
use std::pin::Pin;

use dcat_core::{DatasetRecord, DcatError};
use futures::stream::{self, Stream};
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};

/// A pinned record stream, as consumed by the feed.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<DatasetRecord, DcatError>> + Send>>;

/// Opens `path` as a record stream. `-` reads stdin.
pub async fn open_records(path: &Path) -> Result<RecordStream, DcatError> {
    if path == Path::new("-") {
        return Ok(ndjson_records(BufReader::new(io::stdin())));
    }
    let file = File::open(path).await.map_err(|e| {
        DcatError::Config(format!("cannot open records file {}: {}", path.display(), e))
    })?;
    Ok(ndjson_records(BufReader::new(file)))
}

/// Reads one JSON record per line, skipping blank lines. A line is read only
/// when the stream is polled.
pub fn ndjson_records<R>(reader: R) -> RecordStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let lines = reader.lines();
    Box::pin(stream::unfold((lines, 0usize), |(mut lines, mut line_no)| async move {
        loop {
            line_no += 1;
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some((Err(DcatError::Io(e)), (lines, line_no))),
            };
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .map(DatasetRecord::new)
                .map_err(|e| DcatError::InvalidRecord(format!("line {}: {}", line_no, e)));
            return Some((record, (lines, line_no)));
        }
    }))
}
