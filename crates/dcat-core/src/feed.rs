//! Incremental assembly of a feed document from a record stream.

use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::stream::{FusedStream, Stream, StreamExt};
use tracing::{error, info};

use crate::error::DcatError;

/// Wraps a stream of records into a stream of feed document chunks.
///
/// The first record is emitted with the header in front of it, later records
/// with the delimiter in front, and the stream closes with the footer. An
/// empty source yields `header + footer` as its only chunk. Only the current
/// record is held, and the next one is pulled only when the consumer polls.
///
/// The first error, from the source or from `format_chunk`, is yielded and
/// ends the stream.
///
/// # Examples
///
/// ```
/// use dcat_core::feed::FeedFormatterStream;
/// use futures::{executor::block_on, stream, TryStreamExt};
///
/// let records = stream::iter(vec![Ok::<_, std::io::Error>("foo"), Ok("bar")]);
/// let feed = FeedFormatterStream::new(records, "[", "]", ",", |r: &str| Ok(format!("\"{}\"", r)));
///
/// let chunks: Vec<String> = block_on(feed.try_collect()).unwrap();
/// assert_eq!(chunks.concat(), r#"["foo","bar"]"#);
/// ```
pub struct FeedFormatterStream<S, F> {
    records: S,
    format_chunk: F,
    header: String,
    footer: String,
    delimiter: String,
    header_added: bool,
    finished: bool,
    count: usize,
}

impl<S, F> FeedFormatterStream<S, F> {
    pub fn new(
        records: S,
        header: impl Into<String>,
        footer: impl Into<String>,
        delimiter: impl Into<String>,
        format_chunk: F,
    ) -> Self {
        Self {
            records,
            format_chunk,
            header: header.into(),
            footer: footer.into(),
            delimiter: delimiter.into(),
            header_added: false,
            finished: false,
            count: 0,
        }
    }

    /// Number of records emitted so far.
    pub fn records_emitted(&self) -> usize {
        self.count
    }

    fn fail(&mut self, err: DcatError) -> Poll<Option<Result<String, DcatError>>> {
        self.finished = true;
        error!(records = self.count, error = %err, "Feed terminated");
        Poll::Ready(Some(Err(err)))
    }

    fn close(&mut self) -> String {
        self.finished = true;
        info!(records = self.count, "Feed complete");
        if self.header_added {
            self.footer.clone()
        } else {
            format!("{}{}", self.header, self.footer)
        }
    }
}

impl<S, T, E, F> Stream for FeedFormatterStream<S, F>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: fmt::Display,
    F: FnMut(T) -> Result<String, DcatError> + Unpin,
{
    type Item = Result<String, DcatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(this.records.poll_next_unpin(cx)) {
            Some(Ok(record)) => match (this.format_chunk)(record) {
                Ok(entry) => {
                    let lead = if this.header_added {
                        &this.delimiter
                    } else {
                        this.header_added = true;
                        &this.header
                    };
                    let chunk = format!("{}{}", lead, entry);
                    this.count += 1;
                    Poll::Ready(Some(Ok(chunk)))
                }
                Err(err) => this.fail(err),
            },
            Some(Err(err)) => this.fail(DcatError::StreamTransport(err.to_string())),
            None => Poll::Ready(Some(Ok(this.close()))),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let (lower, upper) = self.records.size_hint();
        (lower.saturating_add(1), upper.and_then(|u| u.checked_add(1)))
    }
}

impl<S, T, E, F> FusedStream for FeedFormatterStream<S, F>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: fmt::Display,
    F: FnMut(T) -> Result<String, DcatError> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<S, F> fmt::Debug for FeedFormatterStream<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedFormatterStream")
            .field("header_added", &self.header_added)
            .field("finished", &self.finished)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}
