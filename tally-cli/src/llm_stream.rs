use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Response;
use tokio::sync::mpsc::UnboundedSender;

use tally_core::{Event, SubmissionId};

/// Forward every body chunk as `Event::Chunk`, then `Event::StreamEnded`.
///
/// Chunks are raw bytes; frame splitting happens in the session's decoder.
pub async fn pump(resp: Response, id: SubmissionId, tx: &UnboundedSender<Event>) -> Result<()> {
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk.context("read chat stream")?;
        if tx
            .send(Event::Chunk {
                id,
                bytes: bytes.to_vec(),
            })
            .is_err()
        {
            // Receiver gone: the session was dropped
            return Ok(());
        }
    }
    let _ = tx.send(Event::StreamEnded { id });
    Ok(())
}
