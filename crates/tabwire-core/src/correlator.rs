//! Request correlation over the framed channel
//!
//! One task reads inbound envelopes and drives every in-flight request
//! concurrently, so a slow command never blocks the ones behind it and
//! replies go out in completion order. Each inbound id gets exactly one
//! reply.

use futures_util::stream::FuturesUnordered;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::collections::HashMap;
use std::time::Instant;
use tabwire_protocol::{CodecError, Envelope, EnvelopeCodec, ErrorKind, Inbound, Request};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::Instrument;

use crate::commands::{CommandContext, CommandTable};
use crate::error::BridgeError;
use crate::Result;

/// Counters for one channel session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Envelopes that carried a recoverable id
    pub received: u64,
    /// Replies written
    pub replied: u64,
    /// Replies that carried an error
    pub failed: u64,
}

/// A request between dispatch and reply
struct Pending {
    id: String,
    command: String,
    received_at: Instant,
}

pub struct Correlator {
    table: CommandTable,
    context: CommandContext,
}

impl Correlator {
    pub fn new(table: CommandTable, context: CommandContext) -> Self {
        Self { table, context }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Run one request to completion and build its reply
    pub async fn handle(&self, request: Request) -> Envelope {
        let span = tracing::info_span!(
            "request",
            request_id = %request.id,
            command = %request.command
        );

        async move {
            tracing::debug!("Dispatching");
            match self
                .table
                .dispatch(&self.context, &request.command, request.args)
                .await
            {
                Ok(payload) => Envelope::success(request.id, payload),
                Err(e) => {
                    tracing::warn!(error = %e, kind = %e.kind(), "Request failed");
                    Envelope::failure(request.id, e.to_string(), e.kind())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Serve framed byte streams, e.g. stdin and stdout
    pub async fn serve_io<R, W>(
        &self,
        reader: R,
        writer: W,
        codec: EnvelopeCodec,
    ) -> Result<ChannelStats>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let inbound = FramedRead::new(reader, codec.clone());
        let outbound = FramedWrite::new(writer, codec);
        self.serve(inbound, outbound).await
    }

    /// Serve until the inbound side ends, then drain in-flight requests.
    ///
    /// A frame-level failure on the inbound side stops reading; requests
    /// already in flight are still answered before the error is returned.
    pub async fn serve<I, O>(&self, mut inbound: I, mut outbound: O) -> Result<ChannelStats>
    where
        I: Stream<Item = std::result::Result<Inbound, CodecError>> + Unpin,
        O: Sink<Envelope, Error = CodecError> + Unpin,
    {
        let mut stats = ChannelStats::default();
        let mut pending: HashMap<u64, Pending> = HashMap::new();
        let mut next_slot: u64 = 0;
        let mut in_flight = FuturesUnordered::new();
        let mut reading = true;
        let mut fatal: Option<BridgeError> = None;

        tracing::info!("Channel open");

        loop {
            tokio::select! {
                frame = inbound.next(), if reading => match frame {
                    Some(Ok(Inbound::Envelope(envelope))) => {
                        stats.received += 1;
                        let id = envelope.id.clone();

                        match envelope.into_request() {
                            Ok(request) => {
                                let slot = next_slot;
                                next_slot += 1;
                                pending.insert(slot, Pending {
                                    id: request.id.clone(),
                                    command: request.command.clone(),
                                    received_at: Instant::now(),
                                });
                                in_flight.push(async move { (slot, self.handle(request).await) });
                            }
                            Err(e) => {
                                let e = BridgeError::from(e);
                                tracing::warn!(request_id = %id, error = %e, "Rejected envelope");
                                let reply = Envelope::failure(id, e.to_string(), e.kind());
                                write_reply(&mut outbound, reply, &mut stats).await?;
                            }
                        }
                    }
                    Some(Ok(Inbound::Malformed { id: Some(id), reason })) => {
                        stats.received += 1;
                        tracing::warn!(request_id = %id, reason = %reason, "Malformed envelope");
                        let e = BridgeError::InvalidRequest(reason);
                        let reply = Envelope::failure(id, e.to_string(), e.kind());
                        write_reply(&mut outbound, reply, &mut stats).await?;
                    }
                    Some(Ok(Inbound::Malformed { id: None, reason })) => {
                        tracing::warn!(reason = %reason, "Dropping frame without id");
                    }
                    Some(Err(e)) => {
                        tracing::error!(
                            error = %e,
                            in_flight = in_flight.len(),
                            "Inbound channel failed"
                        );
                        reading = false;
                        fatal = Some(e.into());
                    }
                    None => {
                        tracing::debug!(in_flight = in_flight.len(), "Inbound channel closed");
                        reading = false;
                    }
                },
                Some((slot, reply)) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Some(done) = pending.remove(&slot) {
                        tracing::debug!(
                            request_id = %done.id,
                            command = %done.command,
                            elapsed_ms = done.received_at.elapsed().as_millis() as u64,
                            error = reply.is_error(),
                            "Replying"
                        );
                    }
                    write_reply(&mut outbound, reply, &mut stats).await?;
                }
                else => break,
            }
        }

        outbound.flush().await?;
        tracing::info!(
            received = stats.received,
            replied = stats.replied,
            failed = stats.failed,
            "Channel closed"
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}

/// Write one reply. A reply too large for a frame is replaced by an error
/// reply for the same id.
async fn write_reply<O>(
    outbound: &mut O,
    reply: Envelope,
    stats: &mut ChannelStats,
) -> Result<()>
where
    O: Sink<Envelope, Error = CodecError> + Unpin,
{
    let id = reply.id.clone();
    let mut failed = reply.is_error();

    match outbound.send(reply).await {
        Ok(()) => {}
        Err(CodecError::MessageTooLarge { size, max }) => {
            tracing::warn!(request_id = %id, size = size, max = max, "Reply exceeds frame limit");
            let message = format!("Reply too large: {size} bytes (max {max})");
            outbound
                .send(Envelope::failure(id, message, ErrorKind::Internal))
                .await?;
            failed = true;
        }
        Err(e) => return Err(e.into()),
    }

    stats.replied += 1;
    if failed {
        stats.failed += 1;
    }
    Ok(())
}
