//! One MessagePack-RPC conversation with a connected peer.

use std::sync::Arc;

use futures::{SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use pluginserver_core::{AppError, AppResult, DynamicValue};

use crate::codec::{CodecError, MsgpackCodec};
use crate::dispatcher::RpcDispatcher;
use crate::handshake::handshake_frame;
use crate::message::{self, RpcMessage};

/// Responses queued for the writer half.
const REPLY_BUFFER: usize = 64;

/// A framed connection plus the dispatcher it calls into.
///
/// Each call runs on its own task and its reply is written as soon as it is
/// ready, so replies may arrive out of order and are matched by `msgid`. A
/// frame that cannot be decoded, or does not form a valid envelope, ends the
/// session once in-flight calls have been answered.
pub struct Session<S> {
    id: u64,
    framed: Framed<S, MsgpackCodec>,
    dispatcher: Arc<RpcDispatcher>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: u64, stream: S, dispatcher: Arc<RpcDispatcher>) -> Self {
        Self {
            id,
            framed: Framed::new(stream, MsgpackCodec::new()),
            dispatcher,
        }
    }

    /// Session identifier used in logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Writes the `serverPid` greeting.
    pub async fn greet(&mut self, pid: u32) -> AppResult<()> {
        self.framed.send(handshake_frame(pid)).await?;
        Ok(())
    }

    /// Serves calls until the peer hangs up.
    pub async fn run(self) -> AppResult<()> {
        let Self {
            id,
            framed,
            dispatcher,
        } = self;
        let (mut sink, stream) = framed.split();
        let (replies, mut outbox) = mpsc::channel::<rmpv::Value>(REPLY_BUFFER);

        let reader = read_calls(id, stream, dispatcher, replies);

        let writer = async move {
            while let Some(reply) = outbox.recv().await {
                sink.send(reply).await?;
            }
            Ok::<(), AppError>(())
        };

        let (read, write) = tokio::join!(reader, writer);
        read?;
        write
    }
}

/// Reads frames and spawns one task per call until the peer hangs up.
async fn read_calls<St>(
    session: u64,
    mut frames: St,
    dispatcher: Arc<RpcDispatcher>,
    replies: mpsc::Sender<rmpv::Value>,
) -> AppResult<()>
where
    St: Stream<Item = Result<rmpv::Value, CodecError>> + Unpin,
{
    while let Some(frame) = frames.next().await {
        match RpcMessage::from_value(frame?)? {
            RpcMessage::Request {
                msgid,
                method,
                params,
            } => {
                tracing::debug!(session, msgid, method = %method, "RPC call");
                tokio::spawn(answer(
                    session,
                    Arc::clone(&dispatcher),
                    replies.clone(),
                    msgid,
                    method,
                    params,
                ));
            }
            RpcMessage::Notification { method, .. } => {
                tracing::debug!(session, method = %method, "Ignoring notification");
            }
        }
    }

    tracing::debug!(session, "Peer closed connection");
    Ok(())
}

/// Runs one call and queues its response.
async fn answer(
    session: u64,
    dispatcher: Arc<RpcDispatcher>,
    replies: mpsc::Sender<rmpv::Value>,
    msgid: u32,
    method: String,
    params: Vec<DynamicValue>,
) {
    let outcome = dispatcher.dispatch(&method, params).await;
    if let Err(e) = &outcome {
        if e.is_call_level() {
            tracing::warn!(session, method = %method, error = %e, "RPC call failed");
        } else {
            tracing::error!(session, method = %method, error = %e, "RPC call failed");
        }
    }

    if replies.send(message::response(msgid, outcome)).await.is_err() {
        tracing::debug!(session, msgid, "Dropping reply for closed session");
    }
}
