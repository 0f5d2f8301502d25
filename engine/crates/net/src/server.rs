use std::time::Duration;

use session::ConnectionKey;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use crate::channels::{NetEvent, NetTx, WriteRx};
use crate::connection_set::NetSettings;
use crate::framing::LineBuffer;
use crate::rate_limiter::{AdmissionPermit, ConnectionLimiter, SharedLimiter};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Accept connections forever, spawning one reader and one writer task per socket.
pub(crate) async fn run_acceptor(
    listener: TcpListener,
    events: NetTx,
    limiter: SharedLimiter,
    settings: NetSettings,
) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let permit = match ConnectionLimiter::admit(&limiter, peer_addr.ip()) {
            Ok(permit) => permit,
            Err(rejection) => {
                tracing::warn!(%peer_addr, %rejection, "connection rejected");
                continue;
            }
        };

        let key = ConnectionKey(peer_addr);
        tracing::debug!(%key, "socket accepted");

        let events = events.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            handle_connection(stream, key, events, permit, settings).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    key: ConnectionKey,
    events: NetTx,
    _permit: AdmissionPermit,
    settings: NetSettings,
) {
    let _ = stream.set_nodelay(true);
    let (mut reader, mut writer) = stream.into_split();

    let (write_tx, mut write_rx): (_, WriteRx) = mpsc::channel(settings.write_queue.max(1));
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    // Accepted must reach the set before any payload from this socket.
    if events
        .send(NetEvent::Accepted {
            key,
            write_tx,
            stop_tx,
        })
        .is_err()
    {
        return;
    }

    // Writer task: runs until the connection set drops the write queue.
    let writer_handle = tokio::spawn(async move {
        while let Some(mut text) = write_rx.recv().await {
            text.push('\n');
            if writer.write_all(text.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let mut line_buffer = LineBuffer::new(settings.max_line_length);
    let mut buf = [0u8; 4096];

    loop {
        let keep_reading = tokio::select! {
            _ = &mut stop_rx => false,
            read = reader.read(&mut buf) => match read {
                Ok(0) => false,
                Ok(n) => line_buffer
                    .feed(&buf[..n])
                    .into_iter()
                    .all(|line| events.send(NetEvent::Payload { key, line }).is_ok()),
                Err(e) => {
                    tracing::debug!(%key, error = %e, "read error");
                    false
                }
            },
        };
        if !keep_reading {
            break;
        }
    }

    let _ = events.send(NetEvent::Closed { key });
    let _ = writer_handle.await;
    tracing::debug!(%key, "connection tasks finished");
}
