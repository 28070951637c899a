//! # Summary
//!
//! Request/reply plumbing shared by peer-to-peer and client-to-server traffic.
//!
//! `call` performs a single round trip on a fresh connection and never
//! raises: any dial, codec, or timeout error comes back as `None`. Callers
//! cannot tell a dead server from a lost reply, and must not try to.
//! `serve` runs an accept loop, answering requests on each connection in
//! order until the remote end hangs up or the loop is shut down. A handler
//! that returns `None` hangs up without replying.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::socket;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection closed before reply")]
    Closed,
}

/// Sends `request` to `addr` and waits for the reply.
/// `timeout` bounds the whole round trip; `None` waits forever.
pub async fn call<Q, R>(addr: SocketAddr, request: &Q, timeout: Option<Duration>) -> Option<R>
where Q: serde::Serialize,
      R: serde::de::DeserializeOwned,
{
    let result = match timeout {
    | None => round_trip(addr, request).await,
    | Some(timeout) => tokio::time::timeout(timeout, round_trip(addr, request))
        .await
        .unwrap_or(Err(Error::Timeout(timeout))),
    };
    match result {
    | Ok(reply) => Some(reply),
    | Err(error) => {
        debug!("call to {} failed: {}", addr, error);
        None
    }
    }
}

async fn round_trip<Q, R>(addr: SocketAddr, request: &Q) -> Result<R, Error>
where Q: serde::Serialize,
      R: serde::de::DeserializeOwned,
{
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    let (mut rx, mut tx) = socket::split::<R, Q>(stream);
    tx.send(request).await?;
    rx.recv().await?.ok_or(Error::Closed)
}

/// Accepts connections on `listener` until `shutdown` is cancelled, answering
/// each request with `handler`. Every connection gets its own task.
pub async fn serve<Q, R, H, F>(listener: TcpListener, shutdown: CancellationToken, handler: H)
where Q: serde::de::DeserializeOwned + Send + 'static,
      R: serde::Serialize + Send + Sync + 'static,
      H: Fn(Q) -> F + Clone + Send + Sync + 'static,
      F: Future<Output = Option<R>> + Send + 'static,
{
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, addr) = match accepted {
        | Ok(accepted) => accepted,
        | Err(error) => {
            warn!("failed to accept connection: {}", error);
            continue
        }
        };
        if shutdown.is_cancelled() {
            break
        }
        trace!("accepted connection from {}", addr);
        tokio::spawn(connection(stream, shutdown.clone(), handler.clone()));
    }
    debug!("listener on {:?} shut down", listener.local_addr().ok());
}

async fn connection<Q, R, H, F>(stream: TcpStream, shutdown: CancellationToken, handler: H)
where Q: serde::de::DeserializeOwned,
      R: serde::Serialize,
      H: Fn(Q) -> F,
      F: Future<Output = Option<R>>,
{
    if let Err(error) = stream.set_nodelay(true) {
        debug!("failed to set TCP_NODELAY: {}", error);
    }
    let (mut rx, mut tx) = socket::split::<Q, R>(stream);
    loop {
        let request = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            request = rx.recv() => request,
        };
        let request = match request {
        | Ok(Some(request)) => request,
        | Ok(None) => return,
        | Err(error) => {
            debug!("dropping connection: {}", error);
            return
        }
        };
        // A dead server neither answers nor acknowledges.
        if shutdown.is_cancelled() {
            return
        }
        let reply = match handler(request).await {
        | Some(reply) if !shutdown.is_cancelled() => reply,
        | _ => return,
        };
        if let Err(error) = tx.send(&reply).await {
            debug!("failed to send reply: {}", error);
            return
        }
    }
}
