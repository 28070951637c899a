//! # Summary
//!
//! This module abstracts over TCP connections between peers, and between
//! clients and servers.
//!
//! Wraps `tokio-util`'s length-delimited codec around each half of a
//! `tokio` TCP stream, and encodes every frame with `bincode`. This lets
//! us send and receive Rust structs over a connection with minimal
//! boilerplate on either end.

use std::marker::PhantomData;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::rpc::Error;

/// Receiving half. Expects length-delimited, bincode-encoded values of type `T`.
pub struct Rx<T> {
    inner: FramedRead<OwnedReadHalf, LengthDelimitedCodec>,
    _marker: PhantomData<fn() -> T>,
}

/// Transmitting half. Sends length-delimited, bincode-encoded values of type `T`.
pub struct Tx<T> {
    inner: FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>,
    _marker: PhantomData<fn(T)>,
}

/// Split a TCP stream into a pair of typed receiving and transmitting halves.
pub fn split<R, T>(stream: TcpStream) -> (Rx<R>, Tx<T>)
where R: serde::de::DeserializeOwned,
      T: serde::Serialize,
{
    let (rx, tx) = stream.into_split();
    let rx = Rx {
        inner: FramedRead::new(rx, LengthDelimitedCodec::new()),
        _marker: PhantomData,
    };
    let tx = Tx {
        inner: FramedWrite::new(tx, LengthDelimitedCodec::new()),
        _marker: PhantomData,
    };
    (rx, tx)
}

impl<R: serde::de::DeserializeOwned> Rx<R> {
    /// Next value from the connection, or `Ok(None)` once the remote end closes.
    pub async fn recv(&mut self) -> Result<Option<R>, Error> {
        match self.inner.next().await {
        | None => Ok(None),
        | Some(frame) => Ok(Some(bincode::deserialize(&frame?)?)),
        }
    }
}

impl<T: serde::Serialize> Tx<T> {
    /// Encode `message` and flush it to the connection.
    pub async fn send(&mut self, message: &T) -> Result<(), Error> {
        let frame = bincode::serialize(message)?;
        self.inner.send(Bytes::from(frame)).await?;
        Ok(())
    }
}
