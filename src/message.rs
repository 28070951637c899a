use serde_derive::{Deserialize, Serialize};

use crate::state::{Ballot, Seq, Value};

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PrepareArgs {
    pub seq: Seq,
    pub ballot: Ballot,
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrepareStatus<V: Value> {
    /// Promise made. Carries the highest accepted proposal and its value, if any.
    Ok(Option<(Ballot, V)>),

    /// An equal or higher prepare has already been seen.
    Reject,

    /// Instance is already settled with this value.
    Decided(V),
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareReply<V: Value> {
    pub status: PrepareStatus<V>,

    /// Replier's own done value
    pub done: Seq,
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptArgs<V: Value> {
    pub seq: Seq,
    pub ballot: Ballot,
    pub value: V,
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptStatus<V: Value> {
    /// Accepted the given proposal number.
    Ok(Ballot),

    /// A higher prepare has already been seen.
    Reject,

    /// Instance is already settled with this value.
    Decided(V),
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptReply<V: Value> {
    pub status: AcceptStatus<V>,

    /// Replier's own done value
    pub done: Seq,
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecidedArgs<V: Value> {
    pub seq: Seq,
    pub value: V,
}

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecidedReply {
    /// Replier's own done value
    pub done: Seq,
}

/// Peer-to-peer requests.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request<V: Value> {
    Prepare(PrepareArgs),
    Accept(AcceptArgs<V>),
    Decided(DecidedArgs<V>),
}

/// Peer-to-peer replies, one variant per request kind.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply<V: Value> {
    Prepare(PrepareReply<V>),
    Accept(AcceptReply<V>),
    Decided(DecidedReply),
}

impl<V: Value> Reply<V> {
    /// Done value piggybacked on every reply.
    pub fn done(&self) -> Seq {
        match self {
        | Reply::Prepare(reply) => reply.done,
        | Reply::Accept(reply) => reply.done,
        | Reply::Decided(reply) => reply.done,
        }
    }
}
