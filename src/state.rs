/// Instance sequence number. `-1` stands for "no instance".
pub type Seq = i64;

/// Proposal number. `-1` stands for "no proposal".
pub type Ballot = i64;

/// Value that peers can agree on
pub trait Value: Clone
    + Eq
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> Value for T where T: Clone
    + Eq
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
}
