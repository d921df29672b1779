//! Opaque state blob codec.
//!
//! A unit's full state is a property-list dictionary; the blob stored on a
//! [`PluginReference`](crate::PluginReference) is its bincode encoding.

use super::native::StateDictionary;
use crate::error::HostError;

pub fn encode_state(state: &StateDictionary) -> Result<Vec<u8>, HostError> {
    Ok(bincode::serialize(state)?)
}

pub fn decode_state(blob: &[u8]) -> Result<StateDictionary, HostError> {
    Ok(bincode::deserialize(blob)?)
}
