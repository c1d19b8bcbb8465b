//! Per-conversation watermarks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::ConversationId;
use crate::marker::Marker;

/// Map from conversation to the marker of the last processed message.
///
/// Serialized as `{"last_checked": {"D06...": "1712345678.123456"}}`. Keys are
/// kept sorted so the persisted file diffs cleanly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkMap {
    #[serde(default, deserialize_with = "null_as_empty")]
    last_checked: BTreeMap<ConversationId, Marker>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<ConversationId, Marker>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl WatermarkMap {
    /// Empty map, as on a first-ever run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current marker for a conversation.
    pub fn get(&self, id: &ConversationId) -> Option<&Marker> {
        self.last_checked.get(id)
    }

    /// Whether the conversation has ever been observed.
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.last_checked.contains_key(id)
    }

    /// Move the marker for `id` forward to `marker`.
    ///
    /// Never moves a marker backwards. Returns `true` if the stored value
    /// changed.
    pub fn advance(&mut self, id: &ConversationId, marker: Marker) -> bool {
        match self.last_checked.get_mut(id) {
            Some(current) if *current >= marker => false,
            Some(current) => {
                *current = marker;
                true
            }
            None => {
                let _ = self.last_checked.insert(id.clone(), marker);
                true
            }
        }
    }

    /// Number of tracked conversations.
    pub fn len(&self) -> usize {
        self.last_checked.len()
    }

    /// Whether no conversation is tracked.
    pub fn is_empty(&self) -> bool {
        self.last_checked.is_empty()
    }

    /// Iterate tracked conversations in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ConversationId, &Marker)> {
        self.last_checked.iter()
    }
}

impl FromIterator<(ConversationId, Marker)> for WatermarkMap {
    fn from_iter<T: IntoIterator<Item = (ConversationId, Marker)>>(iter: T) -> Self {
        Self {
            last_checked: iter.into_iter().collect(),
        }
    }
}
