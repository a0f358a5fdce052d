use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

/// Supplemental attributes layered onto a feed event by this system's own
/// users and admins, keyed by the feed's stable event UID.
///
/// A missing row is equivalent to all-default metadata (no links, not
/// cancelled). Rows are never deleted; cancellation is a flag.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: String,
    pub chat_url: Option<String>,
    pub partiful_link: Option<String>,
    pub insta_handle: Option<String>,
    pub event_owner: Option<String>,
    /// Canonical Instagram profile URL, derived from `insta_handle`.
    pub owner_instagram: Option<String>,
    pub flyer_url: Option<String>,
    pub cancelled: bool,
    pub cancelled_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

/// Tri-state field patch: `Keep` leaves the stored value untouched, `Clear`
/// nulls it out, `Set` replaces it.
///
/// On the wire an absent field means `Keep`, an explicit `null` means `Clear`,
/// and any other value means `Set`. This makes the merge contract unambiguous
/// where a plain `Option` could not distinguish "absent" from "null".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            // `Keep` fields are skipped at the struct level; an unskipped
            // `Keep` degrades to null, which readers treat as `Clear`.
            Patch::Keep | Patch::Clear => serializer.serialize_none(),
            Patch::Set(value) => serializer.serialize_some(value),
        }
    }
}

/// Field-level upsert payload for [`EventMetadata`].
///
/// Only `Set`/`Clear` fields are written; everything else retains its prior
/// value, so independent writers (direct admin edit, edit approval,
/// cancellation) cannot clobber each other's unrelated fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub chat_url: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub partiful_link: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub insta_handle: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub event_owner: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub owner_instagram: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub flyer_url: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub cancelled: Patch<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub cancelled_at: Patch<NaiveDateTime>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.chat_url.is_keep()
            && self.partiful_link.is_keep()
            && self.insta_handle.is_keep()
            && self.event_owner.is_keep()
            && self.owner_instagram.is_keep()
            && self.flyer_url.is_keep()
            && self.cancelled.is_keep()
            && self.cancelled_at.is_keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_deserializes_absent_null_and_value_distinctly() {
        let patch: MetadataPatch =
            serde_json::from_str(r#"{"chat_url": "https://chat.example", "partiful_link": null}"#)
                .unwrap();

        assert_eq!(patch.chat_url, Patch::Set("https://chat.example".to_string()));
        assert_eq!(patch.partiful_link, Patch::Clear);
        assert_eq!(patch.insta_handle, Patch::Keep);
    }

    #[test]
    fn patch_round_trips_through_json() {
        let patch = MetadataPatch {
            chat_url: Patch::Set("https://chat.example".to_string()),
            partiful_link: Patch::Clear,
            ..Default::default()
        };

        let json = serde_json::to_string(&patch).unwrap();
        let back: MetadataPatch = serde_json::from_str(&json).unwrap();

        assert_eq!(back.chat_url, patch.chat_url);
        assert_eq!(back.partiful_link, Patch::Clear);
        // Keep fields are omitted from the JSON entirely
        assert!(!json.contains("insta_handle"));
        assert_eq!(back.insta_handle, Patch::Keep);
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(MetadataPatch::default().is_empty());
        assert!(!MetadataPatch {
            cancelled: Patch::Set(true),
            ..Default::default()
        }
        .is_empty());
    }
}
