use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::errors::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Tasks,
    Groups,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change notification exactly as the push channel delivers it: a kind tag
/// plus an untyped payload. Insert/update carry a full record, delete an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChange {
    pub table: Table,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

/// A validated change event, safe for the sync engine to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<R> {
    Insert(R),
    Update(R),
    Delete(Uuid),
}

impl RawChange {
    /// Validate the untyped payload into a typed event. Malformed payloads are
    /// rejected here so nothing dynamic reaches the engine.
    pub fn decode<R: DeserializeOwned>(self) -> Result<ChangeEvent<R>, SyncError> {
        let RawChange { kind, record, id, .. } = self;
        match kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let value = record.ok_or_else(|| {
                    SyncError::MalformedEvent(format!("{kind} event without a record"))
                })?;
                let record: R = serde_json::from_value(value)
                    .map_err(|e| SyncError::MalformedEvent(e.to_string()))?;
                Ok(match kind {
                    ChangeKind::Insert => ChangeEvent::Insert(record),
                    _ => ChangeEvent::Update(record),
                })
            }
            ChangeKind::Delete => {
                let id = id
                    .ok_or_else(|| SyncError::MalformedEvent("delete event without an id".into()))?;
                Ok(ChangeEvent::Delete(id))
            }
        }
    }
}

/// Lifecycle of one in-flight mutation. `Pending` resolves to `Committed` on
/// remote success or `RolledBack` on remote failure; a rolled-back mutation is
/// terminal and a fresh user action starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}
