//! Translation of node "not found" answers
//!
//! Query functions of the built-in contracts report a missing record with a plain
//! error string instead of an empty result. Those strings are matched here and
//! nowhere else.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use strum::Display;

use crate::{error::AideError, transport::TransportError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RecordKind {
    Candidate,
    Delegation,
    DelegationList,
    DelegateReward,
    Proposal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeMessage {
    NotFound(RecordKind),
    Unclassified(String),
}

const SENTINELS: [(&str, RecordKind); 5] = [
    (
        "Query candidate info failed:Candidate info is not found",
        RecordKind::Candidate,
    ),
    (
        "Query delegate info failed:Delegate info is not found",
        RecordKind::Delegation,
    ),
    // Spelling as sent by the node
    (
        "Retreiving delegation related mapping failed:RelatedList info is not found",
        RecordKind::DelegationList,
    ),
    (
        "Delegation info not found",
        RecordKind::DelegateReward,
    ),
    ("Proposal not found", RecordKind::Proposal),
];

/// Map a node message to a known "not found" answer, ignoring ASCII case
pub fn classify(message: &str) -> NodeMessage {
    let message = message.trim();
    let lowered = message.to_ascii_lowercase();
    SENTINELS
        .iter()
        .find(|(sentinel, _)| lowered.contains(&sentinel.to_ascii_lowercase()))
        .map(|(_, kind)| NodeMessage::NotFound(*kind))
        .unwrap_or_else(|| NodeMessage::Unclassified(message.to_string()))
}

/// Decode the result of a node query
///
/// `null`, an empty string and known sentinels are `Ok(None)`. Any other string is
/// surfaced as [`AideError::UnclassifiedNodeMessage`] instead of being read as missing.
pub fn lookup<T: DeserializeOwned>(method: &str, value: Value) -> Result<Option<T>, AideError> {
    match value {
        Value::Null => Ok(None),
        Value::String(message) if message.trim().is_empty() => Ok(None),
        Value::String(message) => match classify(&message) {
            NodeMessage::NotFound(kind) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("{} answered: no {} record", method, kind);
                }
                Ok(None)
            }
            NodeMessage::Unclassified(message) => Err(AideError::UnclassifiedNodeMessage(message)),
        },
        value => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| TransportError::invalid_response(method, e.to_string()).into()),
    }
}

/// Envelope of every built-in contract query answer
#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(rename = "Code")]
    code: i64,
    #[serde(rename = "Ret", default)]
    ret: Value,
}

/// Decode the raw output of a built-in contract query
///
/// Failed queries carry the node message in `Ret` and go through [`lookup`] like
/// successful ones, a structured failure payload is a contract logic error.
pub fn query_result<T: DeserializeOwned>(
    method: &str,
    output: &[u8],
) -> Result<Option<T>, AideError> {
    let result: QueryResult = serde_json::from_slice(output)
        .map_err(|e| TransportError::invalid_response(method, e.to_string()))?;

    match result {
        QueryResult { code: 0, ret } => lookup(method, ret),
        QueryResult {
            ret: ret @ (Value::String(_) | Value::Null),
            ..
        } => lookup(method, ret),
        QueryResult { code, ret } => Err(AideError::ContractLogic {
            code,
            message: ret.to_string(),
        }),
    }
}
