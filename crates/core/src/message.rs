use std::{fmt, str::FromStr};

use blake3::Hasher;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{value::RawValue, Value};
use thiserror::Error;
use tracing::trace;

use crate::payload::{BaseData, Payload};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("message carries no data")]
    MissingData,
    #[error("message data is not a JSON object")]
    NotAnObject,
    #[error("unknown message type {0}")]
    UnknownType(u32),
    #[error("message type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: MessageType,
        actual: MessageType,
    },
    #[error("unexpected field '{0}' in message data")]
    UnexpectedField(String),
}

/// Discriminant carried in the `type` field of every envelope.
///
/// The integer values are the wire representation. New types are appended;
/// existing values never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
pub enum MessageType {
    VaultLaunch = 0,
    VaultInvest = 1,
    VaultWithdraw = 2,
    VaultDividend = 3,
    VaultClaim = 4,
    VaultRedeem = 5,
    VaultUnLockTransfer = 6,
    TokenTransfer = 7,
}

impl MessageType {
    pub const ALL: [MessageType; 8] = [
        MessageType::VaultLaunch,
        MessageType::VaultInvest,
        MessageType::VaultWithdraw,
        MessageType::VaultDividend,
        MessageType::VaultClaim,
        MessageType::VaultRedeem,
        MessageType::VaultUnLockTransfer,
        MessageType::TokenTransfer,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::VaultLaunch => "vault_launch",
            MessageType::VaultInvest => "vault_invest",
            MessageType::VaultWithdraw => "vault_withdraw",
            MessageType::VaultDividend => "vault_dividend",
            MessageType::VaultClaim => "vault_claim",
            MessageType::VaultRedeem => "vault_redeem",
            MessageType::VaultUnLockTransfer => "vault_unlock_transfer",
            MessageType::TokenTransfer => "token_transfer",
        }
    }
}

impl From<MessageType> for u32 {
    fn from(kind: MessageType) -> Self {
        kind.as_u32()
    }
}

impl TryFrom<u32> for MessageType {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::VaultLaunch),
            1 => Ok(MessageType::VaultInvest),
            2 => Ok(MessageType::VaultWithdraw),
            3 => Ok(MessageType::VaultDividend),
            4 => Ok(MessageType::VaultClaim),
            5 => Ok(MessageType::VaultRedeem),
            6 => Ok(MessageType::VaultUnLockTransfer),
            7 => Ok(MessageType::TokenTransfer),
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    /// Accepts `vault_invest`, `vault-invest` or `VaultInvest`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        MessageType::ALL
            .into_iter()
            .find(|kind| normalize_name(kind.as_str()) == wanted)
            .ok_or_else(|| format!("unsupported message type '{s}'"))
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Envelope pairing a type discriminant with a still-encoded payload.
///
/// `data` is kept as raw JSON so a consumer can look at `type` before
/// deciding how (or whether) to parse the payload, and so the original bytes
/// can be forwarded untouched. The raw `type` integer is preserved even when
/// it is not a known [`MessageType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: u32,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

impl Message {
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind: kind.as_u32(),
            data: None,
        }
    }

    /// Builds an envelope typed after `P` with the payload already encoded.
    pub fn from_payload<P: Payload>(payload: &P) -> Result<Self, EncodeError> {
        let mut message = Message::new(P::TYPE);
        message.encode(payload)?;
        Ok(message)
    }

    /// Builds an envelope around pre-encoded JSON, rejecting invalid JSON.
    pub fn with_raw_data(kind: MessageType, data: impl Into<String>) -> Result<Self, DecodeError> {
        let raw = RawValue::from_string(data.into())?;
        Ok(Self {
            kind: kind.as_u32(),
            data: Some(raw),
        })
    }

    /// Raw wire value of the `type` field.
    pub fn kind(&self) -> u32 {
        self.kind
    }

    pub fn message_type(&self) -> Result<MessageType, DecodeError> {
        MessageType::try_from(self.kind)
    }

    pub fn data(&self) -> Option<&RawValue> {
        self.data.as_deref()
    }

    /// Serializes `value` into the payload, replacing whatever was there.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let raw = serde_json::value::to_raw_value(value)?;
        trace!(kind = self.kind, bytes = raw.get().len(), "encoded message data");
        self.data = Some(raw);
        Ok(())
    }

    /// Decodes the payload into `P`.
    ///
    /// Fails unless the envelope type is `P::TYPE` and the data object holds
    /// exactly the fields `P` understands.
    pub fn decode<P: Payload>(&self) -> Result<P, DecodeError> {
        let actual = self.message_type()?;
        if actual != P::TYPE {
            return Err(DecodeError::TypeMismatch {
                expected: P::TYPE,
                actual,
            });
        }

        let value: Value = serde_json::from_str(self.raw_data()?.get())?;
        let Value::Object(object) = &value else {
            return Err(DecodeError::NotAnObject);
        };
        if let Some(field) = object.keys().find(|key| {
            !BaseData::FIELDS.contains(&key.as_str()) && !P::FIELDS.contains(&key.as_str())
        }) {
            return Err(DecodeError::UnexpectedField(field.clone()));
        }

        let payload = serde_json::from_value(value)?;
        trace!(kind = %actual, "decoded message data");
        Ok(payload)
    }

    /// Decodes the payload into any deserializable shape without checking
    /// the envelope type or rejecting extra fields.
    pub fn decode_as<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        Ok(serde_json::from_str(self.raw_data()?.get())?)
    }

    /// Digest over the type and the raw payload bytes.
    pub fn digest(&self) -> Vec<u8> {
        let mut hasher = Hasher::new();
        hasher.update(&self.kind.to_be_bytes());
        if let Some(data) = &self.data {
            hasher.update(data.get().as_bytes());
        }
        hasher.finalize().as_bytes().to_vec()
    }

    /// Base58 form of [`Message::digest`], identical for redeliveries of the
    /// same envelope.
    pub fn content_id(&self) -> String {
        bs58::encode(self.digest()).into_string()
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn to_json_string(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn raw_data(&self) -> Result<&RawValue, DecodeError> {
        self.data.as_deref().ok_or(DecodeError::MissingData)
    }
}

impl FromStr for Message {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}
