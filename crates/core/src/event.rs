use serde::Serialize;
use tracing::{debug, trace};

use crate::message::{DecodeError, EncodeError, Message, MessageType};
use crate::payload::{
    BaseData, Payload, TokenTransfer, VaultClaim, VaultDividend, VaultInvest, VaultLaunch,
    VaultRedeem, VaultUnLockTransfer, VaultWithdraw,
};

/// Every known payload, tagged by its message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Event {
    VaultLaunch(VaultLaunch),
    VaultInvest(VaultInvest),
    VaultWithdraw(VaultWithdraw),
    VaultDividend(VaultDividend),
    VaultClaim(VaultClaim),
    VaultRedeem(VaultRedeem),
    VaultUnLockTransfer(VaultUnLockTransfer),
    TokenTransfer(TokenTransfer),
}

impl Event {
    pub fn message_type(&self) -> MessageType {
        match self {
            Event::VaultLaunch(_) => MessageType::VaultLaunch,
            Event::VaultInvest(_) => MessageType::VaultInvest,
            Event::VaultWithdraw(_) => MessageType::VaultWithdraw,
            Event::VaultDividend(_) => MessageType::VaultDividend,
            Event::VaultClaim(_) => MessageType::VaultClaim,
            Event::VaultRedeem(_) => MessageType::VaultRedeem,
            Event::VaultUnLockTransfer(_) => MessageType::VaultUnLockTransfer,
            Event::TokenTransfer(_) => MessageType::TokenTransfer,
        }
    }

    pub fn base(&self) -> &BaseData {
        match self {
            Event::VaultLaunch(payload) => payload.base(),
            Event::VaultInvest(payload) => payload.base(),
            Event::VaultWithdraw(payload) => payload.base(),
            Event::VaultDividend(payload) => payload.base(),
            Event::VaultClaim(payload) => payload.base(),
            Event::VaultRedeem(payload) => payload.base(),
            Event::VaultUnLockTransfer(payload) => payload.base(),
            Event::TokenTransfer(payload) => payload.base(),
        }
    }

    pub fn success(&self) -> bool {
        self.base().success
    }

    pub fn to_message(&self) -> Result<Message, EncodeError> {
        match self {
            Event::VaultLaunch(payload) => Message::from_payload(payload),
            Event::VaultInvest(payload) => Message::from_payload(payload),
            Event::VaultWithdraw(payload) => Message::from_payload(payload),
            Event::VaultDividend(payload) => Message::from_payload(payload),
            Event::VaultClaim(payload) => Message::from_payload(payload),
            Event::VaultRedeem(payload) => Message::from_payload(payload),
            Event::VaultUnLockTransfer(payload) => Message::from_payload(payload),
            Event::TokenTransfer(payload) => Message::from_payload(payload),
        }
    }
}

impl TryFrom<&Message> for Event {
    type Error = DecodeError;

    /// Reads the envelope type first, then decodes the payload into the
    /// matching shape.
    fn try_from(message: &Message) -> Result<Self, Self::Error> {
        let kind = message.message_type().map_err(|err| {
            debug!(kind = message.kind(), "message type not recognized");
            err
        })?;
        trace!(%kind, "dispatching message");

        let event = match kind {
            MessageType::VaultLaunch => Event::VaultLaunch(message.decode()?),
            MessageType::VaultInvest => Event::VaultInvest(message.decode()?),
            MessageType::VaultWithdraw => Event::VaultWithdraw(message.decode()?),
            MessageType::VaultDividend => Event::VaultDividend(message.decode()?),
            MessageType::VaultClaim => Event::VaultClaim(message.decode()?),
            MessageType::VaultRedeem => Event::VaultRedeem(message.decode()?),
            MessageType::VaultUnLockTransfer => Event::VaultUnLockTransfer(message.decode()?),
            MessageType::TokenTransfer => Event::TokenTransfer(message.decode()?),
        };
        Ok(event)
    }
}

impl TryFrom<Message> for Event {
    type Error = DecodeError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        Event::try_from(&message)
    }
}
