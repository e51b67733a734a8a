//! Message envelope, message types, and payload shapes for vault transaction events.

pub mod event;
pub mod message;
pub mod payload;

pub use event::Event;
pub use message::{DecodeError, EncodeError, Message, MessageType};
pub use payload::{
    BaseData, Payload, TokenTransfer, VaultClaim, VaultDividend, VaultInvest, VaultLaunch,
    VaultRedeem, VaultUnLockTransfer, VaultWithdraw,
};
