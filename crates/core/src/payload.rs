use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::message::MessageType;

/// Fields shared by every payload, inlined into the payload object on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseData {
    /// Producer-supplied identifier tying the message to its originating request.
    pub correlation_id: String,
    /// On-chain transaction hash. Empty when the operation failed before one was assigned.
    pub tx_hash: String,
    /// On-chain event time in whole seconds. Zero when unavailable.
    pub ts: i64,
    /// Address of the transaction initiator.
    pub sender: String,
    /// Failed operations are published too, with this set to `false`.
    pub success: bool,
}

impl BaseData {
    pub const FIELDS: &'static [&'static str] =
        &["correlation_id", "tx_hash", "ts", "sender", "success"];

    pub fn confirmed(
        correlation_id: impl Into<String>,
        tx_hash: impl Into<String>,
        ts: i64,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            tx_hash: tx_hash.into(),
            ts,
            sender: sender.into(),
            success: true,
        }
    }

    pub fn failed(correlation_id: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            sender: sender.into(),
            ..Self::default()
        }
    }

    pub fn new_correlation_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// `None` when no on-chain timestamp was recorded.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        if self.ts == 0 {
            return None;
        }
        DateTime::from_timestamp(self.ts, 0)
    }
}

/// A concrete payload shape bound to one [`MessageType`].
pub trait Payload: Serialize + DeserializeOwned {
    const TYPE: MessageType;
    /// Wire names of the fields this shape adds on top of [`BaseData`].
    const FIELDS: &'static [&'static str];

    fn base(&self) -> &BaseData;
}

macro_rules! payload {
    (
        $(#[$meta:meta])*
        $name:ident => $kind:ident {
            $( $(#[$field_meta:meta])* $field:ident ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            pub base: BaseData,
            $( $(#[$field_meta])* pub $field: String, )*
        }

        impl Payload for $name {
            const TYPE: MessageType = MessageType::$kind;
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn base(&self) -> &BaseData {
                &self.base
            }
        }
    };
}

payload! {
    /// Published once a vault and its share token are deployed.
    VaultLaunch => VaultLaunch {
        vault_address,
        vault_token_address,
    }
}

payload! {
    /// An investor spent `asset_token_amount` and received `vault_token_amount`.
    VaultInvest => VaultInvest {
        receiver_address,
        vault_token_amount,
        asset_token_amount,
    }
}

payload! {
    /// Raised funds withdrawn after a successful fundraise.
    VaultWithdraw => VaultWithdraw {
        receiver_address,
        asset_token_amount,
    }
}

payload! {
    /// Dividend distributed by the vault admin.
    VaultDividend => VaultDividend {
        asset_token_amount,
    }
}

payload! {
    /// An investor claimed their dividend share.
    VaultClaim => VaultClaim {
        receiver_address,
        asset_token_amount,
    }
}

payload! {
    /// Redemption after a failed fundraise.
    VaultRedeem => VaultRedeem {
        /// The investor on single-chain deployments, the payment-system account on multi-chain ones.
        receiver_address,
        /// Vault tokens burned.
        vault_token_amount,
        /// Asset tokens returned.
        asset_token_amount,
    }
}

payload! {
    /// Share-token transfers were unlocked after a successful fundraise.
    VaultUnLockTransfer => VaultUnLockTransfer {}
}

payload! {
    TokenTransfer => TokenTransfer {
        receiver_address,
        token_amount,
        token_address,
    }
}
