//! Protobuf messages for Cosmos-SDK transactions.
//!
//! Hand-declared `prost` messages covering only what the engine reads: the
//! `cosmos.tx.v1beta1.Tx` envelope, bank `MsgSend`, and the THORChain /
//! MayaChain `types.MsgSend` and `types.MsgDeposit` variants.

/// `google.protobuf.Any`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Any {
    /// Message type URL, e.g. `/cosmos.bank.v1beta1.MsgSend`.
    #[prost(string, tag = "1")]
    pub type_url: String,
    /// Encoded message.
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// `cosmos.tx.v1beta1.Tx`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tx {
    /// Messages and memo.
    #[prost(message, optional, tag = "1")]
    pub body: Option<TxBody>,
    /// Signer infos and fee; kept opaque.
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info: Vec<u8>,
    /// Signatures, one per signer.
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

/// `cosmos.tx.v1beta1.TxBody`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxBody {
    /// Packed messages.
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    /// Free-form memo.
    #[prost(string, tag = "2")]
    pub memo: String,
    /// Block height after which the tx is invalid.
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
}

/// `cosmos.base.v1beta1.Coin`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Coin {
    /// Denomination.
    #[prost(string, tag = "1")]
    pub denom: String,
    /// Decimal integer amount.
    #[prost(string, tag = "2")]
    pub amount: String,
}

/// `cosmos.bank.v1beta1.MsgSend` (bech32 string addresses).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BankMsgSend {
    /// Sender.
    #[prost(string, tag = "1")]
    pub from_address: String,
    /// Recipient.
    #[prost(string, tag = "2")]
    pub to_address: String,
    /// Coins moved.
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<Coin>,
}

/// `types.MsgSend` on THORChain and MayaChain (raw address bytes).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NativeMsgSend {
    /// Sender account bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub from_address: Vec<u8>,
    /// Recipient account bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub to_address: Vec<u8>,
    /// Coins moved.
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<Coin>,
}

/// `common.Asset`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Asset {
    /// Chain, e.g. `THOR`.
    #[prost(string, tag = "1")]
    pub chain: String,
    /// Symbol, e.g. `RUNE`.
    #[prost(string, tag = "2")]
    pub symbol: String,
    /// Ticker.
    #[prost(string, tag = "3")]
    pub ticker: String,
    /// Synthetic asset.
    #[prost(bool, tag = "4")]
    pub synth: bool,
    /// Trade asset.
    #[prost(bool, tag = "5")]
    pub trade: bool,
    /// Secured asset.
    #[prost(bool, tag = "6")]
    pub secured: bool,
}

impl Asset {
    /// Canonical `CHAIN.SYMBOL` notation, upper case. Synths use `/`, trade
    /// assets `~` and secured assets `-` as the separator.
    #[must_use]
    pub fn notation(&self) -> String {
        let sep = if self.synth {
            '/'
        } else if self.trade {
            '~'
        } else if self.secured {
            '-'
        } else {
            '.'
        };
        format!("{}{sep}{}", self.chain, self.symbol).to_ascii_uppercase()
    }
}

/// `common.Coin`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DepositCoin {
    /// Asset deposited.
    #[prost(message, optional, tag = "1")]
    pub asset: Option<Asset>,
    /// Decimal integer amount.
    #[prost(string, tag = "2")]
    pub amount: String,
    /// Asset decimals.
    #[prost(int64, tag = "3")]
    pub decimals: i64,
}

/// `types.MsgDeposit`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgDeposit {
    /// Coins deposited into the protocol.
    #[prost(message, repeated, tag = "1")]
    pub coins: Vec<DepositCoin>,
    /// Swap or liquidity instruction.
    #[prost(string, tag = "2")]
    pub memo: String,
    /// Signer account bytes.
    #[prost(bytes = "vec", tag = "3")]
    pub signer: Vec<u8>,
}
