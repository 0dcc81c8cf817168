//! Typed wallet records.
//!
//! Every `(key, value)` pair in a wallet store starts with a compact-size
//! prefixed type tag on the key side. The tag alone decides the record
//! kind; the remaining key and value fields are read positionally.
//!
//! Unknown tags decode to [`WalletRecord::Ignored`] rather than failing.

use crate::error::{Result, WalletError};
use crate::tx::{read_count, Transaction};
use std::net::Ipv4Addr;
use vaultscan_core::ByteCursor;
use vaultscan_crypto::MasterKeyParams;

/// Key metadata version that introduced HD key paths
const KEYMETA_VERSION_WITH_KEYPATH: i32 = 10;

/// HD chain version that introduced the internal counter
const HDCHAIN_VERSION_WITH_INTERNAL: i32 = 2;

/// Known record tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTag {
    /// `version`
    Version,
    /// `minversion`
    MinVersion,
    /// `setting`
    Setting,
    /// `key`
    Key,
    /// `wkey`
    WalletKey,
    /// `ckey`
    EncryptedKey,
    /// `mkey`
    MasterKey,
    /// `defaultkey`
    DefaultKey,
    /// `pool`
    Pool,
    /// `name`
    Name,
    /// `acc`
    Account,
    /// `acentry`
    AccountEntry,
    /// `bestblock`
    BestBlock,
    /// `bestblock_nomerkle`
    BestBlockNoMerkle,
    /// `tx`
    Transaction,
    /// `keymeta`
    KeyMeta,
    /// `hdchain`
    HdChain,
    /// `purpose`
    Purpose,
    /// `cscript`
    Script,
    /// `orderposnext`
    OrderPosNext,
}

impl RecordTag {
    /// Look up a tag string.
    pub fn parse(tag: &str) -> Result<Self> {
        Ok(match tag {
            "version" => RecordTag::Version,
            "minversion" => RecordTag::MinVersion,
            "setting" => RecordTag::Setting,
            "key" => RecordTag::Key,
            "wkey" => RecordTag::WalletKey,
            "ckey" => RecordTag::EncryptedKey,
            "mkey" => RecordTag::MasterKey,
            "defaultkey" => RecordTag::DefaultKey,
            "pool" => RecordTag::Pool,
            "name" => RecordTag::Name,
            "acc" => RecordTag::Account,
            "acentry" => RecordTag::AccountEntry,
            "bestblock" => RecordTag::BestBlock,
            "bestblock_nomerkle" => RecordTag::BestBlockNoMerkle,
            "tx" => RecordTag::Transaction,
            "keymeta" => RecordTag::KeyMeta,
            "hdchain" => RecordTag::HdChain,
            "purpose" => RecordTag::Purpose,
            "cscript" => RecordTag::Script,
            "orderposnext" => RecordTag::OrderPosNext,
            other => return Err(WalletError::UnknownRecordType(other.to_string())),
        })
    }

    /// The tag string as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordTag::Version => "version",
            RecordTag::MinVersion => "minversion",
            RecordTag::Setting => "setting",
            RecordTag::Key => "key",
            RecordTag::WalletKey => "wkey",
            RecordTag::EncryptedKey => "ckey",
            RecordTag::MasterKey => "mkey",
            RecordTag::DefaultKey => "defaultkey",
            RecordTag::Pool => "pool",
            RecordTag::Name => "name",
            RecordTag::Account => "acc",
            RecordTag::AccountEntry => "acentry",
            RecordTag::BestBlock => "bestblock",
            RecordTag::BestBlockNoMerkle => "bestblock_nomerkle",
            RecordTag::Transaction => "tx",
            RecordTag::KeyMeta => "keymeta",
            RecordTag::HdChain => "hdchain",
            RecordTag::Purpose => "purpose",
            RecordTag::Script => "cscript",
            RecordTag::OrderPosNext => "orderposnext",
        }
    }
}

/// A peer address stored in an `addr*` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddress {
    /// Serialization version
    pub version: i32,
    /// Last-seen time (unix seconds)
    pub time: u32,
    /// Service bits
    pub services: u64,
    /// IPv4 address (from the last 4 bytes of the IPv6-mapped field)
    pub ip: Ipv4Addr,
    /// Port, stored big-endian
    pub port: u16,
}

/// Value of a `setting` record, typed by the setting name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// `f*` flags
    Bool(bool),
    /// `nTransactionFee`
    Fee(i64),
    /// Other `n*` integers
    Int(i32),
    /// `addr*` peer addresses
    Address(NetworkAddress),
    /// Anything else, left undecoded
    Raw(Vec<u8>),
}

/// An `mkey` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyRecord {
    /// Master key id
    pub id: u32,
    /// Encrypted master secret
    pub encrypted_key: Vec<u8>,
    /// KDF salt
    pub salt: Vec<u8>,
    /// KDF method
    pub derivation_method: u32,
    /// KDF iterations
    pub iterations: u32,
    /// Opaque extra KDF parameters
    pub extra_params: Vec<u8>,
}

impl MasterKeyRecord {
    /// Parameters for [`vaultscan_crypto::MasterKeyDecryptor`].
    pub fn params(&self) -> MasterKeyParams {
        MasterKeyParams {
            encrypted_key: self.encrypted_key.clone(),
            salt: self.salt.clone(),
            derivation_method: self.derivation_method,
            iterations: self.iterations,
        }
    }
}

/// A `pool` record (pre-generated key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    /// Pool index
    pub index: i64,
    /// Record version
    pub version: i32,
    /// Creation time
    pub time: i64,
    /// Public key
    pub public_key: Vec<u8>,
}

/// An `acc` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    /// Account name
    pub name: String,
    /// Record version
    pub version: i32,
    /// Account public key
    pub public_key: Vec<u8>,
}

/// An `acentry` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEntry {
    /// Account name
    pub account: String,
    /// Entry number
    pub index: u64,
    /// Record version
    pub version: i32,
    /// Credit (positive) or debit (negative)
    pub credit_debit: i64,
    /// Entry time
    pub time: i64,
    /// Counterparty account
    pub other_account: String,
    /// Free-form comment
    pub comment: String,
}

/// A `bestblock` / `bestblock_nomerkle` locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestBlock {
    /// Locator version
    pub version: i32,
    /// Block hashes, most recent first
    pub hashes: Vec<[u8; 32]>,
    /// False for `bestblock_nomerkle`
    pub merkle: bool,
}

/// A `keymeta` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Metadata version
    pub version: i32,
    /// Key creation time
    pub create_time: i64,
    /// HD derivation path (version 10+)
    pub key_path: Option<String>,
    /// HD seed id (version 10+)
    pub seed_id: Option<[u8; 20]>,
}

/// An `hdchain` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdChain {
    /// Chain version
    pub version: i32,
    /// External chain counter
    pub external_counter: u32,
    /// HD seed id
    pub seed_id: [u8; 20],
    /// Internal chain counter (version 2+)
    pub internal_counter: Option<u32>,
}

/// A `cscript` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    /// hash160 of the script
    pub hash: [u8; 20],
    /// Redeem script
    pub script: Vec<u8>,
}

/// One decoded wallet record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletRecord {
    /// Wallet version
    Version(u32),
    /// Minimum client version
    MinVersion(u32),
    /// Named setting
    Setting {
        /// Setting name
        name: String,
        /// Typed value
        value: SettingValue,
    },
    /// Plain private key (`key`)
    UnencryptedKey {
        /// Public key
        public_key: Vec<u8>,
        /// Private key container (raw or DER)
        private_key: Vec<u8>,
    },
    /// Plain private key with lifetime metadata (`wkey`)
    WalletKey {
        /// Public key
        public_key: Vec<u8>,
        /// Private key container
        private_key: Vec<u8>,
        /// Creation time
        created: i64,
        /// Expiry time
        expires: i64,
        /// Comment
        comment: String,
    },
    /// Encrypted private key (`ckey`)
    EncryptedKey {
        /// Public key
        public_key: Vec<u8>,
        /// AES-CBC encrypted scalar
        encrypted_private_key: Vec<u8>,
    },
    /// Master key (`mkey`)
    MasterKey(MasterKeyRecord),
    /// Default receiving key
    DefaultKey {
        /// Public key
        public_key: Vec<u8>,
    },
    /// Key pool entry
    Pool(PoolEntry),
    /// Account
    Account(AccountRecord),
    /// Accounting entry
    AccountEntry(AccountEntry),
    /// Best block locator
    BestBlock(BestBlock),
    /// Wallet transaction
    Transaction(Transaction),
    /// Address book label
    Name {
        /// Address
        address: String,
        /// Label
        label: String,
    },
    /// Key metadata
    KeyMeta {
        /// Public key the metadata belongs to
        public_key: Vec<u8>,
        /// Metadata
        meta: KeyMetadata,
    },
    /// HD chain state
    HdChain(HdChain),
    /// Address purpose (`receive`, `send`, ...)
    Purpose {
        /// Address
        address: String,
        /// Purpose string
        purpose: String,
    },
    /// Redeem script
    Script(ScriptRecord),
    /// Next accounting order position
    OrderPosNext(i64),
    /// Record with an unrecognized tag
    Ignored {
        /// The tag as found
        tag: String,
    },
}

impl WalletRecord {
    /// Tag string for this record.
    pub fn tag(&self) -> &str {
        match self {
            WalletRecord::Version(_) => RecordTag::Version.as_str(),
            WalletRecord::MinVersion(_) => RecordTag::MinVersion.as_str(),
            WalletRecord::Setting { .. } => RecordTag::Setting.as_str(),
            WalletRecord::UnencryptedKey { .. } => RecordTag::Key.as_str(),
            WalletRecord::WalletKey { .. } => RecordTag::WalletKey.as_str(),
            WalletRecord::EncryptedKey { .. } => RecordTag::EncryptedKey.as_str(),
            WalletRecord::MasterKey(_) => RecordTag::MasterKey.as_str(),
            WalletRecord::DefaultKey { .. } => RecordTag::DefaultKey.as_str(),
            WalletRecord::Pool(_) => RecordTag::Pool.as_str(),
            WalletRecord::Account(_) => RecordTag::Account.as_str(),
            WalletRecord::AccountEntry(_) => RecordTag::AccountEntry.as_str(),
            WalletRecord::BestBlock(b) if !b.merkle => RecordTag::BestBlockNoMerkle.as_str(),
            WalletRecord::BestBlock(_) => RecordTag::BestBlock.as_str(),
            WalletRecord::Transaction(_) => RecordTag::Transaction.as_str(),
            WalletRecord::Name { .. } => RecordTag::Name.as_str(),
            WalletRecord::KeyMeta { .. } => RecordTag::KeyMeta.as_str(),
            WalletRecord::HdChain(_) => RecordTag::HdChain.as_str(),
            WalletRecord::Purpose { .. } => RecordTag::Purpose.as_str(),
            WalletRecord::Script(_) => RecordTag::Script.as_str(),
            WalletRecord::OrderPosNext(_) => RecordTag::OrderPosNext.as_str(),
            WalletRecord::Ignored { tag } => tag.as_str(),
        }
    }

    /// Decode one `(key, value)` pair.
    ///
    /// Unknown tags yield [`WalletRecord::Ignored`]; any field that runs
    /// past its buffer fails the whole record.
    pub fn decode(key: &[u8], value: &[u8]) -> Result<Self> {
        let mut kds = ByteCursor::from_slice(key);
        let mut vds = ByteCursor::from_slice(value);
        let tag = kds.read_text()?;
        match RecordTag::parse(&tag) {
            Ok(known) => decode_fields(known, &mut kds, &mut vds),
            Err(WalletError::UnknownRecordType(tag)) => Ok(WalletRecord::Ignored { tag }),
            Err(e) => Err(e),
        }
    }
}

fn decode_fields(
    tag: RecordTag,
    kds: &mut ByteCursor,
    vds: &mut ByteCursor,
) -> Result<WalletRecord> {
    let record = match tag {
        RecordTag::Version => WalletRecord::Version(vds.read_u32()?),
        RecordTag::MinVersion => WalletRecord::MinVersion(vds.read_u32()?),
        RecordTag::Setting => {
            let name = kds.read_text()?;
            let value = decode_setting(&name, vds)?;
            WalletRecord::Setting { name, value }
        }
        RecordTag::Key => WalletRecord::UnencryptedKey {
            public_key: kds.read_string()?,
            private_key: vds.read_string()?,
        },
        RecordTag::WalletKey => WalletRecord::WalletKey {
            public_key: kds.read_string()?,
            private_key: vds.read_string()?,
            created: vds.read_i64()?,
            expires: vds.read_i64()?,
            comment: vds.read_text()?,
        },
        RecordTag::EncryptedKey => WalletRecord::EncryptedKey {
            public_key: kds.read_string()?,
            encrypted_private_key: vds.read_string()?,
        },
        RecordTag::MasterKey => WalletRecord::MasterKey(MasterKeyRecord {
            id: kds.read_u32()?,
            encrypted_key: vds.read_string()?,
            salt: vds.read_string()?,
            derivation_method: vds.read_u32()?,
            iterations: vds.read_u32()?,
            extra_params: vds.read_string()?,
        }),
        RecordTag::DefaultKey => WalletRecord::DefaultKey {
            public_key: vds.read_string()?,
        },
        RecordTag::Pool => WalletRecord::Pool(PoolEntry {
            index: kds.read_i64()?,
            version: vds.read_i32()?,
            time: vds.read_i64()?,
            public_key: vds.read_string()?,
        }),
        RecordTag::Name => WalletRecord::Name {
            address: kds.read_text()?,
            label: vds.read_text()?,
        },
        RecordTag::Account => WalletRecord::Account(AccountRecord {
            name: kds.read_text()?,
            version: vds.read_i32()?,
            public_key: vds.read_string()?,
        }),
        RecordTag::AccountEntry => WalletRecord::AccountEntry(AccountEntry {
            account: kds.read_text()?,
            index: kds.read_u64()?,
            version: vds.read_i32()?,
            credit_debit: vds.read_i64()?,
            time: vds.read_i64()?,
            other_account: vds.read_text()?,
            comment: vds.read_text()?,
        }),
        RecordTag::BestBlock | RecordTag::BestBlockNoMerkle => {
            let version = vds.read_i32()?;
            let count = read_count(vds, 32)?;
            let mut hashes = Vec::with_capacity(count);
            for _ in 0..count {
                hashes.push(vds.read_hash256()?);
            }
            WalletRecord::BestBlock(BestBlock {
                version,
                hashes,
                merkle: tag == RecordTag::BestBlock,
            })
        }
        RecordTag::Transaction => {
            let txid = kds.read_hash256()?;
            WalletRecord::Transaction(Transaction::decode(txid, vds)?)
        }
        RecordTag::KeyMeta => {
            let public_key = kds.read_string()?;
            let version = vds.read_i32()?;
            let create_time = vds.read_i64()?;
            let (key_path, seed_id) = if version >= KEYMETA_VERSION_WITH_KEYPATH {
                (Some(vds.read_text()?), Some(vds.read_array::<20>()?))
            } else {
                (None, None)
            };
            WalletRecord::KeyMeta {
                public_key,
                meta: KeyMetadata {
                    version,
                    create_time,
                    key_path,
                    seed_id,
                },
            }
        }
        RecordTag::HdChain => {
            let version = vds.read_i32()?;
            let external_counter = vds.read_u32()?;
            let seed_id = vds.read_array::<20>()?;
            let internal_counter = if version >= HDCHAIN_VERSION_WITH_INTERNAL {
                Some(vds.read_u32()?)
            } else {
                None
            };
            WalletRecord::HdChain(HdChain {
                version,
                external_counter,
                seed_id,
                internal_counter,
            })
        }
        RecordTag::Purpose => WalletRecord::Purpose {
            address: kds.read_text()?,
            purpose: vds.read_text()?,
        },
        RecordTag::Script => WalletRecord::Script(ScriptRecord {
            hash: kds.read_array::<20>()?,
            script: vds.read_string()?,
        }),
        RecordTag::OrderPosNext => WalletRecord::OrderPosNext(vds.read_i64()?),
    };
    Ok(record)
}

fn decode_setting(name: &str, vds: &mut ByteCursor) -> Result<SettingValue> {
    let value = if name.starts_with('f') {
        SettingValue::Bool(vds.read_bool()?)
    } else if name == "nTransactionFee" {
        SettingValue::Fee(vds.read_i64()?)
    } else if name.starts_with('n') {
        SettingValue::Int(vds.read_i32()?)
    } else if name.starts_with("addr") {
        let version = vds.read_i32()?;
        let time = vds.read_u32()?;
        let services = vds.read_u64()?;
        let _reserved = vds.read_array::<12>()?;
        let ip = Ipv4Addr::from(vds.read_array::<4>()?);
        let port = vds.read_u16_be()?;
        SettingValue::Address(NetworkAddress {
            version,
            time,
            services,
            ip,
            port,
        })
    } else {
        SettingValue::Raw(vds.read_rest())
    };
    Ok(value)
}
