//! Typed records and enumerations filled in by the response parsers.
//!
//! Numeric values follow 3GPP TS 27.007 (network, call, phonebook) and
//! 3GPP TS 27.005 (SMS) unless noted otherwise.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::config::{
    MAX_NAME_LEN, MAX_NUMBER_LEN, MAX_OPERATOR_LONG_LEN, MAX_OPERATOR_SHORT_LEN, MAX_SMS_TEXT_LEN,
};

/// IPv4 address, octets in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IpV4(pub [u8; 4]);

/// MAC address, octets in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mac(pub [u8; 6]);

/// Timestamp as carried in SMS service-centre fields.
///
/// The modem emits a two-digit year; the parser stores `2000 + yy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Message and phonebook storages, 3GPP TS 27.005 section 3.2.2 `<mem>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MemoryKind {
    /// SIM message storage
    Sm = 0,
    /// Mobile-equipment storage
    Me = 1,
    /// Combined SIM and ME storage
    Mt = 2,
    /// Broadcast message storage
    Bm = 3,
    /// Status report storage
    Sr = 4,
    /// Own numbers (MSISDN) storage
    On = 5,
    #[default]
    Unknown = 6,
}

impl MemoryKind {
    /// Wire token as used in `AT+CPMS`/`AT+CPBS` arguments.
    pub fn token(self) -> &'static str {
        match self {
            Self::Sm => "SM",
            Self::Me => "ME",
            Self::Mt => "MT",
            Self::Bm => "BM",
            Self::Sr => "SR",
            Self::On => "ON",
            Self::Unknown => "",
        }
    }
}

/// Ordered token table resolving storage names to [`MemoryKind`].
///
/// Order matters: the token parser takes the first prefix match.
pub const MEMORY_MAP: &[(&str, MemoryKind)] = &[
    ("SM", MemoryKind::Sm),
    ("ME", MemoryKind::Me),
    ("MT", MemoryKind::Mt),
    ("BM", MemoryKind::Bm),
    ("SR", MemoryKind::Sr),
    ("ON", MemoryKind::On),
];

/// Set of [`MemoryKind`] values, bit `k` set iff kind `k` was enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemorySet(pub u32);

impl MemorySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, kind: MemoryKind) {
        self.0 |= 1 << (kind as u32);
    }

    pub fn contains(&self, kind: MemoryKind) -> bool {
        self.0 & (1 << (kind as u32)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// SIM card state as reported by `+CPIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimState {
    /// The card accepts commands.
    Ready,
    /// The card is still booting or errored.
    #[default]
    NotReady,
    /// No card detected in the holder.
    NotInserted,
    /// Waiting for the PIN.
    Pin,
    /// PIN blocked, waiting for the PUK.
    Puk,
}

/// Circuit-switched registration status, `+CREG` `<stat>`,
/// 3GPP TS 27.007 section 7.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationStatus {
    /// Not registered, not searching.
    NotRegistered = 0,
    /// Registered, home network.
    Registered = 1,
    /// Not registered, searching for an operator.
    Searching = 2,
    /// Registration denied by the network.
    Denied = 3,
    #[default]
    Unknown = 4,
    /// Registered, roaming.
    Roaming = 5,
}

impl RegistrationStatus {
    /// Registered with a network, home or roaming.
    pub fn registered(self) -> bool {
        matches!(self, Self::Registered | Self::Roaming)
    }
}

impl From<i32> for RegistrationStatus {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::NotRegistered,
            1 => Self::Registered,
            2 => Self::Searching,
            3 => Self::Denied,
            5 => Self::Roaming,
            _ => Self::Unknown,
        }
    }
}

/// `+COPS` `<mode>`, 3GPP TS 27.007 section 7.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorMode {
    /// Automatic operator selection.
    Auto = 0,
    /// Manual selection of the operator given in the command.
    Manual = 1,
    /// Deregister from the network.
    Deregister = 2,
    /// Set the response format only, no registration attempt.
    SetFormat = 3,
    /// Manual selection with automatic fallback.
    ManualAuto = 4,
    #[default]
    Unknown = 255,
}

impl From<i32> for OperatorMode {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Auto,
            1 => Self::Manual,
            2 => Self::Deregister,
            3 => Self::SetFormat,
            4 => Self::ManualAuto,
            _ => Self::Unknown,
        }
    }
}

/// `+COPS` `<format>`: how the operator is named in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorFormat {
    /// Long alphanumeric name, up to 16 characters on the wire.
    LongName = 0,
    /// Short alphanumeric name.
    ShortName = 1,
    /// Numeric MCC/MNC code.
    Number = 2,
    /// No format field present in the response.
    #[default]
    Invalid = 255,
}

impl From<i32> for OperatorFormat {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::LongName,
            1 => Self::ShortName,
            2 => Self::Number,
            _ => Self::Invalid,
        }
    }
}

/// `+COPS=?` `<stat>`: availability of a scanned operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorStatus {
    #[default]
    Unknown = 0,
    Available = 1,
    Current = 2,
    Forbidden = 3,
}

impl From<i32> for OperatorStatus {
    fn from(v: i32) -> Self {
        match v {
            1 => Self::Available,
            2 => Self::Current,
            3 => Self::Forbidden,
            _ => Self::Unknown,
        }
    }
}

/// Operator naming payload, tagged by [`OperatorFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorName {
    Long(String<MAX_OPERATOR_LONG_LEN>),
    Short(String<MAX_OPERATOR_SHORT_LEN>),
    Code(u32),
    #[default]
    Invalid,
}

/// Currently selected operator, `+COPS?`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Operator {
    pub mode: OperatorMode,
    pub format: OperatorFormat,
    pub name: OperatorName,
}

/// One `(stat,"long","short",numeric)` tuple from a `+COPS=?` scan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanOperator {
    pub status: OperatorStatus,
    pub long_name: String<MAX_OPERATOR_LONG_LEN>,
    pub short_name: String<MAX_OPERATOR_SHORT_LEN>,
    /// Numeric MCC/MNC code, e.g. `26202`.
    pub code: u32,
}

/// `+CLCC` `<dir>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallDirection {
    #[default]
    MobileOriginated = 0,
    MobileTerminated = 1,
}

impl From<i32> for CallDirection {
    fn from(v: i32) -> Self {
        match v {
            1 => Self::MobileTerminated,
            _ => Self::MobileOriginated,
        }
    }
}

/// `+CLCC` `<stat>`: state of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallState {
    Active = 0,
    Held = 1,
    Dialing = 2,
    Alerting = 3,
    Incoming = 4,
    Waiting = 5,
    #[default]
    Disconnect = 6,
}

impl From<i32> for CallState {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Active,
            1 => Self::Held,
            2 => Self::Dialing,
            3 => Self::Alerting,
            4 => Self::Incoming,
            5 => Self::Waiting,
            _ => Self::Disconnect,
        }
    }
}

/// `+CLCC` `<mode>`: bearer of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallType {
    Voice = 0,
    Data = 1,
    Fax = 2,
    #[default]
    Unknown = 9,
}

impl From<i32> for CallType {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Voice,
            1 => Self::Data,
            2 => Self::Fax,
            _ => Self::Unknown,
        }
    }
}

/// Type of address octet, 3GPP TS 24.008 section 10.5.4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NumberType {
    #[default]
    Unknown = 129,
    /// Number starts with `+`.
    International = 145,
    National = 161,
    NetworkSpecific = 177,
}

impl From<i32> for NumberType {
    fn from(v: i32) -> Self {
        match v {
            145 => Self::International,
            161 => Self::National,
            177 => Self::NetworkSpecific,
            _ => Self::Unknown,
        }
    }
}

/// SMS record status, `+CMGL` `<stat>` in text mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmsStatus {
    #[default]
    All,
    Unread,
    Read,
    Unsent,
    Sent,
}

impl SmsStatus {
    /// Text-mode token as used in `AT+CMGL=<stat>`.
    pub fn as_token(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Unread => "REC UNREAD",
            Self::Read => "REC READ",
            Self::Unsent => "STO UNSENT",
            Self::Sent => "STO SENT",
        }
    }
}

/// Active or held call as listed by `+CLCC`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CallInfo {
    /// Call identification number, 3GPP TS 22.030.
    pub id: u8,
    pub direction: CallDirection,
    pub state: CallState,
    pub call_type: CallType,
    /// Part of a multiparty conference.
    pub multiparty: bool,
    pub number: String<MAX_NUMBER_LEN>,
    pub number_type: NumberType,
    /// Phonebook alpha for the number, when the modem resolves one.
    pub name: String<MAX_NAME_LEN>,
}

/// One stored message, header fields from `+CMGR`/`+CMGL`, body from the
/// following data line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsEntry {
    /// Storage the entry lives in.
    pub mem: MemoryKind,
    /// Index within the storage.
    pub pos: u16,
    pub status: SmsStatus,
    /// Originator or destination address.
    pub number: String<MAX_NUMBER_LEN>,
    pub name: String<MAX_NAME_LEN>,
    pub datetime: DateTime,
    pub text: String<MAX_SMS_TEXT_LEN>,
}

/// One phonebook record, `+CPBR`/`+CPBF`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhonebookEntry {
    pub pos: u16,
    pub name: String<MAX_NAME_LEN>,
    pub number_type: NumberType,
    pub number: String<MAX_NUMBER_LEN>,
}

/// Occupancy of one message storage slot, `+CPMS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsMemory {
    /// Storages the modem offers for this slot.
    pub available: MemorySet,
    /// Storage currently selected.
    pub current: MemoryKind,
    pub used: u16,
    pub total: u16,
}

/// Occupancy of the selected phonebook storage, `+CPBS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhonebookMemory {
    pub available: MemorySet,
    pub current: MemoryKind,
    pub used: u16,
    pub total: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_set_bits_follow_discriminants() {
        let mut set = MemorySet::empty();
        set.insert(MemoryKind::Sm);
        set.insert(MemoryKind::Sr);
        assert_eq!(set.0, (1 << 0) | (1 << 4));
        assert!(set.contains(MemoryKind::Sm));
        assert!(!set.contains(MemoryKind::Me));
    }

    #[test]
    fn registration_status_from_creg_stat() {
        assert_eq!(RegistrationStatus::from(1), RegistrationStatus::Registered);
        assert_eq!(RegistrationStatus::from(5), RegistrationStatus::Roaming);
        assert_eq!(RegistrationStatus::from(9), RegistrationStatus::Unknown);
        assert!(RegistrationStatus::Roaming.registered());
        assert!(!RegistrationStatus::Searching.registered());
    }
}
