//! Driver error taxonomy and the 3GPP result-code tables.

/// Outcome of a command or of the surrounding driver machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The modem answered with a bare `ERROR`.
    Modem,
    /// The modem answered with `+CME ERROR: <err>`.
    Cme(CmeError),
    /// The modem answered with `+CMS ERROR: <err>`.
    Cms(CmsError),
    /// No terminal result code arrived within the command deadline.
    Timeout,
    /// The command mailbox is full.
    Busy,
    /// An argument does not fit the AT grammar or a bounded buffer.
    Parameter,
    /// The serial transport failed mid-command.
    Serial,
}

/// Mobile-equipment errors, 3GPP TS 27.007 section 9.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum CmeError {
    PhoneFailure = 0,
    NoConnectionToPhone = 1,
    LinkReserved = 2,
    NotAllowed = 3,
    NotSupported = 4,
    PhSimPin = 5,
    PhFsimPin = 6,
    PhFsimPuk = 7,
    SimNotInserted = 10,
    SimPin = 11,
    SimPuk = 12,
    SimFailure = 13,
    SimBusy = 14,
    SimWrong = 15,
    IncorrectPassword = 16,
    SimPin2 = 17,
    SimPuk2 = 18,
    MemoryFull = 20,
    InvalidIndex = 21,
    NotFound = 22,
    MemoryFailure = 23,
    TextStringTooLong = 24,
    InvalidTextCharacters = 25,
    DialStringTooLong = 26,
    InvalidDialCharacters = 27,
    NoNetworkService = 30,
    NetworkTimeout = 31,
    NetworkNotAllowed = 32,
    NetworkPersonalisationPin = 40,
    NetworkPersonalisationPuk = 41,
    Unknown = 100,
}

impl From<u16> for CmeError {
    fn from(v: u16) -> Self {
        match v {
            0 => Self::PhoneFailure,
            1 => Self::NoConnectionToPhone,
            2 => Self::LinkReserved,
            3 => Self::NotAllowed,
            4 => Self::NotSupported,
            5 => Self::PhSimPin,
            6 => Self::PhFsimPin,
            7 => Self::PhFsimPuk,
            10 => Self::SimNotInserted,
            11 => Self::SimPin,
            12 => Self::SimPuk,
            13 => Self::SimFailure,
            14 => Self::SimBusy,
            15 => Self::SimWrong,
            16 => Self::IncorrectPassword,
            17 => Self::SimPin2,
            18 => Self::SimPuk2,
            20 => Self::MemoryFull,
            21 => Self::InvalidIndex,
            22 => Self::NotFound,
            23 => Self::MemoryFailure,
            24 => Self::TextStringTooLong,
            25 => Self::InvalidTextCharacters,
            26 => Self::DialStringTooLong,
            27 => Self::InvalidDialCharacters,
            30 => Self::NoNetworkService,
            31 => Self::NetworkTimeout,
            32 => Self::NetworkNotAllowed,
            40 => Self::NetworkPersonalisationPin,
            41 => Self::NetworkPersonalisationPuk,
            _ => Self::Unknown,
        }
    }
}

/// Message-service errors, 3GPP TS 27.005 section 3.2.5.
///
/// 0 -> 127 per 3GPP TS 24.011 clause E.2, 128 -> 255 per 3GPP TS 23.040
/// clause 9.2.3.22.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum CmsError {
    MeFailure = 300,
    SmsServiceReserved = 301,
    NotAllowed = 302,
    NotSupported = 303,
    InvalidPduParameter = 304,
    InvalidTextParameter = 305,
    SimNotInserted = 310,
    SimPin = 311,
    PhSimPin = 312,
    SimFailure = 313,
    SimBusy = 314,
    SimWrong = 315,
    SimPuk = 316,
    SimPin2 = 317,
    SimPuk2 = 318,
    MemoryFailure = 320,
    InvalidIndex = 321,
    MemoryFull = 322,
    SmscAddressUnknown = 330,
    NoNetwork = 331,
    NetworkTimeout = 332,
    NoCnmaAckExpected = 340,
    Unknown = 500,
}

impl From<u16> for CmsError {
    fn from(v: u16) -> Self {
        match v {
            300 => Self::MeFailure,
            301 => Self::SmsServiceReserved,
            302 => Self::NotAllowed,
            303 => Self::NotSupported,
            304 => Self::InvalidPduParameter,
            305 => Self::InvalidTextParameter,
            310 => Self::SimNotInserted,
            311 => Self::SimPin,
            312 => Self::PhSimPin,
            313 => Self::SimFailure,
            314 => Self::SimBusy,
            315 => Self::SimWrong,
            316 => Self::SimPuk,
            317 => Self::SimPin2,
            318 => Self::SimPuk2,
            320 => Self::MemoryFailure,
            321 => Self::InvalidIndex,
            322 => Self::MemoryFull,
            330 => Self::SmscAddressUnknown,
            331 => Self::NoNetwork,
            332 => Self::NetworkTimeout,
            340 => Self::NoCnmaAckExpected,
            _ => Self::Unknown,
        }
    }
}
