//! Command descriptors and their AT wire form.
//!
//! One [`Request`] variant per modem operation, following 3GPP TS 27.007
//! (network, SIM, call, phonebook) and 3GPP TS 27.005 (SMS, text mode).
//! A descriptor travels from the caller through the mailbox into the
//! engine's in-flight slot, owns the buffers its response fills, and is
//! handed back to the caller on completion.

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Duration;
use heapless::{String, Vec};

use crate::config::{
    CMD_BUF_LEN, CMD_TIMEOUT, COMMAND_QUEUE_LEN, MAX_CCID_LEN, MAX_NAME_LEN, MAX_NUMBER_LEN,
    MAX_OPERATOR_LONG_LEN, MAX_PHONEBOOK_ENTRIES, MAX_PIN_LEN, MAX_SMS_ENTRIES, MAX_SMS_TEXT_LEN,
    NETWORK_TIMEOUT, SCAN_TIMEOUT, SIM_TIMEOUT,
};
use crate::error::Error;
use crate::parse::scan::OperatorScan;
use crate::types::{
    MemoryKind, NumberType, Operator, OperatorFormat, OperatorMode, PhonebookEntry, SmsEntry,
    SmsStatus,
};

/// Mailbox entry: a request plus whether a caller waits on completion.
///
/// Internally enqueued follow-up commands (operator refresh after a
/// registration change, SIM info after PIN acceptance) do not notify.
pub(crate) struct Command {
    pub request: Request,
    pub notify: bool,
}

/// Mailbox between caller tasks and the engine.
pub(crate) type CommandQueue = Channel<CriticalSectionRawMutex, Command, COMMAND_QUEUE_LEN>;

/// In-flight command descriptor.
///
/// Variants that expect structured answers own their result buffers and
/// progress counters, so a response parser can refuse a line whenever the
/// slot does not hold the matching variant.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// `AT` liveness probe.
    Ping,
    /// `ATE0`: command echo off, the dispatcher never sees its own bytes.
    EchoOff,
    /// 9.1 `AT+CMEE=1`: numeric `+CME ERROR` result codes.
    NumericErrors,
    /// 27.005 3.2.3 `AT+CMGF`: SMS text mode on/off.
    TextMode { enable: bool },
    /// 7.2 `AT+CREG=<n>`: registration URC on/off.
    RegistrationUrc { enable: bool },
    /// 7.2 `AT+CREG?`: query registration status.
    RegistrationGet,
    /// 7.3 `AT+COPS?`: query the selected operator.
    OperatorGet { operator: Operator },
    /// 7.3 `AT+COPS=?`: scan for available networks. The byte machine is
    /// the scan state; building the descriptor is the reset.
    OperatorScan { scan: OperatorScan },
    /// 7.3 `AT+COPS=<mode>[,<format>,<oper>]`: select an operator.
    OperatorSet {
        mode: OperatorMode,
        format: OperatorFormat,
        name: String<MAX_OPERATOR_LONG_LEN>,
        code: u32,
    },
    /// 8.3 `AT+CPIN?`: SIM state.
    SimStatusGet,
    /// 8.3 `AT+CPIN=<pin>`.
    PinEnter { pin: String<MAX_PIN_LEN> },
    /// 8.3 `AT+CPIN=<puk>,<newpin>`.
    PukEnter {
        puk: String<MAX_PIN_LEN>,
        pin: String<MAX_PIN_LEN>,
    },
    /// `AT+CCID`: ICCID of the inserted card.
    CcidGet { ccid: String<MAX_CCID_LEN> },
    /// V.250 `ATD<number>;`: originate a voice call.
    CallDial { number: String<MAX_NUMBER_LEN> },
    /// V.250 `ATA`: answer.
    CallAnswer,
    /// V.250 `ATH`: hang up.
    CallHangup,
    /// 7.18 `AT+CLCC`: list current calls.
    CallStatus,
    /// 27.005 3.5.1 `AT+CMGS="<da>"`: send a message. The body follows
    /// the `>` prompt, terminated by CTRL-Z.
    SmsSend {
        number: String<MAX_NUMBER_LEN>,
        text: String<MAX_SMS_TEXT_LEN>,
        /// Message reference assigned by the service centre.
        reference: u16,
    },
    /// 27.005 3.4.3 `AT+CMGR=<index>`: read one stored message.
    SmsRead {
        pos: u16,
        entry: SmsEntry,
        /// Header line seen, the next data line is the body.
        awaiting_body: bool,
    },
    /// 27.005 3.4.2 `AT+CMGL=<stat>`: list stored messages.
    SmsList {
        status: SmsStatus,
        /// Storage the listing runs on, copied into every entry.
        mem: MemoryKind,
        entries: Vec<SmsEntry, MAX_SMS_ENTRIES>,
        awaiting_body: bool,
    },
    /// 27.005 3.5.4 `AT+CMGD=<index>`.
    SmsDelete { pos: u16 },
    /// 27.005 3.2.2 `AT+CPMS?`: current storages and occupancy.
    SmsMemoryGet,
    /// 27.005 3.2.2 `AT+CPMS=?`: storages the modem offers.
    SmsMemoryQuery,
    /// 27.005 3.2.2 `AT+CPMS=<mem1>,<mem2>,<mem3>`.
    SmsMemorySet { mems: [MemoryKind; 3] },
    /// 8.11 `AT+CPBS?`.
    PhonebookMemoryGet,
    /// 8.11 `AT+CPBS=?`.
    PhonebookMemoryQuery,
    /// 8.11 `AT+CPBS=<storage>`.
    PhonebookMemorySet { mem: MemoryKind },
    /// 8.12 `AT+CPBR=<index1>,<index2>`.
    PhonebookRead {
        start: u16,
        end: u16,
        entries: Vec<PhonebookEntry, MAX_PHONEBOOK_ENTRIES>,
    },
    /// 8.13 `AT+CPBF="<findtext>"`.
    PhonebookFind {
        search: String<MAX_NAME_LEN>,
        entries: Vec<PhonebookEntry, MAX_PHONEBOOK_ENTRIES>,
    },
    /// 8.14 `AT+CPBW=[<index>],<number>,<type>,<text>`.
    PhonebookWrite {
        pos: Option<u16>,
        number: String<MAX_NUMBER_LEN>,
        number_type: NumberType,
        name: String<MAX_NAME_LEN>,
    },
}

impl Request {
    /// Render the command line, without the trailing CR.
    pub fn write_at(&self, buf: &mut String<CMD_BUF_LEN>) -> Result<(), Error> {
        buf.clear();
        let res = match self {
            Self::Ping => write!(buf, "AT"),
            Self::EchoOff => write!(buf, "ATE0"),
            Self::NumericErrors => write!(buf, "AT+CMEE=1"),
            Self::TextMode { enable } => write!(buf, "AT+CMGF={}", *enable as u8),
            Self::RegistrationUrc { enable } => write!(buf, "AT+CREG={}", *enable as u8),
            Self::RegistrationGet => write!(buf, "AT+CREG?"),
            Self::OperatorGet { .. } => write!(buf, "AT+COPS?"),
            Self::OperatorScan { .. } => write!(buf, "AT+COPS=?"),
            Self::OperatorSet {
                mode,
                format,
                name,
                code,
            } => match format {
                OperatorFormat::Number => {
                    write!(buf, "AT+COPS={},2,\"{}\"", *mode as u8, code)
                }
                OperatorFormat::Invalid => write!(buf, "AT+COPS={}", *mode as u8),
                _ => write!(buf, "AT+COPS={},{},\"{}\"", *mode as u8, *format as u8, name),
            },
            Self::SimStatusGet => write!(buf, "AT+CPIN?"),
            Self::PinEnter { pin } => write!(buf, "AT+CPIN=\"{}\"", pin),
            Self::PukEnter { puk, pin } => write!(buf, "AT+CPIN=\"{}\",\"{}\"", puk, pin),
            Self::CcidGet { .. } => write!(buf, "AT+CCID"),
            Self::CallDial { number } => write!(buf, "ATD{};", number),
            Self::CallAnswer => write!(buf, "ATA"),
            Self::CallHangup => write!(buf, "ATH"),
            Self::CallStatus => write!(buf, "AT+CLCC"),
            Self::SmsSend { number, .. } => write!(buf, "AT+CMGS=\"{}\"", number),
            Self::SmsRead { pos, .. } => write!(buf, "AT+CMGR={}", pos),
            Self::SmsList { status, .. } => write!(buf, "AT+CMGL=\"{}\"", status.as_token()),
            Self::SmsDelete { pos } => write!(buf, "AT+CMGD={}", pos),
            Self::SmsMemoryGet => write!(buf, "AT+CPMS?"),
            Self::SmsMemoryQuery => write!(buf, "AT+CPMS=?"),
            Self::SmsMemorySet { mems } => write!(
                buf,
                "AT+CPMS=\"{}\",\"{}\",\"{}\"",
                mems[0].token(),
                mems[1].token(),
                mems[2].token()
            ),
            Self::PhonebookMemoryGet => write!(buf, "AT+CPBS?"),
            Self::PhonebookMemoryQuery => write!(buf, "AT+CPBS=?"),
            Self::PhonebookMemorySet { mem } => write!(buf, "AT+CPBS=\"{}\"", mem.token()),
            Self::PhonebookRead { start, end, .. } => {
                write!(buf, "AT+CPBR={},{}", start, end)
            }
            Self::PhonebookFind { search, .. } => write!(buf, "AT+CPBF=\"{}\"", search),
            Self::PhonebookWrite {
                pos,
                number,
                number_type,
                name,
            } => {
                if let Some(pos) = pos {
                    write!(
                        buf,
                        "AT+CPBW={},\"{}\",{},\"{}\"",
                        pos, number, *number_type as u8, name
                    )
                } else {
                    write!(
                        buf,
                        "AT+CPBW=,\"{}\",{},\"{}\"",
                        number, *number_type as u8, name
                    )
                }
            }
        };
        res.map_err(|_| Error::Parameter)
    }

    /// Response deadline for this command.
    pub fn timeout(&self) -> Duration {
        match self {
            Self::OperatorScan { .. } => SCAN_TIMEOUT,
            Self::OperatorSet { .. }
            | Self::SmsSend { .. }
            | Self::CallDial { .. }
            | Self::CallAnswer
            | Self::CallHangup => NETWORK_TIMEOUT,
            Self::PinEnter { .. }
            | Self::PukEnter { .. }
            | Self::SmsRead { .. }
            | Self::SmsList { .. }
            | Self::SmsDelete { .. }
            | Self::PhonebookRead { .. }
            | Self::PhonebookFind { .. }
            | Self::PhonebookWrite { .. } => SIM_TIMEOUT,
            _ => CMD_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(req: Request) -> String<CMD_BUF_LEN> {
        let mut buf = String::new();
        req.write_at(&mut buf).unwrap();
        buf
    }

    #[test]
    fn renders_query_commands() {
        assert_eq!(rendered(Request::Ping).as_str(), "AT");
        assert_eq!(rendered(Request::RegistrationGet).as_str(), "AT+CREG?");
        assert_eq!(
            rendered(Request::OperatorScan {
                scan: OperatorScan::new(4)
            })
            .as_str(),
            "AT+COPS=?"
        );
        assert_eq!(rendered(Request::SmsMemoryQuery).as_str(), "AT+CPMS=?");
    }

    #[test]
    fn renders_operator_selection_by_format() {
        let manual_code = Request::OperatorSet {
            mode: OperatorMode::Manual,
            format: OperatorFormat::Number,
            name: String::new(),
            code: 26201,
        };
        assert_eq!(rendered(manual_code).as_str(), "AT+COPS=1,2,\"26201\"");

        let auto = Request::OperatorSet {
            mode: OperatorMode::Auto,
            format: OperatorFormat::Invalid,
            name: String::new(),
            code: 0,
        };
        assert_eq!(rendered(auto).as_str(), "AT+COPS=0");
    }

    #[test]
    fn renders_sms_and_phonebook_writes() {
        let send = Request::SmsSend {
            number: String::try_from("+4512345678").unwrap(),
            text: String::try_from("hello").unwrap(),
            reference: 0,
        };
        assert_eq!(rendered(send).as_str(), "AT+CMGS=\"+4512345678\"");

        let list = Request::SmsList {
            status: SmsStatus::Unread,
            mem: MemoryKind::Sm,
            entries: Vec::new(),
            awaiting_body: false,
        };
        assert_eq!(rendered(list).as_str(), "AT+CMGL=\"REC UNREAD\"");

        let write = Request::PhonebookWrite {
            pos: None,
            number: String::try_from("112").unwrap(),
            number_type: NumberType::National,
            name: String::try_from("SOS").unwrap(),
        };
        assert_eq!(rendered(write).as_str(), "AT+CPBW=,\"112\",161,\"SOS\"");

        let mems = Request::SmsMemorySet {
            mems: [MemoryKind::Me, MemoryKind::Sm, MemoryKind::Me],
        };
        assert_eq!(rendered(mems).as_str(), "AT+CPMS=\"ME\",\"SM\",\"ME\"");
    }
}
