//! Build-time sizing and timing of the driver.
//!
//! Every bounded buffer in the crate takes its capacity from here, so a
//! port that needs longer operator names or a deeper command queue changes
//! one constant instead of chasing type parameters.

use embassy_time::Duration;

/// Operator long alphanumeric name, `+COPS` format 0.
pub const MAX_OPERATOR_LONG_LEN: usize = 20;
/// Operator short alphanumeric name, `+COPS` format 1.
pub const MAX_OPERATOR_SHORT_LEN: usize = 10;

/// Phone number in any response (`+CLCC`, `+CMGR`, `+CPBR`, ...).
pub const MAX_NUMBER_LEN: usize = 26;
/// Alpha field associated with a number (phonebook name, SMS alpha).
pub const MAX_NAME_LEN: usize = 20;
/// SMS text in text mode, 3GPP TS 23.038 7-bit alphabet.
pub const MAX_SMS_TEXT_LEN: usize = 160;
/// ICCID digits from `+CCID`.
pub const MAX_CCID_LEN: usize = 22;
/// PIN or PUK digits.
pub const MAX_PIN_LEN: usize = 10;

/// Operators retained from a single `+COPS=?` network scan.
pub const MAX_SCAN_OPERATORS: usize = 10;
/// Entries retained from a single `+CMGL` list.
pub const MAX_SMS_ENTRIES: usize = 10;
/// Entries retained from a single `+CPBR`/`+CPBF` read.
pub const MAX_PHONEBOOK_ENTRIES: usize = 10;

/// Received line accumulator, sized for a full text-mode SMS body line.
/// Lines longer than this are only valid for the `+COPS=?` scan, which is
/// parsed byte-wise and never buffered whole.
pub const LINE_BUF_LEN: usize = 256;
/// Outgoing command line, command name plus arguments.
pub const CMD_BUF_LEN: usize = 224;

/// Depth of the command mailbox between callers and the engine.
pub const COMMAND_QUEUE_LEN: usize = 8;
/// Events buffered per subscriber before the oldest is overwritten.
pub const EVENT_QUEUE_LEN: usize = 4;
/// Concurrent event subscribers.
pub const MAX_EVENT_SUBSCRIBERS: usize = 2;

/// Default response deadline for plain set/query commands.
pub const CMD_TIMEOUT: Duration = Duration::from_secs(1);
/// `AT+COPS=?` walks every channel; 3GPP allows minutes.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(120);
/// Network-bound operations (`+COPS=`, `+CMGS`, call control).
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(60);
/// SIM operations can stall on the card (`+CPIN`, `+CPBW`).
pub const SIM_TIMEOUT: Duration = Duration::from_secs(5);
