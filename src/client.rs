//! Caller-facing modem handle.
//!
//! Every operation builds a command descriptor, queues it for the engine
//! and waits for completion. Callers serialize through an async gate, so
//! the completion signal always belongs to the command just sent; the
//! engine itself never blocks on a caller.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use heapless::{String, Vec};

use crate::command::{Command, CommandQueue, Request};
use crate::config::{MAX_CCID_LEN, MAX_PHONEBOOK_ENTRIES, MAX_SCAN_OPERATORS, MAX_SMS_ENTRIES};
use crate::error::Error;
use crate::events::{EventChannel, EventSubscription};
use crate::parse::scan::OperatorScan;
use crate::runner::{Done, Resources};
use crate::state::{DeviceState, SharedState, SMS_MEM_OPERATION};
use crate::types::{
    CallInfo, MemoryKind, NumberType, Operator, OperatorFormat, OperatorMode, PhonebookEntry,
    RegistrationStatus, ScanOperator, SimState, SmsEntry, SmsStatus,
};

/// Handle used by application tasks to drive the modem.
///
/// Cheap to copy; all clones funnel into the same engine.
#[derive(Clone, Copy)]
pub struct Modem<'a> {
    shared: SharedState<'a>,
    commands: &'a CommandQueue,
    events: &'a EventChannel,
    done: &'a Done,
    gate: &'a Mutex<CriticalSectionRawMutex, ()>,
}

impl<'a> Modem<'a> {
    pub(crate) fn new(resources: &'a Resources) -> Self {
        Self {
            shared: resources.state.handle(),
            commands: &resources.commands,
            events: &resources.events,
            done: &resources.done,
            gate: &resources.gate,
        }
    }

    /// Queue one command and wait for its completed descriptor.
    async fn run(&self, request: Request) -> Result<Request, Error> {
        let _gate = self.gate.lock().await;
        self.done.reset();
        self.commands
            .try_send(Command {
                request,
                notify: true,
            })
            .map_err(|_| Error::Busy)?;
        self.done.wait().await
    }

    async fn run_unit(&self, request: Request) -> Result<(), Error> {
        self.run(request).await.map(|_| ())
    }

    /// Bring the modem to the driver's baseline configuration: verified
    /// presence, echo off, numeric errors, SMS text mode, registration
    /// URCs on.
    pub async fn init(&self) -> Result<(), Error> {
        self.ping().await?;
        self.run_unit(Request::EchoOff).await?;
        self.run_unit(Request::NumericErrors).await?;
        self.run_unit(Request::TextMode { enable: true }).await?;
        self.registration_urc(true).await
    }

    /// `AT`: is anybody there?
    pub async fn ping(&self) -> Result<(), Error> {
        self.run_unit(Request::Ping).await
    }

    /// Subscribe to driver events (SIM, registration, calls, SMS).
    pub fn subscribe(&self) -> Result<EventSubscription<'a>, Error> {
        self.events.subscribe()
    }

    /// Latest known device state, without talking to the modem.
    pub fn state(&self) -> DeviceState {
        self.shared.snapshot()
    }

    // --- Network service ---

    /// Query the CS registration status via `AT+CREG?`.
    pub async fn registration_status(&self) -> Result<RegistrationStatus, Error> {
        self.run_unit(Request::RegistrationGet).await?;
        Ok(self.shared.registration_status())
    }

    /// Enable or disable the `+CREG` URC.
    pub async fn registration_urc(&self, enable: bool) -> Result<(), Error> {
        self.run_unit(Request::RegistrationUrc { enable }).await
    }

    /// Currently selected operator, as last parsed. Use
    /// [`operator_get`](Self::operator_get) to refresh from the modem.
    pub fn operator(&self) -> Operator {
        self.shared.operator()
    }

    /// `AT+COPS?`: ask the modem for the selected operator.
    pub async fn operator_get(&self) -> Result<Operator, Error> {
        match self
            .run(Request::OperatorGet {
                operator: Operator::default(),
            })
            .await?
        {
            Request::OperatorGet { operator } => Ok(operator),
            _ => Err(Error::Parameter),
        }
    }

    /// `AT+COPS=?`: scan for available networks. Slow; plan for minutes.
    pub async fn operator_scan(&self) -> Result<Vec<ScanOperator, MAX_SCAN_OPERATORS>, Error> {
        match self
            .run(Request::OperatorScan {
                scan: OperatorScan::new(MAX_SCAN_OPERATORS),
            })
            .await?
        {
            Request::OperatorScan { scan } => Ok(scan.into_operators()),
            _ => Err(Error::Parameter),
        }
    }

    /// `AT+COPS=`: select an operator. With `OperatorFormat::Number` the
    /// numeric `code` is used, with the name formats `name`, and with
    /// `OperatorFormat::Invalid` only the mode is sent (e.g. automatic
    /// selection or deregistration).
    pub async fn operator_set(
        &self,
        mode: OperatorMode,
        format: OperatorFormat,
        name: &str,
        code: u32,
    ) -> Result<(), Error> {
        let name = String::try_from(name).map_err(|_| Error::Parameter)?;
        self.run_unit(Request::OperatorSet {
            mode,
            format,
            name,
            code,
        })
        .await
    }

    // --- SIM ---

    /// SIM state as last reported. Use [`sim_status`](Self::sim_status)
    /// to refresh.
    pub fn sim_state(&self) -> SimState {
        self.shared.sim_state()
    }

    /// `AT+CPIN?`: query the SIM state.
    pub async fn sim_status(&self) -> Result<SimState, Error> {
        self.run_unit(Request::SimStatusGet).await?;
        Ok(self.shared.sim_state())
    }

    /// `AT+CPIN=<pin>`: unlock the SIM.
    pub async fn pin_enter(&self, pin: &str) -> Result<(), Error> {
        if pin.is_empty() {
            return Err(Error::Parameter);
        }
        let pin = String::try_from(pin).map_err(|_| Error::Parameter)?;
        self.run_unit(Request::PinEnter { pin }).await
    }

    /// `AT+CPIN=<puk>,<newpin>`: unblock the SIM and set a new PIN.
    pub async fn puk_enter(&self, puk: &str, new_pin: &str) -> Result<(), Error> {
        if puk.is_empty() || new_pin.is_empty() {
            return Err(Error::Parameter);
        }
        let puk = String::try_from(puk).map_err(|_| Error::Parameter)?;
        let pin = String::try_from(new_pin).map_err(|_| Error::Parameter)?;
        self.run_unit(Request::PukEnter { puk, pin }).await
    }

    /// `AT+CCID`: ICCID of the inserted card.
    pub async fn ccid(&self) -> Result<String<MAX_CCID_LEN>, Error> {
        match self.run(Request::CcidGet { ccid: String::new() }).await? {
            Request::CcidGet { ccid } => Ok(ccid),
            _ => Err(Error::Parameter),
        }
    }

    // --- Calls ---

    /// `ATD<number>;`: originate a voice call.
    pub async fn call_dial(&self, number: &str) -> Result<(), Error> {
        let number = valid_number(number)?;
        self.run_unit(Request::CallDial { number }).await
    }

    /// `ATA`: answer an incoming call.
    pub async fn call_answer(&self) -> Result<(), Error> {
        self.run_unit(Request::CallAnswer).await
    }

    /// `ATH`: hang up.
    pub async fn call_hangup(&self) -> Result<(), Error> {
        self.run_unit(Request::CallHangup).await
    }

    /// `AT+CLCC`: refresh and return the current call record.
    pub async fn call_status(&self) -> Result<CallInfo, Error> {
        self.run_unit(Request::CallStatus).await?;
        Ok(self.shared.call())
    }

    // --- SMS ---

    /// Send a text-mode message; returns the service-centre reference.
    pub async fn sms_send(&self, number: &str, text: &str) -> Result<u16, Error> {
        let number = valid_number(number)?;
        let text = String::try_from(text).map_err(|_| Error::Parameter)?;
        match self
            .run(Request::SmsSend {
                number,
                text,
                reference: 0,
            })
            .await?
        {
            Request::SmsSend { reference, .. } => Ok(reference),
            _ => Err(Error::Parameter),
        }
    }

    /// `AT+CMGR=<index>`: read one message from the operation storage.
    pub async fn sms_read(&self, pos: u16) -> Result<SmsEntry, Error> {
        match self
            .run(Request::SmsRead {
                pos,
                entry: SmsEntry::default(),
                awaiting_body: false,
            })
            .await?
        {
            Request::SmsRead { entry, .. } => Ok(entry),
            _ => Err(Error::Parameter),
        }
    }

    /// `AT+CMGL=<stat>`: list messages in the operation storage.
    pub async fn sms_list(
        &self,
        status: SmsStatus,
    ) -> Result<Vec<SmsEntry, MAX_SMS_ENTRIES>, Error> {
        let mem = self
            .shared
            .device(|d| d.sms_mem[SMS_MEM_OPERATION].current);
        match self
            .run(Request::SmsList {
                status,
                mem,
                entries: Vec::new(),
                awaiting_body: false,
            })
            .await?
        {
            Request::SmsList { entries, .. } => Ok(entries),
            _ => Err(Error::Parameter),
        }
    }

    /// `AT+CMGD=<index>`: delete one stored message.
    pub async fn sms_delete(&self, pos: u16) -> Result<(), Error> {
        self.run_unit(Request::SmsDelete { pos }).await
    }

    /// `AT+CPMS?`: refresh storage occupancy for all three slots.
    pub async fn sms_memory_status(&self) -> Result<(), Error> {
        self.run_unit(Request::SmsMemoryGet).await
    }

    /// `AT+CPMS=?`: refresh which storages the modem offers.
    pub async fn sms_memory_options(&self) -> Result<(), Error> {
        self.run_unit(Request::SmsMemoryQuery).await
    }

    /// `AT+CPMS=`: select operation, receive and sent storages.
    pub async fn sms_memory_set(&self, mems: [MemoryKind; 3]) -> Result<(), Error> {
        if mems.iter().any(|m| *m == MemoryKind::Unknown) {
            return Err(Error::Parameter);
        }
        self.run_unit(Request::SmsMemorySet { mems }).await
    }

    // --- Phonebook ---

    /// `AT+CPBS?`: refresh phonebook storage occupancy.
    pub async fn phonebook_memory_status(&self) -> Result<(), Error> {
        self.run_unit(Request::PhonebookMemoryGet).await
    }

    /// `AT+CPBS=?`: refresh which phonebook storages exist.
    pub async fn phonebook_memory_options(&self) -> Result<(), Error> {
        self.run_unit(Request::PhonebookMemoryQuery).await
    }

    /// `AT+CPBS=`: select the phonebook storage.
    pub async fn phonebook_memory_set(&self, mem: MemoryKind) -> Result<(), Error> {
        if mem == MemoryKind::Unknown {
            return Err(Error::Parameter);
        }
        self.run_unit(Request::PhonebookMemorySet { mem }).await
    }

    /// `AT+CPBR=<from>,<to>`: read a phonebook range.
    pub async fn phonebook_read(
        &self,
        start: u16,
        end: u16,
    ) -> Result<Vec<PhonebookEntry, MAX_PHONEBOOK_ENTRIES>, Error> {
        if start == 0 || end < start {
            return Err(Error::Parameter);
        }
        match self
            .run(Request::PhonebookRead {
                start,
                end,
                entries: Vec::new(),
            })
            .await?
        {
            Request::PhonebookRead { entries, .. } => Ok(entries),
            _ => Err(Error::Parameter),
        }
    }

    /// `AT+CPBF="<text>"`: find phonebook entries by name prefix.
    pub async fn phonebook_find(
        &self,
        search: &str,
    ) -> Result<Vec<PhonebookEntry, MAX_PHONEBOOK_ENTRIES>, Error> {
        if search.is_empty() {
            return Err(Error::Parameter);
        }
        let search = String::try_from(search).map_err(|_| Error::Parameter)?;
        match self
            .run(Request::PhonebookFind {
                search,
                entries: Vec::new(),
            })
            .await?
        {
            Request::PhonebookFind { entries, .. } => Ok(entries),
            _ => Err(Error::Parameter),
        }
    }

    /// `AT+CPBW`: write an entry; `pos: None` picks the first free index.
    pub async fn phonebook_write(
        &self,
        pos: Option<u16>,
        number: &str,
        number_type: NumberType,
        name: &str,
    ) -> Result<(), Error> {
        let number = valid_number(number)?;
        let name = String::try_from(name).map_err(|_| Error::Parameter)?;
        self.run_unit(Request::PhonebookWrite {
            pos,
            number,
            number_type,
            name,
        })
        .await
    }
}

/// Dialable characters only, and short enough for the buffers.
fn valid_number<const N: usize>(number: &str) -> Result<String<N>, Error> {
    if number.is_empty()
        || !number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '*' | '#'))
    {
        return Err(Error::Parameter);
    }
    String::try_from(number).map_err(|_| Error::Parameter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_validation() {
        assert!(valid_number::<26>("+4512345678").is_ok());
        assert!(valid_number::<26>("*100#").is_ok());
        assert!(valid_number::<26>("").is_err());
        assert!(valid_number::<26>("call me").is_err());
        assert!(valid_number::<8>("123456789").is_err());
    }
}
