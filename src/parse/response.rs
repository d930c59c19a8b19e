//! Per-response parsers.
//!
//! Each function digests one solicited or unsolicited line into the shared
//! state, the in-flight request slot and the event channel. Parsers that
//! need caller context (`+CMGL`, `+CPBR`, `+CPBF`, ...) return whether they
//! consumed the line; a refused line is discarded by the dispatcher.

use crate::command::{Command, CommandQueue, Request};
use crate::error::Error;
use crate::events::{Event, EventChannel};
use crate::parse::Cursor;
use crate::state::{Shared, SMS_MEM_OPERATION};
use crate::types::{
    CallDirection, CallInfo, CallState, CallType, MemoryKind, NumberType, Operator,
    OperatorFormat, OperatorMode, OperatorName, PhonebookEntry, RegistrationStatus, SimState,
    SmsEntry,
};

/// Non-blocking surroundings of a parser invocation.
pub(crate) struct Context<'a> {
    pub events: &'a EventChannel,
    pub commands: &'a CommandQueue,
}

impl<'a> Context<'a> {
    /// Enqueue a follow-up command without waiting for room.
    fn enqueue(&self, request: Request) -> Result<(), Error> {
        self.commands
            .try_send(Command {
                request,
                notify: false,
            })
            .map_err(|_| Error::Busy)
    }
}

/// `+CREG: [<n>,]<stat>` registration report, solicited or URC.
///
/// `skip_first` selects the query form, which carries the URC mode `<n>`
/// ahead of `<stat>`. Entering a registered state refreshes the operator
/// via an internally queued `AT+COPS?`.
pub(crate) fn creg(shared: &mut Shared, line: &[u8], skip_first: bool, ctx: &Context) {
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    if skip_first {
        cur.number();
    }
    let status = RegistrationStatus::from(cur.number());
    if shared.device.network.status != status {
        shared.device.network.status = status;
        ctx.events.publish(Event::Registration(status));
    }
    if status.registered() {
        let refresh = Request::OperatorGet {
            operator: Operator::default(),
        };
        if ctx.enqueue(refresh).is_err() {
            warn!("operator refresh deferred, command queue full");
        }
    }
}

/// `+CPIN: <state>` SIM state report.
///
/// A card reporting READY triggers the internally queued SIM info fetch.
pub(crate) fn cpin(shared: &mut Shared, line: &[u8], send_event: bool, ctx: &Context) {
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    let rest = cur.rest();
    let state = if rest.starts_with(b"READY") {
        SimState::Ready
    } else if rest.starts_with(b"NOT READY") {
        SimState::NotReady
    } else if rest.starts_with(b"NOT INSERTED") {
        SimState::NotInserted
    } else if rest.starts_with(b"SIM PIN") {
        SimState::Pin
    } else if rest.starts_with(b"SIM PUK") {
        SimState::Puk
    } else {
        SimState::NotReady
    };
    shared.device.sim = state;
    if state == SimState::Ready
        && ctx
            .enqueue(Request::CcidGet {
                ccid: heapless::String::new(),
            })
            .is_err()
    {
        warn!("SIM info fetch deferred, command queue full");
    }
    if send_event {
        ctx.events.publish(Event::SimState(state));
    }
}

/// `+COPS: <mode>[,<format>,<oper>]` selected-operator answer.
pub(crate) fn cops(shared: &mut Shared, line: &[u8]) {
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    let mut op = Operator {
        mode: OperatorMode::from(cur.number()),
        ..Default::default()
    };
    if !matches!(cur.rest().first(), None | Some(b'\r')) {
        op.format = OperatorFormat::from(cur.number());
        match op.format {
            OperatorFormat::LongName => {
                let mut name = heapless::String::new();
                cur.read_string(&mut name, true);
                op.name = OperatorName::Long(name);
            }
            OperatorFormat::ShortName => {
                let mut name = heapless::String::new();
                cur.read_string(&mut name, true);
                op.name = OperatorName::Short(name);
            }
            OperatorFormat::Number => {
                op.name = OperatorName::Code(cur.number() as u32);
            }
            OperatorFormat::Invalid => {}
        }
    }
    if let Some(Request::OperatorGet { operator }) = &mut shared.slot {
        *operator = op.clone();
    }
    shared.device.network.operator = op;
}

/// `+CLCC: <id>,<dir>,<stat>,<mode>,<mpty>[,<number>,<type>[,<alpha>]]`.
pub(crate) fn clcc(shared: &mut Shared, line: &[u8], send_event: bool, ctx: &Context) {
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    let mut call = CallInfo {
        id: cur.number() as u8,
        direction: CallDirection::from(cur.number()),
        state: CallState::from(cur.number()),
        call_type: CallType::from(cur.number()),
        multiparty: cur.number() != 0,
        ..Default::default()
    };
    cur.read_string(&mut call.number, true);
    call.number_type = NumberType::from(cur.number());
    cur.read_string(&mut call.name, true);
    shared.device.call = call.clone();
    if send_event {
        ctx.events.publish(Event::CallChanged(call));
    }
}

/// `+CMGS: <mr>` message reference of a sent SMS.
pub(crate) fn cmgs(shared: &mut Shared, line: &[u8], send_event: bool, ctx: &Context) {
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    let reference = cur.number() as u16;
    if let Some(Request::SmsSend { reference: slot, .. }) = &mut shared.slot {
        *slot = reference;
    }
    if send_event {
        ctx.events.publish(Event::SmsSent { reference });
    }
}

/// `+CMGR: <stat>,<oa>,[<alpha>],<scts>` single-message header.
pub(crate) fn cmgr(shared: &mut Shared, line: &[u8]) -> bool {
    let mem = shared.device.sms_mem[SMS_MEM_OPERATION].current;
    let Some(Request::SmsRead {
        pos,
        entry,
        awaiting_body,
    }) = &mut shared.slot
    else {
        return false;
    };
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    if let Some(status) = cur.sms_status() {
        entry.status = status;
    }
    cur.read_string(&mut entry.number, true);
    cur.read_string(&mut entry.name, true);
    entry.datetime = cur.datetime();
    entry.mem = mem;
    entry.pos = *pos;
    *awaiting_body = true;
    true
}

/// `+CMGL: <index>,<stat>,<oa>,[<alpha>],[<scts>]` listing header.
///
/// Refused unless a listing is in flight with room left; the body arrives
/// on the following data line.
pub(crate) fn cmgl(shared: &mut Shared, line: &[u8]) -> bool {
    let Some(Request::SmsList {
        mem,
        entries,
        awaiting_body,
        ..
    }) = &mut shared.slot
    else {
        return false;
    };
    if entries.is_full() {
        return false;
    }
    let mut entry = SmsEntry {
        mem: *mem,
        ..Default::default()
    };
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    entry.pos = cur.number() as u16;
    if let Some(status) = cur.sms_status() {
        entry.status = status;
    }
    cur.read_string(&mut entry.number, true);
    cur.read_string(&mut entry.name, true);
    entry.datetime = cur.datetime();
    // Room checked above.
    let _ = entries.push(entry);
    *awaiting_body = true;
    true
}

/// `+CMTI: <mem>,<index>` new-message indication.
pub(crate) fn cmti(line: &[u8], ctx: &Context) {
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    let mem = cur.memory();
    let pos = cur.number() as u16;
    ctx.events.publish(Event::SmsReceived { mem, pos });
}

/// `+CPMS` in its three shapes, told apart by the in-flight request:
/// storage options (`=?`), current occupancy (`?`), and the pair list
/// answering a set.
pub(crate) fn cpms(shared: &mut Shared, line: &[u8]) -> bool {
    enum Mode {
        Options,
        Current,
        Set([MemoryKind; 3]),
    }
    let mode = match &shared.slot {
        Some(Request::SmsMemoryQuery) => Mode::Options,
        Some(Request::SmsMemoryGet) => Mode::Current,
        Some(Request::SmsMemorySet { mems }) => Mode::Set(*mems),
        _ => return false,
    };
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    for i in 0..3 {
        let slot = &mut shared.device.sms_mem[i];
        match &mode {
            Mode::Options => slot.available = cur.memory_list(),
            Mode::Current => {
                slot.current = cur.memory();
                slot.used = cur.number() as u16;
                slot.total = cur.number() as u16;
            }
            Mode::Set(mems) => {
                slot.current = mems[i];
                slot.used = cur.number() as u16;
                slot.total = cur.number() as u16;
            }
        }
    }
    true
}

/// `+CPBS` in the same three shapes as `+CPMS`, for the single phonebook
/// storage.
pub(crate) fn cpbs(shared: &mut Shared, line: &[u8]) -> bool {
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    let pb = &mut shared.device.phonebook_mem;
    match &shared.slot {
        Some(Request::PhonebookMemoryQuery) => {
            pb.available = cur.memory_list();
        }
        Some(Request::PhonebookMemoryGet) => {
            pb.current = cur.memory();
            pb.used = cur.number() as u16;
            pb.total = cur.number() as u16;
        }
        Some(Request::PhonebookMemorySet { mem }) => {
            pb.current = *mem;
            pb.used = cur.number() as u16;
            pb.total = cur.number() as u16;
        }
        _ => return false,
    }
    true
}

/// `+CPBR`/`+CPBF`: `<index>,<number>,<type>,<text>` phonebook records.
pub(crate) fn cpbr(shared: &mut Shared, line: &[u8]) -> bool {
    let (Some(Request::PhonebookRead { entries, .. })
    | Some(Request::PhonebookFind { entries, .. })) = &mut shared.slot
    else {
        return false;
    };
    if entries.is_full() {
        return false;
    }
    let mut entry = PhonebookEntry::default();
    let mut cur = Cursor::new(line);
    cur.skip_response_prefix();
    entry.pos = cur.number() as u16;
    cur.read_string(&mut entry.number, true);
    entry.number_type = NumberType::from(cur.number());
    cur.read_string(&mut entry.name, true);
    // Room checked above.
    let _ = entries.push(entry);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DeviceState, SMS_MEM_RECEIVE, SMS_MEM_SENT};
    use crate::types::{MemorySet, SmsStatus};
    use embassy_sync::pubsub::WaitResult;
    use heapless::{String, Vec};

    fn shared() -> Shared {
        Shared {
            device: DeviceState::default(),
            slot: None,
        }
    }

    fn next_event(sub: &mut crate::events::EventSubscription<'_>) -> Option<Event> {
        match sub.try_next_message() {
            Some(WaitResult::Message(event)) => Some(event),
            _ => None,
        }
    }

    #[test]
    fn creg_query_form_updates_status_and_queues_operator_refresh() {
        let events = EventChannel::new();
        let commands = CommandQueue::new();
        let ctx = Context {
            events: &events,
            commands: &commands,
        };
        let mut sub = events.subscribe().unwrap();
        let mut shared = shared();

        creg(&mut shared, b"+CREG: 0,1\r", true, &ctx);

        assert_eq!(
            shared.device.network.status,
            RegistrationStatus::Registered
        );
        assert_eq!(
            next_event(&mut sub),
            Some(Event::Registration(RegistrationStatus::Registered))
        );
        let queued = commands.try_receive().unwrap();
        assert!(matches!(queued.request, Request::OperatorGet { .. }));
        assert!(!queued.notify);
    }

    #[test]
    fn creg_urc_form_has_no_leading_mode() {
        let events = EventChannel::new();
        let commands = CommandQueue::new();
        let ctx = Context {
            events: &events,
            commands: &commands,
        };
        let mut shared = shared();

        creg(&mut shared, b"+CREG: 2\r", false, &ctx);

        assert_eq!(shared.device.network.status, RegistrationStatus::Searching);
        assert!(commands.try_receive().is_err());
    }

    #[test]
    fn cpin_pin_required_delivers_event() {
        let events = EventChannel::new();
        let commands = CommandQueue::new();
        let ctx = Context {
            events: &events,
            commands: &commands,
        };
        let mut sub = events.subscribe().unwrap();
        let mut shared = shared();

        cpin(&mut shared, b"+CPIN: SIM PIN\r", true, &ctx);

        assert_eq!(shared.device.sim, SimState::Pin);
        assert_eq!(next_event(&mut sub), Some(Event::SimState(SimState::Pin)));
        // Only READY triggers the SIM info fetch.
        assert!(commands.try_receive().is_err());
    }

    #[test]
    fn cpin_ready_queues_sim_info_fetch() {
        let events = EventChannel::new();
        let commands = CommandQueue::new();
        let ctx = Context {
            events: &events,
            commands: &commands,
        };
        let mut shared = shared();

        cpin(&mut shared, b"+CPIN: READY\r", false, &ctx);

        assert_eq!(shared.device.sim, SimState::Ready);
        let queued = commands.try_receive().unwrap();
        assert!(matches!(queued.request, Request::CcidGet { .. }));
    }

    #[test]
    fn cops_long_name_fills_slot_sink() {
        let mut shared = shared();
        shared.slot = Some(Request::OperatorGet {
            operator: Operator::default(),
        });

        cops(&mut shared, b"+COPS: 0,0,\"Operator\"\r");

        let Some(Request::OperatorGet { operator }) = &shared.slot else {
            panic!("slot vanished");
        };
        assert_eq!(operator.mode, OperatorMode::Auto);
        assert_eq!(operator.format, OperatorFormat::LongName);
        assert_eq!(
            operator.name,
            OperatorName::Long(String::try_from("Operator").unwrap())
        );
        assert_eq!(shared.device.network.operator, *operator);
    }

    #[test]
    fn cops_numeric_and_bare_mode() {
        let mut shared = shared();

        cops(&mut shared, b"+COPS: 1,2,\"26202\"\r");
        assert_eq!(
            shared.device.network.operator.name,
            OperatorName::Code(26202)
        );

        cops(&mut shared, b"+COPS: 2\r");
        assert_eq!(shared.device.network.operator.format, OperatorFormat::Invalid);
        assert_eq!(shared.device.network.operator.name, OperatorName::Invalid);
    }

    #[test]
    fn clcc_incoming_call() {
        let events = EventChannel::new();
        let commands = CommandQueue::new();
        let ctx = Context {
            events: &events,
            commands: &commands,
        };
        let mut sub = events.subscribe().unwrap();
        let mut shared = shared();

        clcc(
            &mut shared,
            b"+CLCC: 1,1,4,0,0,\"+4512345678\",145,\"Alice\"\r",
            true,
            &ctx,
        );

        let call = &shared.device.call;
        assert_eq!(call.id, 1);
        assert_eq!(call.direction, CallDirection::MobileTerminated);
        assert_eq!(call.state, CallState::Incoming);
        assert_eq!(call.call_type, CallType::Voice);
        assert!(!call.multiparty);
        assert_eq!(call.number.as_str(), "+4512345678");
        assert_eq!(call.number_type, NumberType::International);
        assert_eq!(call.name.as_str(), "Alice");
        assert!(matches!(next_event(&mut sub), Some(Event::CallChanged(_))));
    }

    #[test]
    fn cmgs_stores_reference_and_notifies() {
        let events = EventChannel::new();
        let commands = CommandQueue::new();
        let ctx = Context {
            events: &events,
            commands: &commands,
        };
        let mut sub = events.subscribe().unwrap();
        let mut shared = shared();
        shared.slot = Some(Request::SmsSend {
            number: String::new(),
            text: String::new(),
            reference: 0,
        });

        cmgs(&mut shared, b"+CMGS: 42\r", true, &ctx);

        assert!(matches!(
            shared.slot,
            Some(Request::SmsSend { reference: 42, .. })
        ));
        assert_eq!(next_event(&mut sub), Some(Event::SmsSent { reference: 42 }));
    }

    #[test]
    fn cmgr_header_fills_entry_and_awaits_body() {
        let mut shared = shared();
        shared.device.sms_mem[SMS_MEM_OPERATION].current = MemoryKind::Me;
        shared.slot = Some(Request::SmsRead {
            pos: 7,
            entry: SmsEntry::default(),
            awaiting_body: false,
        });

        let consumed = cmgr(
            &mut shared,
            b"+CMGR: \"REC UNREAD\",\"+4511223344\",\"Bob\",\"21/07/15,10:20:30+04\"\r",
        );

        assert!(consumed);
        let Some(Request::SmsRead {
            entry,
            awaiting_body,
            ..
        }) = &shared.slot
        else {
            panic!("slot vanished");
        };
        assert!(*awaiting_body);
        assert_eq!(entry.status, SmsStatus::Unread);
        assert_eq!(entry.number.as_str(), "+4511223344");
        assert_eq!(entry.name.as_str(), "Bob");
        assert_eq!(entry.datetime.year, 2015);
        assert_eq!(entry.mem, MemoryKind::Me);
        assert_eq!(entry.pos, 7);
    }

    #[test]
    fn cmgr_without_matching_request_is_refused() {
        let mut shared = shared();
        assert!(!cmgr(&mut shared, b"+CMGR: \"REC READ\",\"1\",,\"\"\r"));
    }

    #[test]
    fn cmgl_appends_entries_until_full() {
        let mut shared = shared();
        let mut entries: Vec<SmsEntry, { crate::config::MAX_SMS_ENTRIES }> = Vec::new();
        for _ in 0..crate::config::MAX_SMS_ENTRIES - 1 {
            entries.push(SmsEntry::default()).unwrap();
        }
        shared.slot = Some(Request::SmsList {
            status: SmsStatus::All,
            mem: MemoryKind::Sm,
            entries,
            awaiting_body: false,
        });

        assert!(cmgl(
            &mut shared,
            b"+CMGL: 3,\"REC READ\",\"+4511223344\",,\"21/07/15,10:20:30\"\r",
        ));
        // Now full; the next header must be refused.
        assert!(!cmgl(
            &mut shared,
            b"+CMGL: 4,\"REC READ\",\"+4511223344\",,\"21/07/15,10:20:30\"\r",
        ));

        let Some(Request::SmsList { entries, .. }) = &shared.slot else {
            panic!("slot vanished");
        };
        let last = entries.last().unwrap();
        assert_eq!(last.pos, 3);
        assert_eq!(last.status, SmsStatus::Read);
        assert_eq!(last.mem, MemoryKind::Sm);
    }

    #[test]
    fn cmgl_without_listing_in_flight_is_refused() {
        let mut shared = shared();
        assert!(!cmgl(&mut shared, b"+CMGL: 1,\"REC READ\",\"1\",,\"\"\r"));
    }

    #[test]
    fn cmti_publishes_reception() {
        let events = EventChannel::new();
        let commands = CommandQueue::new();
        let ctx = Context {
            events: &events,
            commands: &commands,
        };
        let mut sub = events.subscribe().unwrap();

        cmti(b"+CMTI: \"SM\",5\r", &ctx);

        assert_eq!(
            next_event(&mut sub),
            Some(Event::SmsReceived {
                mem: MemoryKind::Sm,
                pos: 5
            })
        );
    }

    #[test]
    fn cpms_current_info_fills_all_three_slots() {
        let mut shared = shared();
        shared.slot = Some(Request::SmsMemoryGet);

        assert!(cpms(
            &mut shared,
            b"+CPMS: \"ME\",10,20,\"SM\",2,10,\"ME\",0,20\r",
        ));

        let mem = &shared.device.sms_mem;
        assert_eq!(
            (mem[SMS_MEM_OPERATION].current, mem[0].used, mem[0].total),
            (MemoryKind::Me, 10, 20)
        );
        assert_eq!(
            (mem[SMS_MEM_RECEIVE].current, mem[1].used, mem[1].total),
            (MemoryKind::Sm, 2, 10)
        );
        assert_eq!(
            (mem[SMS_MEM_SENT].current, mem[2].used, mem[2].total),
            (MemoryKind::Me, 0, 20)
        );
    }

    #[test]
    fn cpms_options_query_collects_bitsets() {
        let mut shared = shared();
        shared.slot = Some(Request::SmsMemoryQuery);

        assert!(cpms(
            &mut shared,
            b"+CPMS: (\"SM\",\"ME\"),(\"SM\"),(\"SM\",\"MT\")\r",
        ));

        let mem = &shared.device.sms_mem;
        let mut expect0 = MemorySet::empty();
        expect0.insert(MemoryKind::Sm);
        expect0.insert(MemoryKind::Me);
        assert_eq!(mem[0].available, expect0);
        assert!(mem[1].available.contains(MemoryKind::Sm));
        assert!(!mem[1].available.contains(MemoryKind::Me));
        assert!(mem[2].available.contains(MemoryKind::Mt));
    }

    #[test]
    fn cpms_set_info_records_requested_storages() {
        let mut shared = shared();
        shared.slot = Some(Request::SmsMemorySet {
            mems: [MemoryKind::Me, MemoryKind::Sm, MemoryKind::Me],
        });

        assert!(cpms(&mut shared, b"+CPMS: 1,20,2,10,3,20\r"));

        let mem = &shared.device.sms_mem;
        assert_eq!(mem[0].current, MemoryKind::Me);
        assert_eq!((mem[0].used, mem[0].total), (1, 20));
        assert_eq!(mem[1].current, MemoryKind::Sm);
        assert_eq!((mem[2].used, mem[2].total), (3, 20));
    }

    #[test]
    fn cpms_without_request_is_refused() {
        let mut shared = shared();
        assert!(!cpms(&mut shared, b"+CPMS: \"ME\",10,20\r"));
    }

    #[test]
    fn cpbs_modes() {
        let mut shared = shared();

        shared.slot = Some(Request::PhonebookMemoryQuery);
        assert!(cpbs(&mut shared, b"+CPBS: (\"SM\",\"ON\")\r"));
        assert!(shared.device.phonebook_mem.available.contains(MemoryKind::On));

        shared.slot = Some(Request::PhonebookMemoryGet);
        assert!(cpbs(&mut shared, b"+CPBS: \"SM\",12,100\r"));
        assert_eq!(shared.device.phonebook_mem.current, MemoryKind::Sm);
        assert_eq!(shared.device.phonebook_mem.used, 12);
        assert_eq!(shared.device.phonebook_mem.total, 100);
    }

    #[test]
    fn cpbr_fills_entries_and_respects_guard() {
        let mut shared = shared();
        assert!(!cpbr(&mut shared, b"+CPBR: 1,\"112\",129,\"SOS\"\r"));

        shared.slot = Some(Request::PhonebookRead {
            start: 1,
            end: 10,
            entries: Vec::new(),
        });
        assert!(cpbr(&mut shared, b"+CPBR: 1,\"+4512345678\",145,\"Alice\"\r"));
        assert!(cpbr(&mut shared, b"+CPBR: 2,\"112\",129,\"SOS\"\r"));

        let Some(Request::PhonebookRead { entries, .. }) = &shared.slot else {
            panic!("slot vanished");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pos, 1);
        assert_eq!(entries[0].number.as_str(), "+4512345678");
        assert_eq!(entries[0].number_type, NumberType::International);
        assert_eq!(entries[0].name.as_str(), "Alice");
        assert_eq!(entries[1].name.as_str(), "SOS");
    }
}
