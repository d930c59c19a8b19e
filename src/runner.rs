//! Background engine driving the modem conversation.
//!
//! The engine is one task that owns both directions of the serial link.
//! It waits on the command mailbox and on incoming bytes at the same
//! time; while a command is in flight it only pumps the serial side, so
//! commands execute strictly in enqueue order and a response can never
//! interleave with the wrong command. URC lines are digested whenever
//! they arrive and never touch the in-flight slot.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use embedded_io_async::{Read, Write};
use heapless::{String, Vec};

use crate::client::Modem;
use crate::command::{Command, CommandQueue, Request};
use crate::config::{CMD_BUF_LEN, LINE_BUF_LEN, MAX_SMS_TEXT_LEN};
use crate::error::Error;
use crate::events::EventChannel;
use crate::parse::response::{self, Context};
use crate::parse::Cursor;
use crate::state::{Shared, SharedState, State};

pub(crate) type Done = Signal<CriticalSectionRawMutex, Result<Request, Error>>;

/// Storage shared between the [`Modem`] handle and its [`Runner`].
///
/// Typically placed in a `static` (e.g. via `static_cell`) and split with
/// [`new`].
pub struct Resources {
    pub(crate) state: State,
    pub(crate) commands: CommandQueue,
    pub(crate) events: EventChannel,
    pub(crate) done: Done,
    pub(crate) gate: Mutex<CriticalSectionRawMutex, ()>,
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

impl Resources {
    pub fn new() -> Self {
        Self {
            state: State::new(),
            commands: CommandQueue::new(),
            events: EventChannel::new(),
            done: Signal::new(),
            gate: Mutex::new(()),
        }
    }
}

/// Split the resources into the caller-facing handle and the engine.
///
/// `run()` the returned [`Runner`] in a background task for the handle to
/// make any progress.
pub fn new<'a, R: Read, W: Write>(
    resources: &'a Resources,
    reader: R,
    writer: W,
) -> (Modem<'a>, Runner<'a, R, W>) {
    let modem = Modem::new(resources);
    let runner = Runner {
        shared: resources.state.handle(),
        commands: &resources.commands,
        events: &resources.events,
        done: &resources.done,
        reader,
        writer,
        line: Vec::new(),
        scan_cmd: false,
        scan_match: 0,
        scan_active: false,
        sms_prompt_pending: false,
    };
    (modem, runner)
}

/// Adapter joining separate read and write halves into one duplex pair.
pub struct ReadWriteAdapter<R, W>(pub R, pub W);

impl<R, W> embedded_io_async::ErrorType for ReadWriteAdapter<R, W> {
    type Error = embedded_io_async::ErrorKind;
}

impl<R: Read, W> Read for ReadWriteAdapter<R, W> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        use embedded_io_async::Error as _;
        self.0.read(buf).await.map_err(|e| e.kind())
    }
}

impl<R, W: Write> Write for ReadWriteAdapter<R, W> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        use embedded_io_async::Error as _;
        self.1.write(buf).await.map_err(|e| e.kind())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        use embedded_io_async::Error as _;
        self.1.flush().await.map_err(|e| e.kind())
    }
}

/// What one ingested chunk asks the engine to do next.
enum Action {
    None,
    /// A terminal result code ended the in-flight command.
    Terminal(Result<(), Error>),
    /// The `>` prompt arrived, the SMS body may go out.
    SendSmsBody,
}

/// Background engine. Owns the serial link and all state mutation.
pub struct Runner<'a, R: Read, W: Write> {
    shared: SharedState<'a>,
    commands: &'a CommandQueue,
    events: &'a EventChannel,
    done: &'a Done,
    reader: R,
    writer: W,
    line: Vec<u8, LINE_BUF_LEN>,
    /// An operator scan is in flight; watch for its streamed payload.
    scan_cmd: bool,
    /// Bytes of the `+COPS: ` header matched on the current line.
    scan_match: usize,
    /// Header matched; payload bytes stream into the scan machine.
    scan_active: bool,
    /// `AT+CMGS` waits for the `>` prompt.
    sms_prompt_pending: bool,
}

const SCAN_HEADER: &[u8] = b"+COPS: ";
const CTRL_Z: u8 = 0x1A;

impl<'a, R: Read, W: Write> Runner<'a, R, W> {
    pub async fn run(mut self) -> ! {
        let mut buf = [0u8; 32];
        loop {
            match select(self.commands.receive(), self.reader.read(&mut buf)).await {
                Either::First(command) => self.execute(command).await,
                Either::Second(Ok(n)) => {
                    // A terminal or prompt without a command in flight is
                    // stale output of a timed-out command; drop it.
                    if !matches!(self.ingest(&buf[..n]), Action::None) {
                        debug!("discarding stale terminal line");
                    }
                }
                Either::Second(Err(_)) => warn!("serial read error while idle"),
            }
        }
    }

    /// Run a single command to its terminal result code or deadline.
    async fn execute(&mut self, command: Command) {
        let Command { request, notify } = command;
        let deadline = Instant::now() + request.timeout();
        self.scan_cmd = matches!(request, Request::OperatorScan { .. });
        self.scan_match = 0;
        self.scan_active = false;
        self.sms_prompt_pending = matches!(request, Request::SmsSend { .. });

        let mut cmd: String<CMD_BUF_LEN> = String::new();
        let result = match request.write_at(&mut cmd) {
            Ok(()) => {
                self.shared.install(request);
                debug!("--> {}", cmd.as_str());
                match self.send_line(cmd.as_bytes()).await {
                    Ok(()) => self.pump(deadline).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        // Clearing the slot also invalidates any late response lines.
        let completed = self.shared.take_slot();
        self.scan_cmd = false;
        self.scan_active = false;
        self.sms_prompt_pending = false;

        if notify {
            match result.and(completed.ok_or(Error::Parameter)) {
                Ok(request) => self.done.signal(Ok(request)),
                Err(e) => self.done.signal(Err(e)),
            }
        }
    }

    async fn send_line(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(|_| Error::Serial)?;
        self.writer
            .write_all(b"\r\n")
            .await
            .map_err(|_| Error::Serial)?;
        self.writer.flush().await.map_err(|_| Error::Serial)
    }

    /// Pump serial lines until the in-flight command resolves.
    async fn pump(&mut self, deadline: Instant) -> Result<(), Error> {
        let mut buf = [0u8; 32];
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Err(Error::Timeout);
            };
            match embassy_time::with_timeout(remaining, self.reader.read(&mut buf)).await {
                Err(_) => return Err(Error::Timeout),
                Ok(Err(_)) | Ok(Ok(0)) => return Err(Error::Serial),
                Ok(Ok(n)) => match self.ingest(&buf[..n]) {
                    Action::None => {}
                    Action::Terminal(result) => return result,
                    Action::SendSmsBody => self.send_sms_body().await?,
                },
            }
        }
    }

    /// Write the SMS body followed by CTRL-Z once the prompt arrived.
    async fn send_sms_body(&mut self) -> Result<(), Error> {
        let text = self.shared.with(|shared| match &shared.slot {
            Some(Request::SmsSend { text, .. }) => Some(text.clone()),
            _ => None,
        });
        if let Some(text) = text {
            debug!("--> <{} byte sms body>", text.len());
            self.writer
                .write_all(text.as_bytes())
                .await
                .map_err(|_| Error::Serial)?;
            self.writer
                .write_all(&[CTRL_Z])
                .await
                .map_err(|_| Error::Serial)?;
            self.writer.flush().await.map_err(|_| Error::Serial)?;
        }
        Ok(())
    }

    fn ingest(&mut self, bytes: &[u8]) -> Action {
        let mut action = Action::None;
        for &b in bytes {
            match self.push_byte(b) {
                Action::None => {}
                a => action = a,
            }
        }
        action
    }

    fn push_byte(&mut self, b: u8) -> Action {
        // The scan payload may outgrow any line buffer; once its header
        // matched, bytes stream straight into the byte machine, which
        // keeps state across read chunks.
        if self.scan_active {
            if b == b'\r' || b == b'\n' {
                self.scan_active = false;
            } else {
                self.shared.with(|shared| {
                    if let Some(Request::OperatorScan { scan }) = &mut shared.slot {
                        scan.feed(b);
                    }
                });
            }
            return Action::None;
        }
        if self.scan_cmd && self.line.is_empty() && self.scan_match < SCAN_HEADER.len() {
            if b == SCAN_HEADER[self.scan_match] {
                self.scan_match += 1;
                if self.scan_match == SCAN_HEADER.len() {
                    self.scan_match = 0;
                    self.scan_active = true;
                }
                return Action::None;
            }
            if self.scan_match > 0 {
                // False start: replay the swallowed header bytes.
                for i in 0..self.scan_match {
                    let _ = self.line.push(SCAN_HEADER[i]);
                }
                self.scan_match = 0;
            }
        }

        match b {
            b'\r' | b'\n' => {
                if self.line.iter().any(|b| !b.is_ascii_whitespace()) {
                    return self.dispatch_line();
                }
                self.line.clear();
                Action::None
            }
            b'>' if self.line.is_empty() && self.sms_prompt_pending => {
                self.sms_prompt_pending = false;
                Action::SendSmsBody
            }
            _ => {
                if self.line.push(b).is_err() {
                    warn!("line buffer overflow, byte dropped");
                }
                Action::None
            }
        }
    }

    /// Classify and digest one complete line.
    fn dispatch_line(&mut self) -> Action {
        let line = core::mem::take(&mut self.line);
        let bytes = line.as_slice().trim_ascii();
        trace!("<-- {}", core::str::from_utf8(bytes).unwrap_or("<binary>"));

        if bytes == b"OK" {
            return Action::Terminal(Ok(()));
        }
        if bytes == b"ERROR" {
            return Action::Terminal(Err(Error::Modem));
        }
        if let Some(rest) = bytes.strip_prefix(b"+CME ERROR:") {
            let code = Cursor::new(rest).number() as u16;
            return Action::Terminal(Err(Error::Cme(code.into())));
        }
        if let Some(rest) = bytes.strip_prefix(b"+CMS ERROR:") {
            let code = Cursor::new(rest).number() as u16;
            return Action::Terminal(Err(Error::Cms(code.into())));
        }
        if matches!(
            bytes,
            b"NO CARRIER" | b"BUSY" | b"NO ANSWER" | b"NO DIALTONE"
        ) {
            // Terminal for a dial attempt, otherwise a call-state hint the
            // next +CLCC will cover.
            if self
                .shared
                .with(|shared| matches!(shared.slot, Some(Request::CallDial { .. })))
            {
                return Action::Terminal(Err(Error::Modem));
            }
            debug!("call result line outside dial, ignored");
            return Action::None;
        }

        let events = self.events;
        let commands = self.commands;
        let consumed = self.shared.with(|shared| {
            let ctx = Context { events, commands };
            if bytes.starts_with(b"+CREG") {
                let skip_first = matches!(shared.slot, Some(Request::RegistrationGet));
                response::creg(shared, bytes, skip_first, &ctx);
                true
            } else if bytes.starts_with(b"+CPIN") {
                response::cpin(shared, bytes, true, &ctx);
                true
            } else if bytes.starts_with(b"+COPS") {
                response::cops(shared, bytes);
                true
            } else if bytes.starts_with(b"+CLCC") {
                response::clcc(shared, bytes, true, &ctx);
                true
            } else if bytes.starts_with(b"+CMGS") {
                response::cmgs(shared, bytes, true, &ctx);
                true
            } else if bytes.starts_with(b"+CMGR") {
                response::cmgr(shared, bytes)
            } else if bytes.starts_with(b"+CMGL") {
                response::cmgl(shared, bytes)
            } else if bytes.starts_with(b"+CMTI") {
                response::cmti(bytes, &ctx);
                true
            } else if bytes.starts_with(b"+CPMS") {
                response::cpms(shared, bytes)
            } else if bytes.starts_with(b"+CPBS") {
                response::cpbs(shared, bytes)
            } else if bytes.starts_with(b"+CPBR") || bytes.starts_with(b"+CPBF") {
                response::cpbr(shared, bytes)
            } else {
                data_line(shared, bytes)
            }
        });
        if !consumed {
            debug!("line not consumed, discarded");
        }
        Action::None
    }
}

/// Non-response lines: SMS bodies and bare informational payloads.
fn data_line(shared: &mut Shared, bytes: &[u8]) -> bool {
    match &mut shared.slot {
        Some(Request::SmsRead {
            entry,
            awaiting_body,
            ..
        }) if *awaiting_body => {
            append_body(&mut entry.text, bytes);
            true
        }
        Some(Request::SmsList {
            entries,
            awaiting_body,
            ..
        }) if *awaiting_body => match entries.last_mut() {
            Some(entry) => {
                append_body(&mut entry.text, bytes);
                true
            }
            None => false,
        },
        Some(Request::CcidGet { ccid }) => {
            let mut cur = Cursor::new(bytes);
            cur.skip_response_prefix();
            cur.read_string(ccid, true);
            true
        }
        _ => false,
    }
}

/// Message bodies may span lines; later lines are appended with `\n`.
fn append_body(text: &mut String<MAX_SMS_TEXT_LEN>, bytes: &[u8]) {
    if !text.is_empty() {
        let _ = text.push('\n');
    }
    for &b in bytes {
        let _ = text.push(b as char);
    }
}
