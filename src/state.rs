//! Shared device state.
//!
//! One modem, one conversation: the driver keeps a single [`DeviceState`]
//! plus the in-flight command slot behind a blocking mutex. The engine
//! task is the only writer; callers take short read locks for snapshots.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::command::Request;
use crate::types::{CallInfo, Operator, PhonebookMemory, RegistrationStatus, SimState, SmsMemory};

/// `+CPMS` storage slot used for read/write/delete operations.
pub const SMS_MEM_OPERATION: usize = 0;
/// Storage slot receiving incoming messages.
pub const SMS_MEM_RECEIVE: usize = 1;
/// Storage slot holding sent and unsent outgoing messages.
pub const SMS_MEM_SENT: usize = 2;

/// Network side of the device state.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkState {
    pub status: RegistrationStatus,
    pub operator: Operator,
}

/// Everything the driver currently knows about the modem.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub sim: SimState,
    pub network: NetworkState,
    /// Most recently reported call.
    pub call: CallInfo,
    /// Message storages, indexed by the `SMS_MEM_*` constants.
    pub sms_mem: [SmsMemory; 3],
    pub phonebook_mem: PhonebookMemory,
}

pub(crate) struct Shared {
    pub device: DeviceState,
    /// Descriptor of the command awaiting its response, if any.
    pub slot: Option<Request>,
}

pub struct State {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Shared>>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Shared {
                device: DeviceState::default(),
                slot: None,
            })),
        }
    }

    pub(crate) fn handle(&self) -> SharedState<'_> {
        SharedState { inner: &self.inner }
    }
}

/// Cheap accessor shared by the engine and the client handle.
#[derive(Clone, Copy)]
pub(crate) struct SharedState<'a> {
    inner: &'a Mutex<CriticalSectionRawMutex, RefCell<Shared>>,
}

impl<'a> SharedState<'a> {
    pub fn with<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn device<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        self.with(|shared| f(&shared.device))
    }

    pub fn install(&self, request: Request) {
        self.with(|shared| shared.slot = Some(request));
    }

    pub fn take_slot(&self) -> Option<Request> {
        self.with(|shared| shared.slot.take())
    }

    pub fn sim_state(&self) -> SimState {
        self.device(|d| d.sim)
    }

    pub fn registration_status(&self) -> RegistrationStatus {
        self.device(|d| d.network.status)
    }

    pub fn operator(&self) -> Operator {
        self.device(|d| d.network.operator.clone())
    }

    pub fn call(&self) -> CallInfo {
        self.device(|d| d.call.clone())
    }

    pub fn snapshot(&self) -> DeviceState {
        self.device(|d| d.clone())
    }
}
