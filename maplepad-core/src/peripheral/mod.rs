//! Peripheral tree
//!
//! The console talks to one main peripheral per port. The main peripheral
//! may have up to five sub-peripherals in its expansion slots, each with its
//! own address and functions:
//!
//! ```text
//! MainPeripheral (0x20): Controller
//! ├── sub 0 (0x01): Storage, Screen, Timer    (VMU)
//! └── sub 1 (0x02): Vibration                 (rumble pack)
//! ```
//!
//! The tree is assembled once at startup and sealed when the scheduler takes
//! it; from then on its shape never changes.

pub mod function;

use heapless::Vec;
use maplepad_protocol::address::{MAX_SUB_PERIPHERALS, SUB_UNIT_MASK};
use maplepad_protocol::info::DEFINITION_SLOTS;
use maplepad_protocol::{Address, Command, DeviceInfo, Frame, FunctionCode, ResponseCode};

use crate::config::Identity;
use function::{Controller, Function, Reply};

/// Functions a single peripheral can carry
pub const MAX_FUNCTIONS: usize = DEFINITION_SLOTS;

/// Errors while assembling the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssemblyError {
    /// A function with the same code is already attached
    Duplicate,
    /// No free function slot
    TooManyFunctions,
    /// No free expansion slot, or the slot is taken
    SlotTaken,
    /// Address is not a sub-peripheral address
    InvalidAddress,
    /// The tree is running and can no longer change
    Sealed,
}

/// One addressable node of the tree
pub struct Peripheral<'a> {
    address: Address,
    identity: Identity,
    functions: Vec<Function<'a>, MAX_FUNCTIONS>,
    sealed: bool,
}

impl<'a> Peripheral<'a> {
    /// Create a node at `address` (unit bits only)
    pub fn new(address: Address, identity: Identity) -> Self {
        Self {
            address,
            identity,
            functions: Vec::new(),
            sealed: false,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Attach a function
    pub fn add_function(&mut self, function: Function<'a>) -> Result<(), AssemblyError> {
        if self.sealed {
            return Err(AssemblyError::Sealed);
        }
        if self.function(function.code()).is_some() {
            return Err(AssemblyError::Duplicate);
        }
        self.functions
            .push(function)
            .map_err(|_| AssemblyError::TooManyFunctions)
    }

    /// Function answering `code`, if attached
    pub fn function(&self, code: FunctionCode) -> Option<&Function<'a>> {
        self.functions.iter().find(|f| f.code() == code)
    }

    pub fn function_mut(&mut self, code: FunctionCode) -> Option<&mut Function<'a>> {
        self.functions.iter_mut().find(|f| f.code() == code)
    }

    /// OR of every attached function code
    pub fn function_mask(&self) -> u32 {
        self.functions.iter().fold(0, |mask, f| mask | f.code().to_word())
    }

    /// Definition words ordered by function bit, highest first
    pub fn definitions(&self) -> [u32; DEFINITION_SLOTS] {
        let mut ordered: Vec<(u32, u32), MAX_FUNCTIONS> = self
            .functions
            .iter()
            .map(|f| (f.code().to_word(), f.definition()))
            .collect();
        ordered.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut definitions = [0u32; DEFINITION_SLOTS];
        for (slot, (_, definition)) in definitions.iter_mut().zip(ordered.iter()) {
            *slot = *definition;
        }
        definitions
    }

    /// Device info block for this node
    pub fn device_info(&self) -> DeviceInfo<'_> {
        DeviceInfo {
            functions: self.function_mask(),
            definitions: self.definitions(),
            area_code: self.identity.area_code,
            direction: self.identity.direction,
            name: self.identity.name.as_str(),
            version: self.identity.version.as_str(),
            standby_current: self.identity.standby_current(),
            max_current: self.identity.max_current(),
        }
    }

    /// Answer a request addressed to this node
    ///
    /// `sender` is the address to report, port bits included.
    pub fn handle(&mut self, request: &Frame, sender: u8, now_us: u64) -> Frame {
        let recipient = request.sender;

        let Some(command) = Command::from_byte(request.command) else {
            return error(ResponseCode::UnknownCommand, recipient, sender);
        };

        match command {
            Command::DeviceInfo => reply_words(
                ResponseCode::DeviceInfo,
                &self.device_info().encode(),
                recipient,
                sender,
            ),
            Command::ExtDeviceInfo => reply_words(
                ResponseCode::ExtDeviceInfo,
                &self.device_info().encode_extended(),
                recipient,
                sender,
            ),
            Command::Reset | Command::Shutdown => {
                Frame::empty(ResponseCode::Ack.to_byte(), recipient, sender)
            }
            _ => {
                let Some(code) = request.word(0) else {
                    return error(ResponseCode::Resend, recipient, sender);
                };
                let function = FunctionCode::from_word(code).and_then(|c| self.function_mut(c));
                let Some(function) = function else {
                    return error(ResponseCode::FunctionUnsupported, recipient, sender);
                };

                match function.handle(command, &request.payload, now_us) {
                    Reply::Ack => Frame::empty(ResponseCode::Ack.to_byte(), recipient, sender),
                    Reply::Data(payload) => Frame {
                        command: ResponseCode::DataTransfer.to_byte(),
                        recipient,
                        sender,
                        payload,
                    },
                    Reply::Error(code) => error(code, recipient, sender),
                }
            }
        }
    }
}

fn error(code: ResponseCode, recipient: u8, sender: u8) -> Frame {
    Frame::empty(code.to_byte(), recipient, sender)
}

fn reply_words(code: ResponseCode, words: &[u32], recipient: u8, sender: u8) -> Frame {
    // Info blocks are at most 48 words
    Frame::new(code.to_byte(), recipient, sender, words)
        .unwrap_or_else(|_| error(ResponseCode::FileError, recipient, sender))
}

/// Root of the tree
pub struct MainPeripheral<'a> {
    node: Peripheral<'a>,
    subs: Vec<Peripheral<'a>, MAX_SUB_PERIPHERALS>,
    sealed: bool,
}

impl<'a> MainPeripheral<'a> {
    pub fn new(identity: Identity) -> Self {
        Self {
            node: Peripheral::new(Address::main(), identity),
            subs: Vec::new(),
            sealed: false,
        }
    }

    /// Attach a function to the main peripheral
    pub fn add_function(&mut self, function: Function<'a>) -> Result<(), AssemblyError> {
        self.node.add_function(function)
    }

    /// Plug a sub-peripheral into the expansion slot named by its address
    pub fn add_sub_peripheral(&mut self, sub: Peripheral<'a>) -> Result<(), AssemblyError> {
        if self.sealed {
            return Err(AssemblyError::Sealed);
        }
        let unit = sub.address().unit();
        if unit == 0 || unit & !SUB_UNIT_MASK != 0 || !unit.is_power_of_two() {
            return Err(AssemblyError::InvalidAddress);
        }
        if self.subs.iter().any(|s| s.address().unit() == unit) {
            return Err(AssemblyError::SlotTaken);
        }
        self.subs.push(sub).map_err(|_| AssemblyError::SlotTaken)
    }

    /// Freeze the tree's shape, including every node's function list
    pub fn seal(&mut self) {
        self.sealed = true;
        self.node.sealed = true;
        for sub in self.subs.iter_mut() {
            sub.sealed = true;
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The main node
    pub fn node(&self) -> &Peripheral<'a> {
        &self.node
    }

    /// Sub-peripheral in slot `index`
    pub fn sub(&self, index: usize) -> Option<&Peripheral<'a>> {
        let unit = Address::sub(index)?.unit();
        self.subs.iter().find(|s| s.address().unit() == unit)
    }

    pub fn sub_mut(&mut self, index: usize) -> Option<&mut Peripheral<'a>> {
        let unit = Address::sub(index)?.unit();
        self.subs.iter_mut().find(|s| s.address().unit() == unit)
    }

    /// Controller function of the main node, for feeding input
    pub fn controller_mut(&mut self) -> Option<&mut Controller> {
        match self.node.function_mut(FunctionCode::Controller) {
            Some(Function::Controller(c)) => Some(c),
            _ => None,
        }
    }

    /// Unit bits of every attached sub-peripheral
    pub fn sub_units(&self) -> u8 {
        self.subs.iter().fold(0, |units, s| units | s.address().unit())
    }

    /// Returns true if `recipient` names a node of this tree
    pub fn owns(&self, recipient: u8) -> bool {
        self.reply_sender(recipient).is_some()
    }

    /// Sender address to answer a packet sent to `recipient` with
    ///
    /// The port bits come from `recipient`. The main peripheral also
    /// advertises its populated expansion slots.
    pub fn reply_sender(&self, recipient: u8) -> Option<u8> {
        let recipient = Address(recipient);
        if self.node.address().matches(recipient) {
            return Some(recipient.port() | self.node.address().unit() | self.sub_units());
        }
        self.subs
            .iter()
            .find(|s| s.address().matches(recipient))
            .map(|s| s.address().on_port_of(recipient).0)
    }

    /// Answer one inbound packet
    ///
    /// Returns `None` when there is nothing to answer or the packet is
    /// addressed to someone else.
    pub fn task(&mut self, now_us: u64, inbound: Option<&Frame>) -> Option<Frame> {
        let request = inbound?;
        let sender = self.reply_sender(request.recipient)?;
        let recipient = Address(request.recipient);

        let node = if self.node.address().matches(recipient) {
            &mut self.node
        } else {
            self.subs
                .iter_mut()
                .find(|s| s.address().matches(recipient))?
        };
        Some(node.handle(request, sender, now_us))
    }
}
