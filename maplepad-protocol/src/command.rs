//! Command and response codes carried in the header's COMMAND byte

/// Requests a console sends to a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Standard device information (28 words)
    DeviceInfo,
    /// Device information followed by the version string (48 words)
    ExtDeviceInfo,
    /// Return to the power-on state
    Reset,
    /// Stop all activity
    Shutdown,
    /// Read the function's current condition (buttons, sticks, timer keys)
    GetCondition,
    /// Read the storage media descriptor
    GetMemoryInfo,
    /// Read one block (or phase of a block)
    BlockRead,
    /// Write one phase of a block
    BlockWrite,
    /// Finish a multi-phase block write
    BlockCompleteWrite,
    /// Set the function's condition (PWM, vibration)
    SetCondition,
}

// Wire format values
const CMD_DEVICE_INFO: u8 = 0x01;
const CMD_EXT_DEVICE_INFO: u8 = 0x02;
const CMD_RESET: u8 = 0x03;
const CMD_SHUTDOWN: u8 = 0x04;
const CMD_GET_CONDITION: u8 = 0x09;
const CMD_GET_MEMORY_INFO: u8 = 0x0A;
const CMD_BLOCK_READ: u8 = 0x0B;
const CMD_BLOCK_WRITE: u8 = 0x0C;
const CMD_BLOCK_COMPLETE_WRITE: u8 = 0x0D;
const CMD_SET_CONDITION: u8 = 0x0E;

impl Command {
    /// Parse a command from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_DEVICE_INFO => Some(Command::DeviceInfo),
            CMD_EXT_DEVICE_INFO => Some(Command::ExtDeviceInfo),
            CMD_RESET => Some(Command::Reset),
            CMD_SHUTDOWN => Some(Command::Shutdown),
            CMD_GET_CONDITION => Some(Command::GetCondition),
            CMD_GET_MEMORY_INFO => Some(Command::GetMemoryInfo),
            CMD_BLOCK_READ => Some(Command::BlockRead),
            CMD_BLOCK_WRITE => Some(Command::BlockWrite),
            CMD_BLOCK_COMPLETE_WRITE => Some(Command::BlockCompleteWrite),
            CMD_SET_CONDITION => Some(Command::SetCondition),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::DeviceInfo => CMD_DEVICE_INFO,
            Command::ExtDeviceInfo => CMD_EXT_DEVICE_INFO,
            Command::Reset => CMD_RESET,
            Command::Shutdown => CMD_SHUTDOWN,
            Command::GetCondition => CMD_GET_CONDITION,
            Command::GetMemoryInfo => CMD_GET_MEMORY_INFO,
            Command::BlockRead => CMD_BLOCK_READ,
            Command::BlockWrite => CMD_BLOCK_WRITE,
            Command::BlockCompleteWrite => CMD_BLOCK_COMPLETE_WRITE,
            Command::SetCondition => CMD_SET_CONDITION,
        }
    }

    /// Returns true if the first payload word selects a function
    pub fn is_function_command(&self) -> bool {
        matches!(
            self,
            Command::GetCondition
                | Command::GetMemoryInfo
                | Command::BlockRead
                | Command::BlockWrite
                | Command::BlockCompleteWrite
                | Command::SetCondition
        )
    }
}

/// Codes a peripheral answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseCode {
    DeviceInfo,
    ExtDeviceInfo,
    Ack,
    DataTransfer,
    /// Peripheral chose not to answer
    NoResponse,
    /// No function on this peripheral matches the requested code
    FunctionUnsupported,
    /// The command byte is not understood
    UnknownCommand,
    /// Packet or payload was malformed; console should send it again
    Resend,
    /// Storage could not service the request
    FileError,
}

const RESP_DEVICE_INFO: u8 = 0x05;
const RESP_EXT_DEVICE_INFO: u8 = 0x06;
const RESP_ACK: u8 = 0x07;
const RESP_DATA_TRANSFER: u8 = 0x08;
const RESP_NO_RESPONSE: u8 = 0xFF;
const RESP_FUNCTION_UNSUPPORTED: u8 = 0xFE;
const RESP_UNKNOWN_COMMAND: u8 = 0xFD;
const RESP_RESEND: u8 = 0xFC;
const RESP_FILE_ERROR: u8 = 0xFB;

impl ResponseCode {
    /// Parse a response from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            RESP_DEVICE_INFO => Some(ResponseCode::DeviceInfo),
            RESP_EXT_DEVICE_INFO => Some(ResponseCode::ExtDeviceInfo),
            RESP_ACK => Some(ResponseCode::Ack),
            RESP_DATA_TRANSFER => Some(ResponseCode::DataTransfer),
            RESP_NO_RESPONSE => Some(ResponseCode::NoResponse),
            RESP_FUNCTION_UNSUPPORTED => Some(ResponseCode::FunctionUnsupported),
            RESP_UNKNOWN_COMMAND => Some(ResponseCode::UnknownCommand),
            RESP_RESEND => Some(ResponseCode::Resend),
            RESP_FILE_ERROR => Some(ResponseCode::FileError),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            ResponseCode::DeviceInfo => RESP_DEVICE_INFO,
            ResponseCode::ExtDeviceInfo => RESP_EXT_DEVICE_INFO,
            ResponseCode::Ack => RESP_ACK,
            ResponseCode::DataTransfer => RESP_DATA_TRANSFER,
            ResponseCode::NoResponse => RESP_NO_RESPONSE,
            ResponseCode::FunctionUnsupported => RESP_FUNCTION_UNSUPPORTED,
            ResponseCode::UnknownCommand => RESP_UNKNOWN_COMMAND,
            ResponseCode::Resend => RESP_RESEND,
            ResponseCode::FileError => RESP_FILE_ERROR,
        }
    }

    /// Returns true for the negative codes (0xFB..=0xFF)
    pub fn is_error(&self) -> bool {
        self.to_byte() >= RESP_FILE_ERROR
    }
}
