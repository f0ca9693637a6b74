use std::{error::Error, fmt::Display, io};

/// Errors that may occur when reading a single CRLF-terminated line.
#[derive(Debug)]
pub enum LineError {
    /// The line hit the length bound before a terminator was seen.
    TooLong { max: usize },
    /// A carriage return was followed by something other than a line feed.
    BareCarriageReturn,
    IoError(io::Error),
}

impl From<io::Error> for LineError {
    fn from(value: io::Error) -> Self {
        LineError::IoError(value)
    }
}

impl Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineError::TooLong { max } => {
                write!(f, "line exceeds the maximum length of {} bytes", max)
            }
            LineError::BareCarriageReturn => {
                write!(f, "carriage return not followed by line feed")
            }
            LineError::IoError(error) => write!(f, "{}", error),
        }
    }
}

impl Error for LineError {}

/// Errors that may occur when reading a request from a stream.
///
/// Each variant names the request field whose read or validation failed, so
/// the server can answer with the exact message the protocol prescribes for
/// that stage. [`RequestError::code`] exposes the agent's historical numeric
/// diagnostic codes for log correlation; the codes never go on the wire.
#[derive(Debug)]
pub enum RequestError {
    CommandLine(LineError),
    UnknownCommand(String),
    SlotLine(LineError),
    InvalidSlot(String),
    SizeLine(LineError),
    InvalidSize(String),
    Terminator(LineError),
    MacLine(LineError),
    InvalidMac(String),
    PortLine(LineError),
    InvalidPort(String),
}

impl RequestError {
    /// Numeric diagnostic code, used in log output only.
    pub fn code(&self) -> u16 {
        match self {
            RequestError::CommandLine(_) => 101,
            RequestError::SlotLine(_) => 102,
            RequestError::InvalidSlot(_) => 103,
            RequestError::SizeLine(_) => 104,
            RequestError::InvalidSize(_) => 105,
            RequestError::Terminator(_) => 106,
            RequestError::UnknownCommand(_) => 107,
            RequestError::MacLine(_) => 109,
            RequestError::InvalidMac(_) => 110,
            RequestError::PortLine(_) => 111,
            RequestError::InvalidPort(_) => 112,
        }
    }

    /// The message the client receives in the `NOK` response for this error.
    pub fn client_message(&self) -> &'static str {
        match self {
            RequestError::CommandLine(_) => "failure in reading the first line, i.e. request",
            RequestError::UnknownCommand(_) => "invalid command. request does not exist",
            RequestError::SlotLine(_) => "failure in reading the second line, i.e. fpga number",
            RequestError::InvalidSlot(_) => "invalid fpga number",
            RequestError::SizeLine(_) => "invalid message/cannot read file size",
            RequestError::InvalidSize(_) => "invalid file size",
            RequestError::Terminator(_) => {
                "invalid message/cannot parse the message. Message does not have correct structure"
            }
            RequestError::MacLine(_) => "invalid message/cannot read MAC address",
            RequestError::InvalidMac(_) => "invalid MAC address",
            RequestError::PortLine(_) => "failure in reading the port_number line",
            RequestError::InvalidPort(_) => "invalid fpga port number",
        }
    }
}

impl Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::CommandLine(e) => write!(f, "cannot read request line: {}", e),
            RequestError::UnknownCommand(cmd) => write!(f, "unknown command {:?}", cmd),
            RequestError::SlotLine(e) => write!(f, "cannot read slot number line: {}", e),
            RequestError::InvalidSlot(text) => write!(f, "invalid slot number {:?}", text),
            RequestError::SizeLine(e) => write!(f, "cannot read file size line: {}", e),
            RequestError::InvalidSize(text) => write!(f, "invalid file size {:?}", text),
            RequestError::Terminator(e) => write!(f, "cannot read blank terminator line: {}", e),
            RequestError::MacLine(e) => write!(f, "cannot read MAC address line: {}", e),
            RequestError::InvalidMac(text) => write!(f, "invalid MAC address {:?}", text),
            RequestError::PortLine(e) => write!(f, "cannot read port number line: {}", e),
            RequestError::InvalidPort(text) => write!(f, "invalid port number {:?}", text),
        }
    }
}

impl Error for RequestError {}

/// Errors that may occur when a client reads a response from a stream.
#[derive(Debug)]
pub enum ResponseError {
    Line(LineError),
    /// The first response line was neither `OK` nor `NOK`.
    InvalidVerdict(String),
}

impl From<LineError> for ResponseError {
    fn from(value: LineError) -> Self {
        ResponseError::Line(value)
    }
}

impl Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseError::Line(e) => write!(f, "cannot read response line: {}", e),
            ResponseError::InvalidVerdict(text) => {
                write!(f, "expected OK or NOK verdict, got {:?}", text)
            }
        }
    }
}

impl Error for ResponseError {}
