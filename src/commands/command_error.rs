use thiserror::Error;

use crate::resp::{encode_error, RespError};

/// Errors reported back to the client as a RESP error reply. The connection
/// stays open after any of them.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    EmptyCommand,
    #[error("unknown command '{0}'")]
    InvalidCommand(String),
    #[error("wrong number of arguments for 'ping' command")]
    InvalidPingCommand,
    #[error("wrong number of arguments for 'echo' command")]
    InvalidEchoCommand,
    #[error("wrong number of arguments for 'get' command")]
    InvalidGetCommand,
    #[error("wrong number of arguments for 'set' command")]
    InvalidSetCommand,
    #[error("syntax error")]
    InvalidSetCommandArgument,
    #[error("value is not an integer or out of range")]
    InvalidSetCommandExpiration,
    #[error("wrong number of arguments for 'info' command")]
    InvalidInfoCommand,
    #[error("unsupported INFO section '{0}'")]
    InvalidInfoSection(String),
    #[error("invalid REPLCONF command")]
    InvalidReplconfCommand,
    #[error("wrong number of arguments for 'psync' command")]
    InvalidPsyncCommand,
    #[error("invalid PSYNC offset")]
    InvalidPsyncOffset,
    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),
}

impl CommandError {
    pub fn as_string(&self) -> String {
        encode_error(&format!("ERR {}", self))
    }
}
