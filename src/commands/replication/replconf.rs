use std::sync::Arc;

use tracing::warn;

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::{CommandContext, CommandResult},
    },
    replication::ReplicationError,
    resp::{encode_array, encode_simple_string},
    state::ServerState,
};

/// Represents the parsed arguments for the REPLCONF command.
#[derive(Debug, PartialEq)]
pub enum ReplconfArguments {
    /// `REPLCONF listening-port <port>`: the caller is a replica.
    ListeningPort(u16),
    /// `REPLCONF capa <capability>...`
    Capabilities(Vec<String>),
    /// `REPLCONF GETACK *`: our master asks how much of its stream we consumed.
    GetAck,
    /// `REPLCONF ACK <offset>`: a replica reports how much of our stream it consumed.
    Ack(u64),
}

impl ReplconfArguments {
    /// Parses and validates arguments for the REPLCONF command.
    ///
    /// # Returns
    ///
    /// * `Err(CommandError::InvalidReplconfCommand)` - If the option is unknown,
    ///   its value is missing, or the port/offset is not a valid number
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let Some((option, values)) = arguments.split_first() else {
            return Err(CommandError::InvalidReplconfCommand);
        };

        match (option.to_lowercase().as_str(), values) {
            ("listening-port", [port]) => port
                .parse::<u16>()
                .map(ReplconfArguments::ListeningPort)
                .map_err(|_| CommandError::InvalidReplconfCommand),
            ("capa", capabilities) if !capabilities.is_empty() => {
                Ok(ReplconfArguments::Capabilities(capabilities.to_vec()))
            }
            ("getack", [star]) if star == "*" => Ok(ReplconfArguments::GetAck),
            ("ack", [offset]) => offset
                .parse::<u64>()
                .map(ReplconfArguments::Ack)
                .map_err(|_| CommandError::InvalidReplconfCommand),
            _ => Err(CommandError::InvalidReplconfCommand),
        }
    }
}

/// Handles the Redis REPLCONF command.
///
/// # Examples
///
/// ```ignore
/// // REPLCONF listening-port 6380  -> "+OK\r\n", caller registered as a replica
/// // REPLCONF capa psync2          -> "+OK\r\n"
/// // REPLCONF GETACK *             -> "*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$1\r\n0\r\n"
/// // REPLCONF ACK 31               -> no reply
/// ```
pub async fn replconf(
    state: &ServerState,
    context: &CommandContext,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    match ReplconfArguments::parse(arguments)? {
        ReplconfArguments::ListeningPort(port) => {
            state
                .replicas
                .register(&context.client_address, port, Arc::clone(&context.writer))
                .await;

            Ok(CommandResult::reply(encode_simple_string("OK")?))
        }
        ReplconfArguments::Capabilities(_) => {
            Ok(CommandResult::reply(encode_simple_string("OK")?))
        }
        ReplconfArguments::GetAck => Ok(CommandResult::reply(encode_array(&[
            "REPLCONF".to_string(),
            "ACK".to_string(),
            state.ack_offset().to_string(),
        ]))),
        ReplconfArguments::Ack(offset) => {
            if let Err(ReplicationError::UnknownReplica(address)) = state
                .replicas
                .acknowledge(&context.client_address, offset)
                .await
            {
                warn!(client = %address, offset, "ACK from a connection that is not a replica");
            }

            Ok(CommandResult::NoResponse)
        }
    }
}
