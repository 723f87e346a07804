use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::{encode_file_payload, encode_simple_string},
    state::{EMPTY_RDB_FILE, ServerState},
};

/// Represents the parsed arguments for the PSYNC command.
///
/// PSYNC is sent by replicas to request synchronization with the master,
/// carrying the replication id they last followed and their offset in it.
#[derive(Debug, PartialEq)]
pub struct PsyncArguments {
    /// "?" when the replica has never synchronized
    pub master_repl_id: String,
    /// -1 when the replica has never synchronized
    pub offset: i64,
}

impl PsyncArguments {
    /// Parses and validates arguments for the PSYNC command.
    ///
    /// # Returns
    ///
    /// * `Err(CommandError::InvalidPsyncCommand)` - If not exactly 2 arguments
    /// * `Err(CommandError::InvalidPsyncOffset)` - If the offset is not an integer
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [master_repl_id, offset]: [String; 2] = arguments
            .try_into()
            .map_err(|_| CommandError::InvalidPsyncCommand)?;

        let offset = offset
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidPsyncOffset)?;

        Ok(Self {
            master_repl_id,
            offset,
        })
    }
}

/// Handles the Redis PSYNC command.
///
/// Partial resynchronization does not exist: every request gets
/// `+FULLRESYNC <replid> <offset>` immediately followed by the empty snapshot
/// framed as `$<len>\r\n<bytes>` (no trailing CRLF).
pub async fn psync(
    state: &ServerState,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    PsyncArguments::parse(arguments)?;

    let replication_info = state.replication_info().await;

    let mut response = encode_simple_string(&format!(
        "FULLRESYNC {} {}",
        replication_info.repl_id, replication_info.repl_offset
    ))?
    .into_bytes();
    response.extend_from_slice(&encode_file_payload(&EMPTY_RDB_FILE));

    Ok(CommandResult::Response(response))
}
