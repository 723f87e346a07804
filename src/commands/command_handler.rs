use tracing::debug;

use crate::{
    commands::{
        command_error::CommandError,
        echo::echo,
        get::get,
        info::info,
        ping::ping,
        replication::{psync, replconf},
        set::set,
    },
    replication::ConnectionWriter,
    state::ServerState,
};

/// Commands whose exact bytes a master forwards to its replicas.
const WRITE_COMMANDS: [&str; 1] = ["SET"];

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    NoResponse,
    Response(Vec<u8>),
}

impl CommandResult {
    pub fn reply(response: String) -> Self {
        CommandResult::Response(response.into_bytes())
    }
}

/// Who sent the command: an ordinary client, or the master this node
/// replicates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOrigin {
    Client,
    Master,
}

/// Per-connection facts a command may need beyond its arguments.
pub struct CommandContext {
    pub client_address: String,
    pub origin: CommandOrigin,
    /// Write half of the issuing connection, kept by REPLCONF listening-port
    /// so the master can later broadcast to it.
    pub writer: ConnectionWriter,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
}

impl CommandHandler {
    /// Splits a decoded array into an upper-cased command name and its
    /// arguments.
    pub fn new(elements: Vec<String>) -> Result<Self, CommandError> {
        let mut elements = elements.into_iter();

        let Some(name) = elements.next() else {
            return Err(CommandError::EmptyCommand);
        };

        Ok(Self {
            name: name.to_uppercase(),
            arguments: elements.collect(),
        })
    }

    pub fn is_write_command(&self) -> bool {
        WRITE_COMMANDS.contains(&self.name.as_str())
    }

    async fn handle_command(
        &self,
        state: &ServerState,
        context: &CommandContext,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "PING" => ping(self.arguments.clone()),
            "ECHO" => echo(self.arguments.clone()),
            "GET" => get(&state.store, self.arguments.clone()).await,
            "SET" => set(&state.store, self.arguments.clone()).await,
            "INFO" => info(state, self.arguments.clone()).await,
            "REPLCONF" => replconf(state, context, self.arguments.clone()).await,
            "PSYNC" => psync(state, self.arguments.clone()).await,
            _ => Err(CommandError::InvalidCommand(self.name.to_lowercase())),
        }
    }

    /// Runs the command against the server state.
    ///
    /// Commands streamed by our master are applied silently: their replies
    /// are dropped, with the exception of REPLCONF which is how the master
    /// queries our offset.
    pub async fn handle(
        &self,
        state: &ServerState,
        context: &CommandContext,
    ) -> Result<CommandResult, CommandError> {
        debug!(
            client = %context.client_address,
            command = %self.name,
            arguments = self.arguments.len(),
            "handling command"
        );

        let command_result = self.handle_command(state, context).await?;

        match context.origin {
            CommandOrigin::Client => Ok(command_result),
            CommandOrigin::Master if self.name == "REPLCONF" => Ok(command_result),
            CommandOrigin::Master => Ok(CommandResult::NoResponse),
        }
    }
}
