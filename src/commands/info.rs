use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::encode_bulk_string,
    state::ServerState,
};

enum InfoSection {
    Default,
    Replication,
}

pub struct InfoArguments {
    section: InfoSection,
}

impl InfoArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::InvalidInfoCommand);
        }

        let Some(section) = arguments.first() else {
            return Ok(InfoArguments {
                section: InfoSection::Default,
            });
        };

        let section = match section.to_lowercase().as_str() {
            "replication" => InfoSection::Replication,
            _ => return Err(CommandError::InvalidInfoSection(section.clone())),
        };

        Ok(InfoArguments { section })
    }
}

/// Handles the Redis INFO command. Only the replication section exists, so
/// it is also what a bare INFO returns.
pub async fn info(
    state: &ServerState,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let info_arguments = InfoArguments::parse(arguments)?;
    let replication_info = state.replication_info().await;

    let replication = [
        format!("role:{}", state.role.as_string()),
        format!("master_replid:{}", replication_info.repl_id),
        format!("master_repl_offset:{}", replication_info.repl_offset),
    ]
    .join("\n");

    match info_arguments.section {
        InfoSection::Default | InfoSection::Replication => {
            Ok(CommandResult::reply(encode_bulk_string(&replication)))
        }
    }
}
