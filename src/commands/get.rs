use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::{encode_bulk_string, encode_null},
};

pub struct GetArguments {
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::InvalidGetCommand)?;

        Ok(Self { key })
    }
}

/// Handles the Redis GET command.
///
/// Replies with the stored value as a bulk string, or the null bulk string
/// when the key is missing or has expired. Expired keys are removed from the
/// store as a side effect.
pub async fn get(
    store: &KeyValueStore,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    let response = match store.get(&get_arguments.key).await {
        Some(value) => encode_bulk_string(&value),
        None => encode_null(),
    };

    Ok(CommandResult::reply(response))
}
