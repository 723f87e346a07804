use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{get_timestamp_in_milliseconds, KeyValueStore},
    resp::encode_simple_string,
};

/// Represents the parsed arguments for SET command
#[derive(Debug, PartialEq)]
pub struct SetArguments {
    /// The key name to store the value under
    pub key: String,
    /// The value to be stored under the given key
    pub value: String,
    /// Absolute expiration in milliseconds since the unix epoch
    pub expiration: Option<u64>,
}

impl SetArguments {
    /// Parses command arguments into a SetArguments structure.
    ///
    /// Two shapes are accepted:
    ///
    /// * `[key, value]` - the key never expires
    /// * `[key, value, "PX", milliseconds]` - the key expires `milliseconds`
    ///   after `now_ms`
    ///
    /// # Returns
    ///
    /// * `Err(CommandError::InvalidSetCommand)` - If the number of arguments is not 2 or 4
    /// * `Err(CommandError::InvalidSetCommandArgument)` - If the expiration option is not "PX"
    /// * `Err(CommandError::InvalidSetCommandExpiration)` - If the expiration time is not a
    ///   non-negative integer
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let result = SetArguments::parse(
    ///     vec!["mykey".into(), "hello".into(), "px".into(), "1000".into()],
    ///     5_000,
    /// );
    /// // Returns: Ok(SetArguments { key: "mykey", value: "hello", expiration: Some(6_000) })
    /// ```
    pub fn parse(arguments: Vec<String>, now_ms: u64) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::InvalidSetCommand);
        }

        let mut arguments = arguments.into_iter();
        let (Some(key), Some(value)) = (arguments.next(), arguments.next()) else {
            return Err(CommandError::InvalidSetCommand);
        };

        let mut expiration = None;

        if let (Some(option), Some(milliseconds)) = (arguments.next(), arguments.next()) {
            if !option.eq_ignore_ascii_case("px") {
                return Err(CommandError::InvalidSetCommandArgument);
            }

            let milliseconds = milliseconds
                .parse::<u64>()
                .map_err(|_| CommandError::InvalidSetCommandExpiration)?;

            expiration = Some(now_ms.saturating_add(milliseconds));
        }

        Ok(Self {
            key,
            value,
            expiration,
        })
    }
}

/// Handles the Redis SET command.
///
/// Keys are write-once: a SET against a key that already holds a live value
/// leaves the stored value untouched and still replies `+OK`.
pub async fn set(
    store: &KeyValueStore,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments, get_timestamp_in_milliseconds())?;

    store
        .set(
            set_arguments.key,
            set_arguments.value,
            set_arguments.expiration,
        )
        .await;

    Ok(CommandResult::reply(encode_simple_string("OK")?))
}
