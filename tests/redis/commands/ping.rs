use replikv::commands::CommandError;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_ping_command() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::ping_command(),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("PONG"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_ping_command_is_case_insensitive() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::command(&["ping"]),
        &TestUtils::client_address(41844),
        "+PONG\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_handle_ping_command_invalid() {
    let env = TestEnv::new_master_server();

    env.exec_command_err(
        TestUtils::invalid_command(&["PING", "hello"]),
        &TestUtils::client_address(41844),
        CommandError::InvalidPingCommand,
    )
    .await;
}

#[tokio::test]
async fn test_handle_unknown_command() {
    let env = TestEnv::new_master_server();

    env.exec_command_err(
        TestUtils::invalid_command(&["FLUSHALL"]),
        &TestUtils::client_address(41844),
        CommandError::InvalidCommand("flushall".to_string()),
    )
    .await;

    assert_eq!(
        TestUtils::expected_error(CommandError::InvalidCommand("flushall".to_string())),
        "-ERR unknown command 'flushall'\r\n"
    );
}

#[tokio::test]
async fn test_handle_empty_command() {
    let env = TestEnv::new_master_server();

    env.exec_command_err(
        vec![],
        &TestUtils::client_address(41844),
        CommandError::EmptyCommand,
    )
    .await;
}
