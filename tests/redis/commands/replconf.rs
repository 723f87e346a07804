use replikv::commands::{CommandError, CommandOrigin, CommandResult};
use tokio::io::duplex;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_replconf_listening_port_registers_replica() {
    let env = TestEnv::new_master_server();
    let (writer, _reader) = duplex(1024);

    let result = env
        .exec_command_with_writer(
            TestUtils::replconf_command("listening-port", "6380"),
            &TestUtils::client_address(41844),
            CommandOrigin::Client,
            writer,
        )
        .await;

    assert_eq!(
        result,
        Ok(CommandResult::Response(b"+OK\r\n".to_vec()))
    );
    assert_eq!(env.state.replicas.len().await, 1);
    assert_eq!(
        env.state
            .replicas
            .acknowledged_offset(&TestUtils::client_address(41844))
            .await,
        Some(0)
    );
}

#[tokio::test]
async fn test_handle_replconf_capa() {
    let env = TestEnv::new_master_server();

    for command in [
        TestUtils::replconf_command("capa", "psync2"),
        TestUtils::command(&["REPLCONF", "capa", "eof", "capa", "psync2"]),
    ] {
        env.exec_command_ok(
            command,
            &TestUtils::client_address(41844),
            &TestUtils::expected_simple_string("OK"),
        )
        .await;
    }

    assert!(env.state.replicas.is_empty().await);
}

#[tokio::test]
async fn test_handle_replconf_getack() {
    let env = TestEnv::new_replica_server(6380);

    env.exec_command_ok(
        TestUtils::replconf_command("GETACK", "*"),
        &TestUtils::master_address(),
        &TestUtils::expected_ack(0),
    )
    .await;

    env.state.advance_ack_offset(31);

    env.exec_command_ok(
        TestUtils::replconf_command("getack", "*"),
        &TestUtils::master_address(),
        "*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$2\r\n31\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_handle_replconf_ack_updates_replica_offset() {
    let env = TestEnv::new_master_server();
    let replica_address = TestUtils::client_address(41844);
    let _replica = env.register_replica(&replica_address, 6380).await;

    env.exec_command_no_response(TestUtils::replconf_command("ACK", "154"), &replica_address)
        .await;

    assert_eq!(
        env.state.replicas.acknowledged_offset(&replica_address).await,
        Some(154)
    );
}

#[tokio::test]
async fn test_handle_replconf_ack_from_unknown_connection() {
    let env = TestEnv::new_master_server();

    env.exec_command_no_response(
        TestUtils::replconf_command("ACK", "154"),
        &TestUtils::client_address(41844),
    )
    .await;

    assert!(env.state.replicas.is_empty().await);
}

#[tokio::test]
async fn test_handle_replconf_command_invalid() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        TestUtils::invalid_command(&["REPLCONF"]),
        TestUtils::invalid_command(&["REPLCONF", "listening-port"]),
        TestUtils::invalid_command(&["REPLCONF", "listening-port", "port"]),
        TestUtils::invalid_command(&["REPLCONF", "GETACK", "1"]),
        TestUtils::invalid_command(&["REPLCONF", "ACK", "many"]),
        TestUtils::invalid_command(&["REPLCONF", "unknown", "1"]),
    ];

    for command in test_cases {
        env.exec_command_err(
            command,
            &TestUtils::client_address(41844),
            CommandError::InvalidReplconfCommand,
        )
        .await;
    }
}
