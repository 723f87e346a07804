use replikv::{
    commands::CommandError,
    state::{EMPTY_RDB_FILE, MASTER_REPLICATION_ID},
};

use crate::test_utils::{TestEnv, TestUtils};

fn expected_full_resync(offset: i64) -> Vec<u8> {
    let mut expected =
        format!("+FULLRESYNC {} {}\r\n$88\r\n", MASTER_REPLICATION_ID, offset).into_bytes();
    expected.extend_from_slice(&EMPTY_RDB_FILE);
    expected
}

#[tokio::test]
async fn test_handle_psync_command() {
    let env = TestEnv::new_master_server();

    env.exec_command_bytes_ok(
        TestUtils::psync_command("?", "-1"),
        &TestUtils::client_address(41844),
        &expected_full_resync(0),
    )
    .await;
}

#[tokio::test]
async fn test_handle_psync_command_always_fully_resyncs() {
    let env = TestEnv::new_master_server();
    let set_frame = TestUtils::encode(&TestUtils::set_command("grape", "mango"));
    let set_frame_length = set_frame.len() as i64;

    env.state.propagate(set_frame.into()).await;

    env.exec_command_bytes_ok(
        TestUtils::psync_command(MASTER_REPLICATION_ID, "10"),
        &TestUtils::client_address(41844),
        &expected_full_resync(set_frame_length),
    )
    .await;
}

#[tokio::test]
async fn test_handle_psync_command_invalid() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        (
            TestUtils::invalid_command(&["PSYNC"]),
            CommandError::InvalidPsyncCommand,
        ),
        (
            TestUtils::invalid_command(&["PSYNC", "?"]),
            CommandError::InvalidPsyncCommand,
        ),
        (
            TestUtils::invalid_command(&["PSYNC", "?", "-1", "extra"]),
            CommandError::InvalidPsyncCommand,
        ),
        (
            TestUtils::invalid_command(&["PSYNC", "?", "latest"]),
            CommandError::InvalidPsyncOffset,
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_err(command, &TestUtils::client_address(41844), expected_error)
            .await;
    }
}
