use replikv::{
    server::{CliError, RedisServer},
    state::RedisRole,
};

fn args(values: &[&str]) -> Vec<String> {
    std::iter::once("replikv")
        .chain(values.iter().copied())
        .map(String::from)
        .collect()
}

#[test]
fn test_redis_server_creation_without_flags() {
    let server = RedisServer::new(args(&[])).unwrap();

    assert_eq!(server.port, 6379);
    assert_eq!(server.replica_of, None);
    assert_eq!(server.role(), RedisRole::Master);
}

#[test]
fn test_redis_server_creation_with_port_flag() {
    let server = RedisServer::new(args(&["--port", "6677"])).unwrap();

    assert_eq!(server.port, 6677);
}

#[test]
fn test_redis_server_creation_with_replicaof_flag() {
    let server =
        RedisServer::new(args(&["--port", "6380", "--replicaof", "localhost 6379"])).unwrap();

    assert_eq!(server.port, 6380);
    assert_eq!(server.replica_of, Some(("localhost".to_string(), 6379)));
    assert_eq!(
        server.role(),
        RedisRole::Replica("localhost".to_string(), 6379)
    );
}

#[test]
fn test_redis_server_creation_with_invalid_flags() {
    let test_cases = vec![
        (args(&["--port"]), CliError::InvalidCommandLineFlagValue),
        (
            args(&["--port", "invalid"]),
            CliError::InvalidCommandLineFlagValue,
        ),
        (args(&["--port", "0"]), CliError::InvalidCommandLineFlagValue),
        (
            args(&["--port", "70000"]),
            CliError::InvalidCommandLineFlagValue,
        ),
        (args(&["--replicaof"]), CliError::InvalidCommandLineFlagValue),
        (
            args(&["--replicaof", "localhost"]),
            CliError::InvalidCommandLineFlagValue,
        ),
        (
            args(&["--replicaof", "localhost port"]),
            CliError::InvalidCommandLineFlagValue,
        ),
        (args(&["invalid"]), CliError::InvalidCommandLineFlag),
    ];

    for (args, expected_error) in test_cases {
        assert_eq!(
            RedisServer::new(args.clone()).unwrap_err(),
            expected_error,
            "args {:?}",
            args
        );
    }
}
