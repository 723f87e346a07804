use std::sync::Arc;

use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::{
    commands::CommandOrigin,
    connection::{handle_connection, Connection},
    handshake::{handshake, HandshakeError},
    replication::shared_writer,
    state::{RedisRole, ServerState},
};

#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("Invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("Invalid command line flag value")]
    InvalidCommandLineFlagValue,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("replication handshake with {master} failed: {source}")]
    Handshake {
        master: String,
        #[source]
        source: HandshakeError,
    },
}

#[derive(Debug)]
pub struct RedisServer {
    pub port: u16,
    /// `(host, port)` of the master when started with `--replicaof`.
    pub replica_of: Option<(String, u16)>,
}

impl RedisServer {
    /// Builds the server configuration from process arguments, program name
    /// first.
    ///
    /// ```ignore
    /// let server = RedisServer::new(["replikv", "--port", "6380", "--replicaof", "localhost 6379"]
    ///     .map(String::from))?;
    /// ```
    pub fn new<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let mut iter = command_line_args.into_iter().skip(1);
        let mut port: Option<u16> = None;
        let mut replica_of: Option<(String, u16)> = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--port" => {
                    let Some(port_str) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlagValue);
                    };

                    port = Some(parse_port(&port_str)?);
                }
                "--replicaof" => {
                    let Some(master) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlagValue);
                    };

                    let parts: Vec<&str> = master.split_whitespace().collect();
                    let [host, master_port] = parts.as_slice() else {
                        return Err(CliError::InvalidCommandLineFlagValue);
                    };

                    replica_of = Some((host.to_string(), parse_port(master_port)?));
                }
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        Ok(RedisServer {
            port: port.unwrap_or(6379),
            replica_of,
        })
    }

    pub fn role(&self) -> RedisRole {
        match &self.replica_of {
            Some((host, port)) => RedisRole::Replica(host.clone(), *port),
            None => RedisRole::Master,
        }
    }

    /// Binds the listener, replicates from the master if configured to, then
    /// serves clients until the task is dropped.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(("127.0.0.1", self.port)).await?;
        let state = Arc::new(ServerState::new(self.port, self.role()));

        info!(port = self.port, role = %state.role.as_string(), "listening");

        if let RedisRole::Replica(host, port) = &state.role {
            start_replication(host, *port, Arc::clone(&state)).await?;
        }

        serve(listener, state).await;

        Ok(())
    }
}

fn parse_port(value: &str) -> Result<u16, CliError> {
    match value.parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(CliError::InvalidCommandLineFlagValue),
    }
}

/// Accepts client connections forever, one task per connection.
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) {
    loop {
        match listener.accept().await {
            Ok((stream, address)) => {
                tokio::spawn(handle_connection(stream, address, Arc::clone(&state)));
            }
            Err(e) => error!(error = %e, "failed to accept connection"),
        }
    }
}

/// Connects to the master, performs the handshake and spawns the task that
/// applies the replication stream. Any failure before the stream starts is
/// returned to the caller.
pub async fn start_replication(
    host: &str,
    port: u16,
    state: Arc<ServerState>,
) -> Result<JoinHandle<()>, ServerError> {
    let master = format!("{}:{}", host, port);

    let mut stream = TcpStream::connect(&master).await?;
    let leftover = handshake(&mut stream, &state)
        .await
        .map_err(|source| {
            error!(master = %master, error = %source, "replication handshake failed");
            ServerError::Handshake {
                master: master.clone(),
                source,
            }
        })?;

    let (reader, writer) = stream.into_split();
    let connection = Connection::new(
        reader,
        shared_writer(writer),
        master.clone(),
        CommandOrigin::Master,
        state,
    )
    .with_buffered(leftover);

    Ok(tokio::spawn(async move {
        if let Err(e) = connection.run().await {
            warn!(master = %master, error = %e, "replication link ended");
        }
    }))
}
