use std::time::Duration;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Buffered client events before `send` waits.
pub const DEFAULT_CAPACITY: usize = 1024;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `close` waits for the socket to flush its close frame.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
