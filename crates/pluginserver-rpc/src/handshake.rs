//! Greeting written on every accepted connection.

/// Notification method carrying the server pid.
pub const SERVER_PID: &str = "serverPid";

/// Builds the `[2, "serverPid", <pid>]` frame.
pub fn handshake_frame(pid: u32) -> rmpv::Value {
    rmpv::Value::Array(vec![
        rmpv::Value::from(crate::message::NOTIFICATION),
        rmpv::Value::from(SERVER_PID),
        rmpv::Value::from(pid),
    ])
}
