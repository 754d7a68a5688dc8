//! WebSocket sync gateway: every connected client receives the full directory
//! after each change, the same way a second tab would.

pub mod connection;
