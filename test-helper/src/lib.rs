mod connection;

pub use connection::{mock_channel, MockConnection};
