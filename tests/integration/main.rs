//! Integration tests with mock HTTP server

mod messages;
mod mock_server;
mod streaming;
