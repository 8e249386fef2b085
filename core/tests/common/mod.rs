// core/tests/common/mod.rs
#![allow(dead_code)]

use anyhow::Result;
use mbclient_core::rpc::message::{MbGetVersionResponse, Request, Response};
use mbclient_core::rpc::{receive_envelope, send_envelope, wire};
use mbclient_core::{Connection, ConnectionConfig};
use std::os::unix::net::UnixStream;
use std::thread::{self, JoinHandle};

/// Plays the daemon side of the handshake on `stream`.
pub fn accept_handshake(stream: &mut UnixStream, version: &str) -> Result<()> {
    wire::write_string(stream, "ALLOW")?;
    let requested = wire::read_i32(stream)?;
    assert_eq!(requested, 3);
    wire::write_string(stream, "OK")?;
    let request: Request = receive_envelope(stream)?;
    assert!(matches!(request, Request::MbGetVersion(_)));
    send_envelope(
        stream,
        &Response::MbGetVersion(MbGetVersionResponse {
            version: version.to_string(),
        }),
    )?;
    Ok(())
}

/// Spawns a fake daemon that answers each request with `handler` until the
/// client hangs up. Returns the requests it saw, in order.
pub fn spawn_daemon<F>(mut handler: F) -> (Connection, JoinHandle<Vec<Request>>)
where
    F: FnMut(&mut UnixStream, &Request) -> Result<()> + Send + 'static,
{
    let (client, mut server) = UnixStream::pair().expect("socket pair");
    let daemon = thread::spawn(move || {
        let mut seen = Vec::new();
        accept_handshake(&mut server, "9.3.0").expect("handshake");
        while let Ok(request) = receive_envelope::<_, Request>(&mut server) {
            handler(&mut server, &request).expect("daemon reply");
            seen.push(request);
        }
        seen
    });
    let connection =
        Connection::handshake(client, &ConnectionConfig::default()).expect("client handshake");
    (connection, daemon)
}

pub fn reply(stream: &mut UnixStream, response: Response) -> Result<()> {
    send_envelope(stream, &response)?;
    Ok(())
}
