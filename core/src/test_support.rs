// core/src/test_support.rs
use crate::rpc::message::{Request, Response};
use crate::rpc::{receive_envelope, send_envelope, wire};
use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

/// Replays scripted daemon bytes and records everything the client writes.
pub(crate) struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Script {
    bytes: Vec<u8>,
}

impl Script {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn string(mut self, value: &str) -> Self {
        wire::write_string(&mut self.bytes, value).unwrap();
        self
    }

    pub(crate) fn response(mut self, response: &Response) -> Self {
        send_envelope(&mut self.bytes, response).unwrap();
        self
    }

    /// Handshake prefix accepted by a daemon of the given version.
    pub(crate) fn ready(version: &str) -> Self {
        use crate::rpc::message::MbGetVersionResponse;
        Self::new()
            .string("ALLOW")
            .string("OK")
            .response(&Response::MbGetVersion(MbGetVersionResponse {
                version: version.to_string(),
            }))
    }

    pub(crate) fn build(self) -> (ScriptedStream, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let stream = ScriptedStream {
            input: Cursor::new(self.bytes),
            written: Arc::clone(&written),
        };
        (stream, written)
    }
}

type Handler = Box<dyn FnMut(&Request) -> Response + Send>;

/// What an in-memory daemon saw.
pub(crate) struct DaemonLog {
    pub(crate) requests: Vec<Request>,
    /// Requests that arrived while an earlier reply was still unread.
    pub(crate) overlaps: usize,
    inbox: Vec<u8>,
    outbox: VecDeque<u8>,
    negotiating: bool,
    handler: Handler,
}

impl DaemonLog {
    fn answer_complete_frames(&mut self) -> io::Result<()> {
        if self.negotiating {
            if self.inbox.len() < 4 {
                return Ok(());
            }
            self.inbox.drain(..4);
            wire::write_string(&mut self.outbox, "OK").map_err(to_io)?;
            self.negotiating = false;
        }
        while self.inbox.len() >= 4 {
            let len = i32::from_le_bytes([self.inbox[0], self.inbox[1], self.inbox[2], self.inbox[3]]);
            let end = 4 + len as usize;
            if self.inbox.len() < end {
                break;
            }
            let request: Request = receive_envelope(&mut &self.inbox[..end]).map_err(to_io)?;
            self.inbox.drain(..end);
            let response = (self.handler)(&request);
            self.requests.push(request);
            send_envelope(&mut self.outbox, &response).map_err(to_io)?;
        }
        Ok(())
    }
}

fn to_io(e: crate::error::TransportError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// A daemon that answers each complete request frame as soon as it is
/// written, recording whether requests ever overlap unread replies.
pub(crate) struct LoopbackDaemon {
    log: Arc<Mutex<DaemonLog>>,
}

impl LoopbackDaemon {
    pub(crate) fn new<F>(handler: F) -> (Self, Arc<Mutex<DaemonLog>>)
    where
        F: FnMut(&Request) -> Response + Send + 'static,
    {
        let mut outbox = VecDeque::new();
        wire::write_string(&mut outbox, "ALLOW").unwrap();
        let log = Arc::new(Mutex::new(DaemonLog {
            requests: Vec::new(),
            overlaps: 0,
            inbox: Vec::new(),
            outbox,
            negotiating: true,
            handler: Box::new(handler),
        }));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl Read for LoopbackDaemon {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.log.lock().unwrap().outbox.read(buf)
    }
}

impl Write for LoopbackDaemon {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut log = self.log.lock().unwrap();
        if !log.outbox.is_empty() {
            log.overlaps += 1;
        }
        log.inbox.extend_from_slice(buf);
        log.answer_complete_frames()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
