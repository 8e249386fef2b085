// core/src/connection.rs
//! Socket ownership, the handshake state machine and the per-call guard.
//!
//! The handshake runs strictly in order:
//!
//! 1. connect to the daemon socket
//! 2. read the credential verdict (`ALLOW` / `DENY`)
//! 3. send the wanted protocol version, read `OK` / `UNSUPPORTED`
//! 4. bind the codec for that protocol version
//! 5. ask the daemon for its version and compare it with the minimum
//!
//! Only then is a [`Connection`] handed out. When step 3 or 5 fails in a way
//! that a newer daemon would fix, [`Connection::connect_with_recovery`] asks a
//! [`DaemonReplacer`] to reinstall the daemon and runs the handshake once more.

use crate::config::{ConnectionConfig, SocketAddress};
use crate::error::{Error, FailureReason, OperationError, Result};
use crate::foreground::ensure_background;
use crate::rpc::message::{MbGetVersionRequest, Response};
use crate::rpc::{wire, Interface, Operation, Reply};
use crate::version::Version;
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Mutex, MutexGuard};

const CREDENTIALS_ALLOWED: &str = "ALLOW";
const CREDENTIALS_DENIED: &str = "DENY";
const VERSION_OK: &str = "OK";
const VERSION_UNSUPPORTED: &str = "UNSUPPORTED";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    Connecting,
    CredentialCheck,
    VersionNegotiation,
    InterfaceBind,
    DaemonVersionCheck,
    Ready,
}

/// Out-of-band hook that reinstalls the daemon binary and relaunches it.
pub trait DaemonReplacer {
    /// Returns whether the daemon was replaced.
    fn replace_daemon(&self) -> bool;
}

impl<F: Fn() -> bool> DaemonReplacer for F {
    fn replace_daemon(&self) -> bool {
        self()
    }
}

struct Channel<S> {
    /// Dropped after a fatal failure, which closes the socket; the stream
    /// is out of step from then on.
    stream: Option<S>,
}

/// A ready session with the daemon.
///
/// Calls are serialized by an internal mutex: the protocol has no request
/// ids, so a request and its response must never be interleaved with another
/// call's frames.
pub struct Connection<S = UnixStream> {
    channel: Mutex<Channel<S>>,
    interface: Interface,
    daemon_version: Version,
}

/// Exclusive access to the channel for one call. Obtained from
/// [`Connection::begin_call`] and consumed by the call itself.
pub struct InFlight<'a, S> {
    channel: MutexGuard<'a, Channel<S>>,
    interface: Interface,
}

impl Connection<UnixStream> {
    /// Opens the daemon socket and runs the handshake.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        Self::establish(config, open_socket)
    }

    /// Like [`Connection::connect`], but replaces the daemon and retries once
    /// when it is too old or lacks the requested interface.
    pub fn connect_with_recovery(
        config: &ConnectionConfig,
        replacer: &dyn DaemonReplacer,
    ) -> Result<Self> {
        Self::establish_with_recovery(config, open_socket, replacer)
    }
}

impl<S: Read + Write> Connection<S> {
    /// Opens a stream with `open` and runs the handshake over it.
    pub fn establish<F>(config: &ConnectionConfig, mut open: F) -> Result<Self>
    where
        F: FnMut(&SocketAddress) -> io::Result<S>,
    {
        ensure_background()?;
        log::debug!("Handshake state: {:?}", HandshakeState::Connecting);
        let stream = open(&config.address).map_err(|e| {
            Error::protocol(
                FailureReason::DaemonNotRunning,
                format!("failed to connect to {:?}: {}", config.address, e),
            )
        })?;
        Self::handshake(stream, config)
    }

    pub fn establish_with_recovery<F>(
        config: &ConnectionConfig,
        mut open: F,
        replacer: &dyn DaemonReplacer,
    ) -> Result<Self>
    where
        F: FnMut(&SocketAddress) -> io::Result<S>,
    {
        match Self::establish(config, &mut open) {
            Err(Error::Protocol(failure)) if failure.reason.is_recoverable_by_replacement() => {
                log::warn!("Handshake failed ({}); replacing the daemon", failure);
                if !replacer.replace_daemon() {
                    log::error!("Daemon replacement failed");
                    return Err(Error::Protocol(failure));
                }
                log::info!("Daemon replaced, retrying handshake");
                Self::establish(config, &mut open)
            }
            other => other,
        }
    }

    /// Runs the handshake over an already connected stream.
    pub fn handshake(mut stream: S, config: &ConnectionConfig) -> Result<Self> {
        ensure_background()?;

        log::debug!("Handshake state: {:?}", HandshakeState::CredentialCheck);
        let verdict = wire::read_string(&mut stream)?;
        match verdict.as_str() {
            CREDENTIALS_ALLOWED => {}
            CREDENTIALS_DENIED => {
                return Err(Error::protocol(
                    FailureReason::SignatureCheckFail,
                    "daemon denied access to this client",
                ))
            }
            other => {
                return Err(Error::protocol(
                    FailureReason::ProtocolError,
                    format!("unexpected credential verdict '{}'", other),
                ))
            }
        }

        log::debug!("Handshake state: {:?}", HandshakeState::VersionNegotiation);
        wire::write_i32(&mut stream, config.protocol_version)?;
        stream.flush().map_err(crate::error::TransportError::from)?;
        let answer = wire::read_string(&mut stream)?;
        match answer.as_str() {
            VERSION_OK => {}
            VERSION_UNSUPPORTED => {
                return Err(Error::protocol(
                    FailureReason::InterfaceNotSupported,
                    format!("protocol version {} is not supported", config.protocol_version),
                ))
            }
            other => {
                return Err(Error::protocol(
                    FailureReason::ProtocolError,
                    format!("unexpected version negotiation answer '{}'", other),
                ))
            }
        }

        log::debug!("Handshake state: {:?}", HandshakeState::InterfaceBind);
        let interface = Interface::for_version(config.protocol_version).ok_or_else(|| {
            Error::protocol(
                FailureReason::ProtocolError,
                format!("no codec for protocol version {}", config.protocol_version),
            )
        })?;

        log::debug!("Handshake state: {:?}", HandshakeState::DaemonVersionCheck);
        let reply = exchange(&mut stream, interface, MbGetVersionRequest).map_err(|e| {
            Error::protocol(
                FailureReason::VersionTooOld,
                format!("failed to query daemon version: {}", e),
            )
        })?;
        let daemon_version: Version = reply.version.parse().map_err(|e| {
            Error::protocol(FailureReason::VersionTooOld, format!("{}", e))
        })?;
        if daemon_version < config.minimum_version {
            return Err(Error::protocol(
                FailureReason::VersionTooOld,
                format!(
                    "daemon version {} is older than the required {}",
                    daemon_version, config.minimum_version
                ),
            ));
        }

        log::info!(
            "Connected to daemon {} using protocol {}",
            daemon_version,
            interface.version()
        );
        log::debug!("Handshake state: {:?}", HandshakeState::Ready);
        Ok(Self {
            channel: Mutex::new(Channel {
                stream: Some(stream),
            }),
            interface,
            daemon_version,
        })
    }

    pub fn daemon_version(&self) -> &Version {
        &self.daemon_version
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Whether an earlier fatal failure has closed this connection.
    pub fn is_closed(&self) -> bool {
        match self.channel.lock() {
            Ok(channel) => channel.stream.is_none(),
            Err(_) => true,
        }
    }

    /// Takes the channel for one call. Blocks while another call is running.
    pub fn begin_call(&self) -> Result<InFlight<'_, S>> {
        ensure_background()?;
        let channel = self.channel.lock().map_err(|_| Error::ConnectionClosed)?;
        if channel.stream.is_none() {
            return Err(Error::ConnectionClosed);
        }
        Ok(InFlight {
            channel,
            interface: self.interface,
        })
    }

    /// Runs one request/response round trip.
    pub fn call<O: Operation>(&self, op: O) -> Result<O::Reply> {
        self.begin_call()?.call(op)
    }

    /// Closes the socket. Dropping the connection does the same.
    pub fn close(self) {
        log::debug!("Closing daemon connection");
    }
}

impl<'a, S: Read + Write> InFlight<'a, S> {
    pub fn call<O: Operation>(mut self, op: O) -> Result<O::Reply> {
        let interface = self.interface;
        let result = self
            .stream_mut()
            .and_then(|stream| exchange(stream, interface, op));
        self.settle(O::NAME, result)
    }

    pub(crate) fn stream_mut(&mut self) -> Result<&mut S> {
        self.channel.stream.as_mut().ok_or(Error::ConnectionClosed)
    }

    pub(crate) fn interface(&self) -> Interface {
        self.interface
    }

    /// Poisons the channel when `result` is a fatal failure.
    pub(crate) fn settle<T>(&mut self, op: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                log::error!("{} failed, closing connection: {}", op, e);
                self.channel.stream = None;
            } else {
                log::warn!("{}", e);
            }
        }
        result
    }
}

/// Sends `op` and decodes the matching reply.
pub(crate) fn exchange<S, O>(stream: &mut S, interface: Interface, op: O) -> Result<O::Reply>
where
    S: Read + Write,
    O: Operation,
{
    log::trace!("Sending {} request", O::NAME);
    interface.send_request(stream, &op.into_request())?;
    let response = interface.receive_response(stream)?;

    let reply = match response {
        Response::Unsupported => return Err(OperationError::Unsupported { op: O::NAME }.into()),
        Response::Invalid => return Err(OperationError::InvalidRequest { op: O::NAME }.into()),
        other => O::take_reply(other).map_err(|other| {
            Error::protocol(
                FailureReason::ProtocolError,
                format!("{} was answered with a {} reply", O::NAME, other.kind()),
            )
        })?,
    };

    if let Some(error) = reply.error() {
        return Err(OperationError::Errno {
            op: O::NAME,
            errno: error.errno,
            message: error.msg.clone(),
        }
        .into());
    }
    Ok(reply)
}

fn open_socket(address: &SocketAddress) -> io::Result<UnixStream> {
    match address {
        SocketAddress::Path(path) => UnixStream::connect(path),
        SocketAddress::Abstract(name) => connect_abstract(name),
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn connect_abstract(name: &str) -> io::Result<UnixStream> {
    #[cfg(target_os = "android")]
    use std::os::android::net::SocketAddrExt;
    #[cfg(target_os = "linux")]
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    UnixStream::connect_addr(&addr)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn connect_abstract(name: &str) -> io::Result<UnixStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("abstract socket '{}' needs Linux", name),
    ))
}
