// core/src/exec.rs
//! Signed binary execution: the one call that streams output before its
//! result.

use crate::connection::{Connection, InFlight};
use crate::error::{Error, FailureReason, Result};
use crate::rpc::message::{Request, Response, SignedExecRequest, SignedExecResponse, SignedExecResult};
use nix::sys::signal::Signal;
use std::io::{Read, Write};
use std::ops::ControlFlow;

/// How a signed binary finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecCompletion {
    Exited { status: i32 },
    Signaled { signal: i32 },
    /// The binary's signature did not verify. Output received before this
    /// point must not be trusted either.
    InvalidSignature,
    Failed { message: String },
}

impl ExecCompletion {
    pub fn is_trusted(&self) -> bool {
        !matches!(self, Self::InvalidSignature)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { status: 0 })
    }

    /// `SIGKILL` style name for signal terminations.
    pub fn signal_name(&self) -> Option<&'static str> {
        match self {
            Self::Signaled { signal } => Signal::try_from(*signal).ok().map(Signal::as_str),
            _ => None,
        }
    }
}

impl From<SignedExecResponse> for ExecCompletion {
    fn from(response: SignedExecResponse) -> Self {
        match response.result {
            SignedExecResult::Process => Self::Exited {
                status: response.exit_status,
            },
            SignedExecResult::Signaled => Self::Signaled {
                signal: response.term_sig,
            },
            SignedExecResult::InvalidSignature => Self::InvalidSignature,
            SignedExecResult::OtherError => Self::Failed {
                message: response
                    .error_msg
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
        }
    }
}

impl<S: Read + Write> Connection<S> {
    /// Runs a signed binary, feeding each output line to `sink` in order.
    ///
    /// Returning `ControlFlow::Break` from `sink` abandons the call: the
    /// remote process keeps running and the connection is closed.
    pub fn signed_exec<F>(&self, request: SignedExecRequest, sink: F) -> Result<ExecCompletion>
    where
        F: FnMut(&str) -> ControlFlow<()>,
    {
        self.begin_call()?.signed_exec(request, sink)
    }
}

impl<'a, S: Read + Write> InFlight<'a, S> {
    pub fn signed_exec<F>(mut self, request: SignedExecRequest, sink: F) -> Result<ExecCompletion>
    where
        F: FnMut(&str) -> ControlFlow<()>,
    {
        log::debug!("Executing signed binary {}", request.binary_path);
        let result = receive_exec_events(&mut self, request, sink);
        let completion = self.settle("signed_exec", result)?;
        if completion == ExecCompletion::InvalidSignature {
            log::error!("Daemon reported an invalid signature for the executed binary");
        }
        Ok(completion)
    }
}

fn receive_exec_events<S, F>(
    call: &mut InFlight<'_, S>,
    request: SignedExecRequest,
    mut sink: F,
) -> Result<ExecCompletion>
where
    S: Read + Write,
    F: FnMut(&str) -> ControlFlow<()>,
{
    let interface = call.interface();
    let stream = call.stream_mut()?;
    interface.send_request(stream, &Request::SignedExec(request))?;

    loop {
        match interface.receive_response(stream)? {
            Response::SignedExecOutput(output) => {
                if sink(&output.line).is_break() {
                    log::warn!("Signed execution abandoned by caller");
                    return Err(Error::Abandoned);
                }
            }
            Response::SignedExec(done) => return Ok(done.into()),
            other => {
                return Err(Error::protocol(
                    FailureReason::ProtocolError,
                    format!("signed_exec received a {} reply", other.kind()),
                ))
            }
        }
    }
}
