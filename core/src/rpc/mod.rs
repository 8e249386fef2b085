// core/src/rpc/mod.rs
pub mod message;
pub mod wire;

use crate::error::TransportError;
use bincode::config::{Configuration, Fixint, Limit, LittleEndian};
use bincode::{decode_from_slice, encode_to_vec, Decode, Encode};
use message::*;
use std::io::{Read, Write};

/// Protocol version this client speaks.
pub const PROTOCOL_VERSION: i32 = 3;

/// Payload encoding of envelopes: fixed-width little-endian integers.
///
/// The limit bounds every length decoded inside a payload, so a bogus inner
/// length fails before anything is allocated for it.
pub fn envelope_config() -> Configuration<LittleEndian, Fixint, Limit<{ wire::MAX_FRAME_LEN }>> {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
        .with_limit::<{ wire::MAX_FRAME_LEN }>()
}

/// Writes one envelope (i32 length + payload) with a single `write_all`, so
/// a frame is never split across calls.
pub fn send_envelope<W, T>(writer: &mut W, message: &T) -> Result<(), TransportError>
where
    W: Write + ?Sized,
    T: Encode,
{
    let payload = encode_to_vec(message, envelope_config())
        .map_err(|e| TransportError::Encode(e.to_string()))?;
    if payload.len() > wire::MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    wire::write_i32(&mut frame, payload.len() as i32)?;
    frame.extend_from_slice(&payload);

    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Reads one envelope and decodes its payload.
pub fn receive_envelope<R, T>(reader: &mut R) -> Result<T, TransportError>
where
    R: Read + ?Sized,
    T: Decode<()>,
{
    let len = wire::read_length(reader)?;
    let payload = wire::read_exact_vec(reader, len)?;
    let (message, consumed): (T, usize) = decode_from_slice(&payload, envelope_config())
        .map_err(|e| TransportError::Decode(e.to_string()))?;
    if consumed != payload.len() {
        return Err(TransportError::Decode(format!(
            "{} trailing bytes after message",
            payload.len() - consumed
        )));
    }
    Ok(message)
}

/// Codec bound to a negotiated protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interface {
    V3,
}

impl Interface {
    pub fn for_version(version: i32) -> Option<Self> {
        match version {
            3 => Some(Self::V3),
            _ => None,
        }
    }

    pub fn version(self) -> i32 {
        match self {
            Self::V3 => 3,
        }
    }

    pub fn send_request<W: Write + ?Sized>(
        self,
        writer: &mut W,
        request: &Request,
    ) -> Result<(), TransportError> {
        match self {
            Self::V3 => send_envelope(writer, request),
        }
    }

    pub fn receive_response<R: Read + ?Sized>(self, reader: &mut R) -> Result<Response, TransportError> {
        match self {
            Self::V3 => receive_envelope(reader),
        }
    }
}

/// Reply payloads that may carry an errno sub-record.
pub trait Reply {
    fn error(&self) -> Option<&ErrnoError> {
        None
    }
}

/// Pairs a request payload with the reply kind the daemon must answer with.
pub trait Operation: Sized {
    type Reply: Reply;

    /// Name used in logs and error messages.
    const NAME: &'static str;

    fn into_request(self) -> Request;

    /// Extracts the expected reply, handing back anything else untouched.
    fn take_reply(response: Response) -> Result<Self::Reply, Response>;
}

macro_rules! operation {
    ($name:literal, $variant:ident, $request:ty => $reply:ty) => {
        impl Operation for $request {
            type Reply = $reply;
            const NAME: &'static str = $name;

            fn into_request(self) -> Request {
                Request::$variant(self)
            }

            fn take_reply(response: Response) -> Result<Self::Reply, Response> {
                match response {
                    Response::$variant(reply) => Ok(reply),
                    other => Err(other),
                }
            }
        }
    };
}

macro_rules! errno_reply {
    ($($reply:ty),* $(,)?) => {
        $(
            impl Reply for $reply {
                fn error(&self) -> Option<&ErrnoError> {
                    self.error.as_ref()
                }
            }
        )*
    };
}

macro_rules! plain_reply {
    ($($reply:ty),* $(,)?) => {
        $(impl Reply for $reply {})*
    };
}

operation!("file_chmod", FileChmod, FileChmodRequest => FileChmodResponse);
operation!("file_close", FileClose, FileCloseRequest => FileCloseResponse);
operation!("file_open", FileOpen, FileOpenRequest => FileOpenResponse);
operation!("file_read", FileRead, FileReadRequest => FileReadResponse);
operation!("file_seek", FileSeek, FileSeekRequest => FileSeekResponse);
operation!("file_stat", FileStat, FileStatRequest => FileStatResponse);
operation!("file_write", FileWrite, FileWriteRequest => FileWriteResponse);
operation!("file_selinux_get_label", FileSelinuxGetLabel, FileSelinuxGetLabelRequest => FileSelinuxGetLabelResponse);
operation!("file_selinux_set_label", FileSelinuxSetLabel, FileSelinuxSetLabelRequest => FileSelinuxSetLabelResponse);
operation!("path_chmod", PathChmod, PathChmodRequest => PathChmodResponse);
operation!("path_copy", PathCopy, PathCopyRequest => PathCopyResponse);
operation!("path_delete", PathDelete, PathDeleteRequest => PathDeleteResponse);
operation!("path_mkdir", PathMkdir, PathMkdirRequest => PathMkdirResponse);
operation!("path_readlink", PathReadlink, PathReadlinkRequest => PathReadlinkResponse);
operation!("path_selinux_get_label", PathSelinuxGetLabel, PathSelinuxGetLabelRequest => PathSelinuxGetLabelResponse);
operation!("path_selinux_set_label", PathSelinuxSetLabel, PathSelinuxSetLabelRequest => PathSelinuxSetLabelResponse);
operation!("path_get_directory_size", PathGetDirectorySize, PathGetDirectorySizeRequest => PathGetDirectorySizeResponse);
operation!("get_version", MbGetVersion, MbGetVersionRequest => MbGetVersionResponse);
operation!("get_installed_roms", MbGetInstalledRoms, MbGetInstalledRomsRequest => MbGetInstalledRomsResponse);
operation!("get_booted_rom_id", MbGetBootedRomId, MbGetBootedRomIdRequest => MbGetBootedRomIdResponse);
operation!("switch_rom", MbSwitchRom, MbSwitchRomRequest => MbSwitchRomResponse);
operation!("set_kernel", MbSetKernel, MbSetKernelRequest => MbSetKernelResponse);
operation!("wipe_rom", MbWipeRom, MbWipeRomRequest => MbWipeRomResponse);
operation!("get_packages_count", MbGetPackagesCount, MbGetPackagesCountRequest => MbGetPackagesCountResponse);
operation!("reboot", Reboot, RebootRequest => RebootResponse);
operation!("shutdown", Shutdown, ShutdownRequest => ShutdownResponse);
operation!("crypto_decrypt", CryptoDecrypt, CryptoDecryptRequest => CryptoDecryptResponse);
operation!("crypto_get_pw_type", CryptoGetPwType, CryptoGetPwTypeRequest => CryptoGetPwTypeResponse);

errno_reply!(
    FileChmodResponse,
    FileCloseResponse,
    FileOpenResponse,
    FileReadResponse,
    FileSeekResponse,
    FileStatResponse,
    FileWriteResponse,
    FileSelinuxGetLabelResponse,
    FileSelinuxSetLabelResponse,
    PathChmodResponse,
    PathCopyResponse,
    PathDeleteResponse,
    PathMkdirResponse,
    PathReadlinkResponse,
    PathSelinuxGetLabelResponse,
    PathSelinuxSetLabelResponse,
    PathGetDirectorySizeResponse,
);

plain_reply!(
    MbGetVersionResponse,
    MbGetInstalledRomsResponse,
    MbGetBootedRomIdResponse,
    MbSwitchRomResponse,
    MbSetKernelResponse,
    MbWipeRomResponse,
    MbGetPackagesCountResponse,
    RebootResponse,
    ShutdownResponse,
    CryptoDecryptResponse,
    CryptoGetPwTypeResponse,
);
