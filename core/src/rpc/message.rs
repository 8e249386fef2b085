// core/src/rpc/message.rs
//! Request and response payloads exchanged with the daemon.
//!
//! One `Request` variant exists per operation and one `Response` variant per
//! reply kind. The byte layout of both unions is the schema shared with the
//! daemon; see [`super::envelope_config`].

use bincode::{Decode, Encode};

/// Error sub-record attached to most replies.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct ErrnoError {
    pub errno: i32,
    pub msg: String,
}

/// Requests sent from the client.
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub enum Request {
    // File descriptor operations
    FileChmod(FileChmodRequest),
    FileClose(FileCloseRequest),
    FileOpen(FileOpenRequest),
    FileRead(FileReadRequest),
    FileSeek(FileSeekRequest),
    FileStat(FileStatRequest),
    FileWrite(FileWriteRequest),
    FileSelinuxGetLabel(FileSelinuxGetLabelRequest),
    FileSelinuxSetLabel(FileSelinuxSetLabelRequest),

    // Path operations
    PathChmod(PathChmodRequest),
    PathCopy(PathCopyRequest),
    PathDelete(PathDeleteRequest),
    PathMkdir(PathMkdirRequest),
    PathReadlink(PathReadlinkRequest),
    PathSelinuxGetLabel(PathSelinuxGetLabelRequest),
    PathSelinuxSetLabel(PathSelinuxSetLabelRequest),
    PathGetDirectorySize(PathGetDirectorySizeRequest),

    // Process execution
    SignedExec(SignedExecRequest),

    // Multiboot environment management
    MbGetVersion(MbGetVersionRequest),
    MbGetInstalledRoms(MbGetInstalledRomsRequest),
    MbGetBootedRomId(MbGetBootedRomIdRequest),
    MbSwitchRom(MbSwitchRomRequest),
    MbSetKernel(MbSetKernelRequest),
    MbWipeRom(MbWipeRomRequest),
    MbGetPackagesCount(MbGetPackagesCountRequest),

    // Power
    Reboot(RebootRequest),
    Shutdown(ShutdownRequest),

    // Encryption
    CryptoDecrypt(CryptoDecryptRequest),
    CryptoGetPwType(CryptoGetPwTypeRequest),
}

/// Replies sent by the daemon.
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub enum Response {
    /// The daemon build does not implement the request kind.
    Unsupported,
    /// The daemon could not make sense of the request.
    Invalid,

    FileChmod(FileChmodResponse),
    FileClose(FileCloseResponse),
    FileOpen(FileOpenResponse),
    FileRead(FileReadResponse),
    FileSeek(FileSeekResponse),
    FileStat(FileStatResponse),
    FileWrite(FileWriteResponse),
    FileSelinuxGetLabel(FileSelinuxGetLabelResponse),
    FileSelinuxSetLabel(FileSelinuxSetLabelResponse),

    PathChmod(PathChmodResponse),
    PathCopy(PathCopyResponse),
    PathDelete(PathDeleteResponse),
    PathMkdir(PathMkdirResponse),
    PathReadlink(PathReadlinkResponse),
    PathSelinuxGetLabel(PathSelinuxGetLabelResponse),
    PathSelinuxSetLabel(PathSelinuxSetLabelResponse),
    PathGetDirectorySize(PathGetDirectorySizeResponse),

    /// Intermediate output of a signed binary.
    SignedExecOutput(SignedExecOutputResponse),
    /// Terminal record of a signed binary execution.
    SignedExec(SignedExecResponse),

    MbGetVersion(MbGetVersionResponse),
    MbGetInstalledRoms(MbGetInstalledRomsResponse),
    MbGetBootedRomId(MbGetBootedRomIdResponse),
    MbSwitchRom(MbSwitchRomResponse),
    MbSetKernel(MbSetKernelResponse),
    MbWipeRom(MbWipeRomResponse),
    MbGetPackagesCount(MbGetPackagesCountResponse),

    Reboot(RebootResponse),
    Shutdown(ShutdownResponse),

    CryptoDecrypt(CryptoDecryptResponse),
    CryptoGetPwType(CryptoGetPwTypeResponse),
}

impl Response {
    /// Tag name used in log lines and protocol error details.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unsupported => "Unsupported",
            Self::Invalid => "Invalid",
            Self::FileChmod(_) => "FileChmod",
            Self::FileClose(_) => "FileClose",
            Self::FileOpen(_) => "FileOpen",
            Self::FileRead(_) => "FileRead",
            Self::FileSeek(_) => "FileSeek",
            Self::FileStat(_) => "FileStat",
            Self::FileWrite(_) => "FileWrite",
            Self::FileSelinuxGetLabel(_) => "FileSelinuxGetLabel",
            Self::FileSelinuxSetLabel(_) => "FileSelinuxSetLabel",
            Self::PathChmod(_) => "PathChmod",
            Self::PathCopy(_) => "PathCopy",
            Self::PathDelete(_) => "PathDelete",
            Self::PathMkdir(_) => "PathMkdir",
            Self::PathReadlink(_) => "PathReadlink",
            Self::PathSelinuxGetLabel(_) => "PathSelinuxGetLabel",
            Self::PathSelinuxSetLabel(_) => "PathSelinuxSetLabel",
            Self::PathGetDirectorySize(_) => "PathGetDirectorySize",
            Self::SignedExecOutput(_) => "SignedExecOutput",
            Self::SignedExec(_) => "SignedExec",
            Self::MbGetVersion(_) => "MbGetVersion",
            Self::MbGetInstalledRoms(_) => "MbGetInstalledRoms",
            Self::MbGetBootedRomId(_) => "MbGetBootedRomId",
            Self::MbSwitchRom(_) => "MbSwitchRom",
            Self::MbSetKernel(_) => "MbSetKernel",
            Self::MbWipeRom(_) => "MbWipeRom",
            Self::MbGetPackagesCount(_) => "MbGetPackagesCount",
            Self::Reboot(_) => "Reboot",
            Self::Shutdown(_) => "Shutdown",
            Self::CryptoDecrypt(_) => "CryptoDecrypt",
            Self::CryptoGetPwType(_) => "CryptoGetPwType",
        }
    }
}

// --- File descriptor operations ---

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOpenFlag {
    Append,
    Creat,
    Excl,
    RdOnly,
    RdWr,
    Trunc,
    WrOnly,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileOpenRequest {
    pub path: String,
    pub flags: Vec<FileOpenFlag>,
    pub perms: u32,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileOpenResponse {
    pub id: i32,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileCloseRequest {
    pub id: i32,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileCloseResponse {
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileChmodRequest {
    pub id: i32,
    pub mode: u32,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileChmodResponse {
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileReadRequest {
    pub id: i32,
    pub size: u64,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileReadResponse {
    pub data: Vec<u8>,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileSeekRequest {
    pub id: i32,
    pub offset: i64,
    pub whence: Whence,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileSeekResponse {
    pub offset: i64,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileStatRequest {
    pub id: i32,
}

/// POSIX `struct stat` as reported by the daemon.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatRecord {
    pub st_dev: u64,
    pub st_ino: u64,
    pub st_mode: u32,
    pub st_nlink: u64,
    pub st_uid: u32,
    pub st_gid: u32,
    pub st_rdev: u64,
    pub st_size: i64,
    pub st_blksize: i64,
    pub st_blocks: i64,
    pub st_atime: i64,
    pub st_mtime: i64,
    pub st_ctime: i64,
}

impl StatRecord {
    pub fn is_dir(&self) -> bool {
        self.st_mode & 0o170000 == 0o040000
    }

    pub fn is_symlink(&self) -> bool {
        self.st_mode & 0o170000 == 0o120000
    }

    pub fn permissions(&self) -> u32 {
        self.st_mode & 0o7777
    }
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileStatResponse {
    pub stat: Option<StatRecord>,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileWriteRequest {
    pub id: i32,
    pub data: Vec<u8>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileWriteResponse {
    pub bytes_written: u64,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileSelinuxGetLabelRequest {
    pub id: i32,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileSelinuxGetLabelResponse {
    pub label: String,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileSelinuxSetLabelRequest {
    pub id: i32,
    pub label: String,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct FileSelinuxSetLabelResponse {
    pub error: Option<ErrnoError>,
}

// --- Path operations ---

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathChmodRequest {
    pub path: String,
    pub mode: u32,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathChmodResponse {
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathCopyRequest {
    pub source: String,
    pub target: String,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathCopyResponse {
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteFlag {
    /// `remove(3)`: file or empty directory.
    Remove,
    Unlink,
    Rmdir,
    Recursive,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathDeleteRequest {
    pub path: String,
    pub flag: DeleteFlag,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathDeleteResponse {
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathMkdirRequest {
    pub path: String,
    pub mode: u32,
    pub recursive: bool,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathMkdirResponse {
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathReadlinkRequest {
    pub path: String,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathReadlinkResponse {
    pub target: String,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathSelinuxGetLabelRequest {
    pub path: String,
    pub follow_symlinks: bool,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathSelinuxGetLabelResponse {
    pub label: String,
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathSelinuxSetLabelRequest {
    pub path: String,
    pub label: String,
    pub follow_symlinks: bool,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathSelinuxSetLabelResponse {
    pub error: Option<ErrnoError>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathGetDirectorySizeRequest {
    pub path: String,
    /// Directory names skipped during the walk.
    pub exclusions: Vec<String>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PathGetDirectorySizeResponse {
    pub size: u64,
    pub error: Option<ErrnoError>,
}

// --- Signed execution ---

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct SignedExecRequest {
    pub binary_path: String,
    pub signature_path: String,
    /// Overrides `argv[0]` when set.
    pub arg0: Option<String>,
    pub args: Vec<String>,
    /// Environment to run the binary against, if not the booted one.
    pub rom_id: Option<String>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct SignedExecOutputResponse {
    pub line: String,
}

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignedExecResult {
    /// Exited normally; `exit_status` is valid.
    Process,
    /// Terminated by a signal; `term_sig` is valid.
    Signaled,
    InvalidSignature,
    OtherError,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct SignedExecResponse {
    pub result: SignedExecResult,
    pub exit_status: i32,
    pub term_sig: i32,
    pub error_msg: Option<String>,
}

// --- Multiboot environment management ---

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetVersionRequest;

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetVersionResponse {
    pub version: String,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetInstalledRomsRequest;

/// An installed environment.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    pub id: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub build: Option<String>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetInstalledRomsResponse {
    pub roms: Vec<Rom>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetBootedRomIdRequest;

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetBootedRomIdResponse {
    pub rom_id: Option<String>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbSwitchRomRequest {
    pub rom_id: String,
    pub boot_blockdev: String,
    pub blockdev_base_dirs: Vec<String>,
    pub force_update_checksums: bool,
}

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchRomResult {
    Succeeded,
    Failed,
    ChecksumInvalid,
    ChecksumNotFound,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbSwitchRomResponse {
    pub result: SwitchRomResult,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbSetKernelRequest {
    pub rom_id: String,
    pub boot_blockdev: String,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbSetKernelResponse {
    pub success: bool,
}

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WipeTarget {
    System,
    Cache,
    Data,
    DalvikCache,
    MultibootDir,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbWipeRomRequest {
    pub rom_id: String,
    pub targets: Vec<WipeTarget>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbWipeRomResponse {
    pub succeeded: Vec<WipeTarget>,
    pub failed: Vec<WipeTarget>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetPackagesCountRequest {
    pub rom_id: String,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct MbGetPackagesCountResponse {
    pub success: bool,
    pub system_packages: u32,
    pub system_update_packages: u32,
    pub non_system_packages: u32,
}

// --- Power ---

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebootMethod {
    /// Ask the Android framework to reboot via an intent.
    Framework,
    /// Set the init property.
    Init,
    /// Call `reboot(2)` from the daemon.
    Direct,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct RebootRequest {
    pub method: RebootMethod,
    /// Reboot argument such as `recovery` or `bootloader`.
    pub arg: Option<String>,
    /// Framework reboots only: show the confirmation dialog.
    pub confirm: bool,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct RebootResponse {
    pub success: bool,
}

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownMethod {
    Init,
    Direct,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct ShutdownRequest {
    pub method: ShutdownMethod,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct ShutdownResponse {
    pub success: bool,
}

// --- Encryption ---

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct CryptoDecryptRequest {
    pub password: String,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct CryptoDecryptResponse {
    pub success: bool,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct CryptoGetPwTypeRequest;

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct CryptoGetPwTypeResponse {
    pub pw_type: Option<String>,
}
