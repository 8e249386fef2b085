// core/src/client.rs
//! Typed wrappers for every non-streaming daemon operation.

use crate::connection::Connection;
use crate::error::{OperationError, Result};
use crate::rpc::message::*;
use std::io::{Read, Write};

/// Aggregated result of a wipe; partial failure is a normal outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WipeResult {
    pub succeeded: Vec<WipeTarget>,
    pub failed: Vec<WipeTarget>,
}

impl WipeResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackageCounts {
    pub system_packages: u32,
    pub system_update_packages: u32,
    pub non_system_packages: u32,
}

fn require(op: &'static str, success: bool) -> Result<()> {
    if success {
        Ok(())
    } else {
        Err(OperationError::Failed { op }.into())
    }
}

impl<S: Read + Write> Connection<S> {
    // --- File descriptor operations ---

    /// Opens `path` in the daemon and returns the remote descriptor id.
    pub fn file_open(&self, path: &str, flags: &[FileOpenFlag], perms: u32) -> Result<i32> {
        let reply = self.call(FileOpenRequest {
            path: path.to_string(),
            flags: flags.to_vec(),
            perms,
        })?;
        Ok(reply.id)
    }

    pub fn file_close(&self, id: i32) -> Result<()> {
        self.call(FileCloseRequest { id })?;
        Ok(())
    }

    pub fn file_chmod(&self, id: i32, mode: u32) -> Result<()> {
        self.call(FileChmodRequest { id, mode })?;
        Ok(())
    }

    /// Reads up to `size` bytes; an empty result means end of file.
    pub fn file_read(&self, id: i32, size: u64) -> Result<Vec<u8>> {
        Ok(self.call(FileReadRequest { id, size })?.data)
    }

    pub fn file_write(&self, id: i32, data: &[u8]) -> Result<u64> {
        let reply = self.call(FileWriteRequest {
            id,
            data: data.to_vec(),
        })?;
        Ok(reply.bytes_written)
    }

    pub fn file_seek(&self, id: i32, offset: i64, whence: Whence) -> Result<i64> {
        Ok(self.call(FileSeekRequest { id, offset, whence })?.offset)
    }

    pub fn file_stat(&self, id: i32) -> Result<StatRecord> {
        let reply = self.call(FileStatRequest { id })?;
        reply
            .stat
            .ok_or_else(|| OperationError::Failed { op: "file_stat" }.into())
    }

    pub fn file_selinux_get_label(&self, id: i32) -> Result<String> {
        Ok(self.call(FileSelinuxGetLabelRequest { id })?.label)
    }

    pub fn file_selinux_set_label(&self, id: i32, label: &str) -> Result<()> {
        self.call(FileSelinuxSetLabelRequest {
            id,
            label: label.to_string(),
        })?;
        Ok(())
    }

    // --- Path operations ---

    pub fn path_chmod(&self, path: &str, mode: u32) -> Result<()> {
        self.call(PathChmodRequest {
            path: path.to_string(),
            mode,
        })?;
        Ok(())
    }

    pub fn path_copy(&self, source: &str, target: &str) -> Result<()> {
        self.call(PathCopyRequest {
            source: source.to_string(),
            target: target.to_string(),
        })?;
        Ok(())
    }

    pub fn path_delete(&self, path: &str, flag: DeleteFlag) -> Result<()> {
        self.call(PathDeleteRequest {
            path: path.to_string(),
            flag,
        })?;
        Ok(())
    }

    pub fn path_mkdir(&self, path: &str, mode: u32, recursive: bool) -> Result<()> {
        self.call(PathMkdirRequest {
            path: path.to_string(),
            mode,
            recursive,
        })?;
        Ok(())
    }

    pub fn path_readlink(&self, path: &str) -> Result<String> {
        Ok(self
            .call(PathReadlinkRequest {
                path: path.to_string(),
            })?
            .target)
    }

    pub fn path_selinux_get_label(&self, path: &str, follow_symlinks: bool) -> Result<String> {
        let reply = self.call(PathSelinuxGetLabelRequest {
            path: path.to_string(),
            follow_symlinks,
        })?;
        Ok(reply.label)
    }

    pub fn path_selinux_set_label(
        &self,
        path: &str,
        label: &str,
        follow_symlinks: bool,
    ) -> Result<()> {
        self.call(PathSelinuxSetLabelRequest {
            path: path.to_string(),
            label: label.to_string(),
            follow_symlinks,
        })?;
        Ok(())
    }

    /// Recursive size of `path` in bytes, skipping directories named in
    /// `exclusions`.
    pub fn path_get_directory_size(&self, path: &str, exclusions: &[&str]) -> Result<u64> {
        let reply = self.call(PathGetDirectorySizeRequest {
            path: path.to_string(),
            exclusions: exclusions.iter().map(|s| s.to_string()).collect(),
        })?;
        Ok(reply.size)
    }

    // --- Environment management ---

    /// Version string reported by the daemon.
    pub fn get_version(&self) -> Result<String> {
        Ok(self.call(MbGetVersionRequest)?.version)
    }

    pub fn get_installed_roms(&self) -> Result<Vec<Rom>> {
        Ok(self.call(MbGetInstalledRomsRequest)?.roms)
    }

    /// Id of the booted environment, `None` when the daemon cannot tell.
    pub fn get_booted_rom_id(&self) -> Result<Option<String>> {
        Ok(self.call(MbGetBootedRomIdRequest)?.rom_id)
    }

    pub fn switch_rom(
        &self,
        rom_id: &str,
        boot_blockdev: &str,
        blockdev_base_dirs: &[&str],
        force_update_checksums: bool,
    ) -> Result<SwitchRomResult> {
        let reply = self.call(MbSwitchRomRequest {
            rom_id: rom_id.to_string(),
            boot_blockdev: boot_blockdev.to_string(),
            blockdev_base_dirs: blockdev_base_dirs.iter().map(|s| s.to_string()).collect(),
            force_update_checksums,
        })?;
        Ok(reply.result)
    }

    pub fn set_kernel(&self, rom_id: &str, boot_blockdev: &str) -> Result<()> {
        let reply = self.call(MbSetKernelRequest {
            rom_id: rom_id.to_string(),
            boot_blockdev: boot_blockdev.to_string(),
        })?;
        require("set_kernel", reply.success)
    }

    pub fn wipe_rom(&self, rom_id: &str, targets: &[WipeTarget]) -> Result<WipeResult> {
        let reply = self.call(MbWipeRomRequest {
            rom_id: rom_id.to_string(),
            targets: targets.to_vec(),
        })?;
        if !reply.failed.is_empty() {
            log::warn!("Wipe of {} left targets {:?} behind", rom_id, reply.failed);
        }
        Ok(WipeResult {
            succeeded: reply.succeeded,
            failed: reply.failed,
        })
    }

    pub fn get_packages_count(&self, rom_id: &str) -> Result<PackageCounts> {
        let reply = self.call(MbGetPackagesCountRequest {
            rom_id: rom_id.to_string(),
        })?;
        require("get_packages_count", reply.success)?;
        Ok(PackageCounts {
            system_packages: reply.system_packages,
            system_update_packages: reply.system_update_packages,
            non_system_packages: reply.non_system_packages,
        })
    }

    // --- Power ---

    /// Reboots through the Android framework, optionally showing its
    /// confirmation dialog.
    pub fn reboot_via_framework(&self, confirm: bool) -> Result<()> {
        self.reboot(RebootMethod::Framework, None, confirm)
    }

    pub fn reboot_via_init(&self, arg: Option<&str>) -> Result<()> {
        self.reboot(RebootMethod::Init, arg, false)
    }

    pub fn reboot_direct(&self, arg: Option<&str>) -> Result<()> {
        self.reboot(RebootMethod::Direct, arg, false)
    }

    fn reboot(&self, method: RebootMethod, arg: Option<&str>, confirm: bool) -> Result<()> {
        let reply = self.call(RebootRequest {
            method,
            arg: arg.map(str::to_string),
            confirm,
        })?;
        require("reboot", reply.success)
    }

    pub fn shutdown_via_init(&self) -> Result<()> {
        self.shutdown(ShutdownMethod::Init)
    }

    pub fn shutdown_direct(&self) -> Result<()> {
        self.shutdown(ShutdownMethod::Direct)
    }

    fn shutdown(&self, method: ShutdownMethod) -> Result<()> {
        let reply = self.call(ShutdownRequest { method })?;
        require("shutdown", reply.success)
    }

    // --- Encryption ---

    /// Returns whether the password unlocked the data partition.
    pub fn crypto_decrypt(&self, password: &str) -> Result<bool> {
        let reply = self.call(CryptoDecryptRequest {
            password: password.to_string(),
        })?;
        Ok(reply.success)
    }

    pub fn crypto_get_pw_type(&self) -> Result<Option<String>> {
        Ok(self.call(CryptoGetPwTypeRequest)?.pw_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::error::{Error, FailureReason};
    use crate::rpc::message::Request;
    use crate::rpc::{receive_envelope, wire};
    use crate::test_support::{LoopbackDaemon, Script, ScriptedStream};
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    fn connect(script: Script) -> (Connection<ScriptedStream>, Arc<Mutex<Vec<u8>>>) {
        let (stream, written) = script.build();
        let connection = Connection::handshake(stream, &ConnectionConfig::default()).unwrap();
        written.lock().unwrap().clear();
        (connection, written)
    }

    fn sent_requests(written: &Arc<Mutex<Vec<u8>>>) -> Vec<Request> {
        let mut cursor = Cursor::new(written.lock().unwrap().clone());
        let mut requests = Vec::new();
        while (cursor.position() as usize) < cursor.get_ref().len() {
            requests.push(receive_envelope(&mut cursor).unwrap());
        }
        requests
    }

    fn no_error() -> Option<ErrnoError> {
        None
    }

    #[test]
    fn partial_wipe_is_reported_not_raised() {
        let (connection, written) = connect(Script::ready("9.3.0").response(&Response::MbWipeRom(
            MbWipeRomResponse {
                succeeded: vec![WipeTarget::Cache, WipeTarget::DalvikCache],
                failed: vec![WipeTarget::System],
            },
        )));

        let targets = [WipeTarget::System, WipeTarget::Cache, WipeTarget::DalvikCache];
        let result = connection.wipe_rom("dual", &targets).unwrap();
        assert_eq!(result.succeeded, vec![WipeTarget::Cache, WipeTarget::DalvikCache]);
        assert_eq!(result.failed, vec![WipeTarget::System]);
        assert!(!result.is_complete());

        assert_eq!(
            sent_requests(&written),
            vec![Request::MbWipeRom(MbWipeRomRequest {
                rom_id: "dual".to_string(),
                targets: targets.to_vec(),
            })]
        );
    }

    #[test]
    fn errno_error_leaves_connection_usable() {
        let (connection, _) = connect(
            Script::ready("9.3.0")
                .response(&Response::PathDelete(PathDeleteResponse {
                    error: Some(ErrnoError {
                        errno: 13,
                        msg: "/system/priv-app".to_string(),
                    }),
                }))
                .response(&Response::PathReadlink(PathReadlinkResponse {
                    target: "/data/app".to_string(),
                    error: no_error(),
                })),
        );

        let err = connection
            .path_delete("/system/priv-app", DeleteFlag::Recursive)
            .unwrap_err();
        assert_eq!(err.operation_error().and_then(|e| e.errno()), Some(13));
        assert!(err.to_string().contains("13"), "{}", err);
        assert!(!err.is_fatal());

        assert_eq!(connection.path_readlink("/app").unwrap(), "/data/app");
    }

    #[test]
    fn sentinels_are_recoverable() {
        let (connection, _) = connect(
            Script::ready("9.3.0")
                .response(&Response::Unsupported)
                .response(&Response::Invalid)
                .response(&Response::CryptoGetPwType(CryptoGetPwTypeResponse {
                    pw_type: Some("pin".to_string()),
                })),
        );

        match connection.path_copy("/a", "/b") {
            Err(Error::Operation(OperationError::Unsupported { op: "path_copy" })) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        match connection.path_chmod("/a", 0o644) {
            Err(Error::Operation(OperationError::InvalidRequest { op: "path_chmod" })) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(connection.crypto_get_pw_type().unwrap().as_deref(), Some("pin"));
    }

    #[test]
    fn mismatched_reply_poisons_connection() {
        let (connection, _) = connect(
            Script::ready("9.3.0")
                .response(&Response::Reboot(RebootResponse { success: true }))
                .response(&Response::MbGetBootedRomId(MbGetBootedRomIdResponse {
                    rom_id: Some("primary".to_string()),
                })),
        );

        let err = connection.file_close(4).unwrap_err();
        assert_eq!(err.reason(), Some(FailureReason::ProtocolError));
        assert!(connection.is_closed());
        assert!(matches!(
            connection.get_booted_rom_id(),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn concurrent_calls_alternate_requests_and_replies() {
        let (daemon, log) = LoopbackDaemon::new(|request| match request {
            Request::MbGetVersion(_) => Response::MbGetVersion(MbGetVersionResponse {
                version: "9.3.0".to_string(),
            }),
            Request::PathReadlink(req) => Response::PathReadlink(PathReadlinkResponse {
                target: format!("{}.target", req.path),
                error: None,
            }),
            other => panic!("unexpected request {:?}", other),
        });
        let connection = Arc::new(Connection::handshake(daemon, &ConnectionConfig::default()).unwrap());

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let connection = Arc::clone(&connection);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        if (worker + i) % 2 == 0 {
                            assert_eq!(connection.get_version().unwrap(), "9.3.0");
                        } else {
                            let path = format!("/dev/block/{}-{}", worker, i);
                            assert_eq!(
                                connection.path_readlink(&path).unwrap(),
                                format!("{}.target", path)
                            );
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.overlaps, 0);
        // Handshake version query plus 100 calls.
        assert_eq!(log.requests.len(), 101);
        assert!(!connection.is_closed());
    }

    #[test]
    fn closed_stream_mid_call_is_a_transport_failure() {
        let (connection, written) = connect(Script::ready("9.3.0"));
        assert_eq!(Arc::strong_count(&written), 2);
        assert!(matches!(
            connection.get_installed_roms(),
            Err(Error::Transport(crate::error::TransportError::Eof))
        ));
        assert!(connection.is_closed());
        // The stream itself was dropped, not just flagged.
        assert_eq!(Arc::strong_count(&written), 1);
    }

    #[test]
    fn boolean_failure_becomes_operation_error() {
        let (connection, _) = connect(
            Script::ready("9.3.0")
                .response(&Response::MbSetKernel(MbSetKernelResponse { success: false }))
                .response(&Response::Reboot(RebootResponse { success: true })),
        );
        match connection.set_kernel("primary", "/dev/block/by-name/boot") {
            Err(Error::Operation(OperationError::Failed { op: "set_kernel" })) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        connection.reboot_via_init(Some("recovery")).unwrap();
    }

    #[test]
    fn file_round_trip_sends_expected_requests() {
        let stat = StatRecord {
            st_mode: 0o100644,
            st_size: 5,
            ..Default::default()
        };
        let (connection, written) = connect(
            Script::ready("9.3.0")
                .response(&Response::FileOpen(FileOpenResponse { id: 7, error: None }))
                .response(&Response::FileStat(FileStatResponse {
                    stat: Some(stat.clone()),
                    error: None,
                }))
                .response(&Response::FileRead(FileReadResponse {
                    data: b"hello".to_vec(),
                    error: None,
                }))
                .response(&Response::FileClose(FileCloseResponse { error: None })),
        );

        let id = connection
            .file_open("/data/system/packages.xml", &[FileOpenFlag::RdOnly], 0)
            .unwrap();
        assert_eq!(id, 7);
        let record = connection.file_stat(id).unwrap();
        assert_eq!(record, stat);
        assert_eq!(record.permissions(), 0o644);
        assert!(!record.is_dir());
        assert_eq!(connection.file_read(id, 4096).unwrap(), b"hello");
        connection.file_close(id).unwrap();

        let requests = sent_requests(&written);
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1], Request::FileStat(FileStatRequest { id: 7 }));
        assert_eq!(requests[3], Request::FileClose(FileCloseRequest { id: 7 }));
    }

    #[test]
    fn packages_count_and_switch_rom() {
        let (connection, _) = connect(
            Script::ready("9.3.0")
                .response(&Response::MbGetPackagesCount(MbGetPackagesCountResponse {
                    success: true,
                    system_packages: 120,
                    system_update_packages: 14,
                    non_system_packages: 37,
                }))
                .response(&Response::MbSwitchRom(MbSwitchRomResponse {
                    result: SwitchRomResult::ChecksumInvalid,
                })),
        );
        let counts = connection.get_packages_count("primary").unwrap();
        assert_eq!(counts.system_packages, 120);
        assert_eq!(counts.non_system_packages, 37);
        assert_eq!(
            connection
                .switch_rom("dual", "/dev/block/by-name/boot", &["/dev/block"], false)
                .unwrap(),
            SwitchRomResult::ChecksumInvalid
        );
    }

    #[test]
    fn handshake_writes_nothing_but_the_version() {
        let (stream, written) = Script::ready("9.3.0").build();
        let _connection = Connection::handshake(stream, &ConnectionConfig::default()).unwrap();
        let mut cursor = Cursor::new(written.lock().unwrap().clone());
        assert_eq!(wire::read_i32(&mut cursor).unwrap(), 3);
    }
}
