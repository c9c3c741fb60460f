//! State blob transport and per-instance project log fields.
//!
//! The blob is opaque: the host's only contract is faithful byte-for-byte
//! transport between the plugin's save/load calls and a file. Both stream
//! directions are pull/push adapters the plugin loops over until its own
//! book-keeping is satisfied.

use core::ffi::c_void;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use clap_abi::{clap_istream, clap_ostream, clap_plugin, clap_plugin_state_t};

use crate::error::HostError;

/// Growing byte sink behind a `clap_ostream`.
struct BlobWriter {
    buffer: Vec<u8>,
}

unsafe extern "C" fn blob_write(
    stream: *const clap_ostream,
    data: *const c_void,
    size: u64,
) -> i64 {
    if stream.is_null() || data.is_null() {
        return -1;
    }
    let writer = &mut *((*stream).ctx as *mut BlobWriter);
    let slice = std::slice::from_raw_parts(data as *const u8, size as usize);
    writer.buffer.extend_from_slice(slice);
    size as i64
}

/// Cursor over a borrowed blob behind a `clap_istream`; returns 0 at end.
struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
}

unsafe extern "C" fn blob_read(
    stream: *const clap_istream,
    buffer: *mut c_void,
    size: u64,
) -> i64 {
    if stream.is_null() || buffer.is_null() {
        return -1;
    }
    let reader = &mut *((*stream).ctx as *mut BlobReader);
    let remaining = reader.data.len() - reader.pos;
    let to_copy = remaining.min(size as usize);
    if to_copy == 0 {
        return 0;
    }
    std::ptr::copy_nonoverlapping(
        reader.data.as_ptr().add(reader.pos),
        buffer as *mut u8,
        to_copy,
    );
    reader.pos += to_copy;
    to_copy as i64
}

/// Pull the plugin's state blob. `Ok(None)` when the plugin exposes no
/// state capability (persistence simply stays disabled).
pub fn save_state(
    plugin: *const clap_plugin,
    state: Option<&clap_plugin_state_t>,
) -> Result<Option<Vec<u8>>, HostError> {
    let Some(save) = state.and_then(|ext| ext.save) else {
        return Ok(None);
    };
    let mut writer = BlobWriter { buffer: Vec::new() };
    let stream = clap_ostream {
        ctx: &mut writer as *mut BlobWriter as *mut c_void,
        write: Some(blob_write),
    };
    if unsafe { save(plugin, &stream) } {
        log::debug!("saved plugin state ({} bytes)", writer.buffer.len());
        Ok(Some(writer.buffer))
    } else {
        Err(HostError::StateRejected)
    }
}

/// Push a previously saved blob back into the plugin. `Ok(false)` when the
/// plugin exposes no state capability.
pub fn load_state(
    plugin: *const clap_plugin,
    state: Option<&clap_plugin_state_t>,
    blob: &[u8],
) -> Result<bool, HostError> {
    let Some(load) = state.and_then(|ext| ext.load) else {
        return Ok(false);
    };
    let mut reader = BlobReader {
        data: blob,
        pos: 0,
    };
    let stream = clap_istream {
        ctx: &mut reader as *mut BlobReader as *mut c_void,
        read: Some(blob_read),
    };
    if unsafe { load(plugin, &stream) } {
        Ok(true)
    } else {
        Err(HostError::StateRejected)
    }
}

/// Write the blob to `path`. I/O failures surface as `StateIoFailed`.
pub fn save_state_to_file(
    plugin: *const clap_plugin,
    state: Option<&clap_plugin_state_t>,
    path: &Path,
) -> Result<bool, HostError> {
    match save_state(plugin, state)? {
        Some(blob) => {
            std::fs::write(path, blob)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Read a blob file and hand it to the plugin. The file is read in full
/// before the plugin sees any of it, so an I/O failure leaves the plugin
/// state untouched.
pub fn restore_state_from_file(
    plugin: *const clap_plugin,
    state: Option<&clap_plugin_state_t>,
    path: &Path,
) -> Result<bool, HostError> {
    let blob = std::fs::read(path)?;
    load_state(plugin, state, &blob)
}

/// Per-instance fields persisted in the project log. The cached port
/// counts keep the mixer strip renderable when the plugin binary is
/// unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub path: PathBuf,
    pub plugin_id: String,
    pub audio_inputs: u32,
    pub audio_outputs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl SessionRecord {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The fake plugin writes its "state" in awkward 7-byte chunks and
    // reads it back through a 16-byte scratch buffer, exercising both
    // stream loops.
    static SAVED: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    fn fixture_blob() -> Vec<u8> {
        (0..300u16).map(|i| (i % 251) as u8).collect()
    }

    unsafe extern "C" fn chunked_save(
        _plugin: *const clap_plugin,
        stream: *const clap_ostream,
    ) -> bool {
        let blob = fixture_blob();
        let write = (*stream).write.unwrap();
        for chunk in blob.chunks(7) {
            let mut written = 0;
            while written < chunk.len() {
                let n = write(
                    stream,
                    chunk[written..].as_ptr() as *const c_void,
                    (chunk.len() - written) as u64,
                );
                if n <= 0 {
                    return false;
                }
                written += n as usize;
            }
        }
        true
    }

    unsafe extern "C" fn looping_load(
        _plugin: *const clap_plugin,
        stream: *const clap_istream,
    ) -> bool {
        let read = (*stream).read.unwrap();
        let mut collected = Vec::new();
        let mut scratch = [0u8; 16];
        loop {
            let n = read(stream, scratch.as_mut_ptr() as *mut c_void, 16);
            if n < 0 {
                return false;
            }
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&scratch[..n as usize]);
        }
        *SAVED.lock().unwrap() = collected;
        true
    }

    unsafe extern "C" fn refusing_save(
        _plugin: *const clap_plugin,
        _stream: *const clap_ostream,
    ) -> bool {
        false
    }

    fn state_ext(
        save: unsafe extern "C" fn(*const clap_plugin, *const clap_ostream) -> bool,
        load: unsafe extern "C" fn(*const clap_plugin, *const clap_istream) -> bool,
    ) -> clap_plugin_state_t {
        clap_plugin_state_t {
            save: Some(save),
            load: Some(load),
        }
    }

    #[test]
    fn blob_round_trips_byte_for_byte() {
        let ext = state_ext(chunked_save, looping_load);
        let blob = save_state(std::ptr::null(), Some(&ext)).unwrap().unwrap();
        assert_eq!(blob, fixture_blob());
        assert!(load_state(std::ptr::null(), Some(&ext), &blob).unwrap());
        assert_eq!(*SAVED.lock().unwrap(), fixture_blob());
    }

    #[test]
    fn missing_state_capability_disables_persistence() {
        assert!(save_state(std::ptr::null(), None).unwrap().is_none());
        assert!(!load_state(std::ptr::null(), None, &[1, 2, 3]).unwrap());
    }

    #[test]
    fn plugin_refusal_is_not_an_io_error() {
        let ext = state_ext(refusing_save, looping_load);
        assert!(matches!(
            save_state(std::ptr::null(), Some(&ext)),
            Err(HostError::StateRejected)
        ));
    }

    #[test]
    fn file_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzz.state");
        let ext = state_ext(chunked_save, looping_load);
        assert!(save_state_to_file(std::ptr::null(), Some(&ext), &path).unwrap());
        assert!(restore_state_from_file(std::ptr::null(), Some(&ext), &path).unwrap());
        assert_eq!(*SAVED.lock().unwrap(), fixture_blob());

        let missing = dir.path().join("gone.state");
        assert!(matches!(
            restore_state_from_file(std::ptr::null(), Some(&ext), &missing),
            Err(HostError::StateIoFailed(_))
        ));
    }

    #[test]
    fn session_record_round_trips_and_omits_empty_state_file() {
        let record = SessionRecord {
            path: PathBuf::from("/plugins/fuzz.clap"),
            plugin_id: "com.example.fuzz".into(),
            audio_inputs: 2,
            audio_outputs: 2,
            state_file: None,
        };
        let json = record.to_json().unwrap();
        assert!(!json.contains("state_file"));
        assert_eq!(SessionRecord::from_json(&json).unwrap(), record);
    }
}
