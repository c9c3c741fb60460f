//! Dynamic library loading, entry negotiation and descriptor selection.

use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};

use libloading::Library;

use clap_abi::{
    clap_plugin_descriptor, clap_plugin_entry_t, clap_plugin_factory_t, clap_version_is_compatible,
    CLAP_ENTRY_SYMBOL, CLAP_PLUGIN_FACTORY_ID,
};

use crate::error::HostError;

/// Immutable identity of a plugin selected from a factory.
#[derive(Clone, Debug)]
pub struct PluginDescriptor {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub version: String,
}

fn lossy_string(ptr: *const core::ffi::c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// A dynamically loaded CLAP library with an initialized entry point.
pub struct ClapLibrary {
    path: PathBuf,
    _lib: Library,
    entry: *const clap_plugin_entry_t,
    initialized: bool,
}

unsafe impl Send for ClapLibrary {}

impl ClapLibrary {
    /// Load the library at `path`, resolve `clap_entry`, gate on the entry
    /// protocol version and run `init`. Any failure leaves nothing
    /// registered.
    ///
    /// # Safety
    /// `path` must name a shared library honouring the CLAP ABI.
    pub unsafe fn load<P: AsRef<Path>>(path: P) -> Result<Self, HostError> {
        let path_buf = path.as_ref().to_path_buf();
        let fail = |reason: String| HostError::LoadFailed {
            path: path_buf.clone(),
            reason,
        };

        let lib = Library::new(&path_buf).map_err(|err| fail(err.to_string()))?;
        let entry_sym: libloading::Symbol<*const clap_plugin_entry_t> = lib
            .get(CLAP_ENTRY_SYMBOL)
            .map_err(|err| fail(format!("missing entry symbol: {err}")))?;
        let entry = *entry_sym;
        if entry.is_null() {
            return Err(fail("null entry".into()));
        }

        let version = (*entry).clap_version;
        if !clap_version_is_compatible(version) {
            return Err(HostError::VersionMismatch {
                major: version.major,
                minor: version.minor,
                revision: version.revision,
            });
        }

        let mut initialized = false;
        if let Some(init) = (*entry).init {
            let c_path = CString::new(path_buf.to_string_lossy().as_bytes())
                .map_err(|err| fail(err.to_string()))?;
            initialized = init(c_path.as_ptr());
            if !initialized {
                return Err(fail("entry init returned false".into()));
            }
        }

        log::info!(
            "loaded CLAP library {} (protocol {}.{}.{})",
            path_buf.display(),
            version.major,
            version.minor,
            version.revision
        );

        Ok(Self {
            path: path_buf,
            _lib: lib,
            entry,
            initialized,
        })
    }

    /// Load `path`, falling back to a basename scan of `search_roots` when
    /// the saved location no longer resolves. Tolerates plugins that moved
    /// between machines after a project recorded an absolute path.
    ///
    /// # Safety
    /// See [`ClapLibrary::load`].
    pub unsafe fn load_with_fallback(
        path: &Path,
        search_roots: &[PathBuf],
    ) -> Result<Self, HostError> {
        match Self::load(path) {
            Ok(lib) => Ok(lib),
            Err(err @ HostError::VersionMismatch { .. }) => Err(err),
            Err(primary) => match locate_by_basename(path, search_roots) {
                Some(found) => {
                    log::warn!(
                        "plugin {} not loadable, using relocated copy {}",
                        path.display(),
                        found.display()
                    );
                    Self::load(found)
                }
                None => Err(primary),
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn factory(&self) -> Result<&clap_plugin_factory_t, HostError> {
        let fail = |reason: &str| HostError::LoadFailed {
            path: self.path.clone(),
            reason: reason.into(),
        };
        let get_factory =
            unsafe { (*self.entry).get_factory }.ok_or_else(|| fail("get_factory missing"))?;
        let ptr = unsafe { get_factory(CLAP_PLUGIN_FACTORY_ID.as_ptr() as *const _) }
            as *const clap_plugin_factory_t;
        if ptr.is_null() {
            return Err(fail("null plugin factory"));
        }
        Ok(unsafe { &*ptr })
    }

    /// Enumerate the factory's descriptors.
    pub fn descriptors(&self) -> Result<Vec<PluginDescriptor>, HostError> {
        let factory = self.factory()?;
        Ok(list_descriptors(factory)
            .into_iter()
            .map(|raw| describe(unsafe { &*raw }))
            .collect())
    }

    /// Select the descriptor whose id matches `plugin_id` exactly.
    pub fn find_descriptor(
        &self,
        plugin_id: &str,
    ) -> Result<*const clap_plugin_descriptor, HostError> {
        let factory = self.factory()?;
        for raw in list_descriptors(factory) {
            let descriptor = unsafe { &*raw };
            if lossy_string(descriptor.id) == plugin_id {
                return Ok(raw);
            }
        }
        Err(HostError::DescriptorNotFound(plugin_id.to_owned()))
    }
}

impl Drop for ClapLibrary {
    fn drop(&mut self) {
        unsafe {
            if self.initialized {
                if let Some(deinit) = (*self.entry).deinit {
                    deinit();
                }
            }
        }
    }
}

pub(crate) fn describe(raw: &clap_plugin_descriptor) -> PluginDescriptor {
    PluginDescriptor {
        id: lossy_string(raw.id),
        name: lossy_string(raw.name),
        vendor: lossy_string(raw.vendor),
        version: lossy_string(raw.version),
    }
}

fn list_descriptors(factory: &clap_plugin_factory_t) -> Vec<*const clap_plugin_descriptor> {
    let Some(get_plugin_count) = factory.get_plugin_count else {
        return Vec::new();
    };
    let Some(get_plugin_descriptor) = factory.get_plugin_descriptor else {
        return Vec::new();
    };
    let count = unsafe { get_plugin_count(factory) };
    let mut out = Vec::with_capacity(count as usize);
    for index in 0..count {
        let raw = unsafe { get_plugin_descriptor(factory, index) };
        if raw.is_null() {
            continue;
        }
        out.push(raw);
    }
    out
}

/// Scan the installed-plugin roots for a file with the same basename as the
/// unresolvable `path`.
pub fn locate_by_basename(path: &Path, search_roots: &[PathBuf]) -> Option<PathBuf> {
    let wanted = path.file_name()?;
    for root in search_roots {
        if !root.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(root)
            .follow_links(false)
            .max_depth(8)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && entry.file_name() == wanted {
                return Some(entry.into_path());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_finds_moved_binary_by_basename() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("vendor");
        std::fs::create_dir_all(&nested).unwrap();
        let installed = nested.join("fuzz.clap");
        std::fs::write(&installed, b"stub").unwrap();

        let stale = Path::new("/old/machine/plugins/fuzz.clap");
        let found = locate_by_basename(stale, &[dir.path().to_path_buf()]);
        assert_eq!(found, Some(installed));
    }

    #[test]
    fn locate_gives_up_without_a_match() {
        let dir = tempfile::tempdir().unwrap();
        let stale = Path::new("/old/machine/plugins/fuzz.clap");
        assert!(locate_by_basename(stale, &[dir.path().to_path_buf()]).is_none());
    }
}
