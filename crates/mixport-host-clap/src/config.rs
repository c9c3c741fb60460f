//! Host-side configuration supplied by the embedding mixer.

use std::path::PathBuf;

/// Identity and environment the bridge presents to plugins.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub name: String,
    pub vendor: String,
    pub url: String,
    pub version: String,
    /// Roots scanned when a project's saved plugin path no longer resolves.
    pub search_roots: Vec<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "Mixport".into(),
            vendor: "Mixport".into(),
            url: "https://mixport.example".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            search_roots: default_search_roots(),
        }
    }
}

/// Platform CLAP installation directories, extended by `CLAP_PATH`.
pub fn default_search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    #[cfg(target_os = "windows")]
    {
        roots.push(PathBuf::from(r"C:\Program Files\Common Files\CLAP"));
    }

    #[cfg(target_os = "macos")]
    {
        roots.push(PathBuf::from("/Library/Audio/Plug-Ins/CLAP"));
        if let Ok(home) = std::env::var("HOME") {
            roots.push(PathBuf::from(home).join("Library/Audio/Plug-Ins/CLAP"));
        }
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd"))]
    {
        roots.push(PathBuf::from("/usr/lib/clap"));
        roots.push(PathBuf::from("/usr/local/lib/clap"));
        if let Ok(home) = std::env::var("HOME") {
            roots.push(PathBuf::from(&home).join(".clap"));
            roots.push(PathBuf::from(&home).join(".local/lib/clap"));
        }
    }

    if let Ok(extra) = std::env::var("CLAP_PATH") {
        for p in std::env::split_paths(&extra) {
            if !p.as_os_str().is_empty() {
                roots.push(p);
            }
        }
    }

    roots
}
