//! Thread role tagging.
//!
//! Worker contexts register their role once at spawn time; capability
//! callbacks answer thread-check queries from this tag instead of
//! inspecting OS thread identity.

use std::cell::Cell;

/// Role a thread was given when it was spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRole {
    /// The UI/main thread driving loading, rescans and the periodic tick.
    Main,
    /// The realtime thread driving the process cycle.
    Audio,
    /// A thread that never registered a role.
    Unknown,
}

thread_local! {
    static ROLE: Cell<ThreadRole> = const { Cell::new(ThreadRole::Unknown) };
}

/// Tag the calling thread. Call once right after spawn, before any plugin
/// callback can fire on it.
pub fn register_thread_role(role: ThreadRole) {
    ROLE.with(|cell| cell.set(role));
}

pub fn current_thread_role() -> ThreadRole {
    ROLE.with(|cell| cell.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_unknown() {
        std::thread::spawn(|| {
            assert_eq!(current_thread_role(), ThreadRole::Unknown);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn registered_role_sticks_to_its_thread() {
        register_thread_role(ThreadRole::Main);
        assert_eq!(current_thread_role(), ThreadRole::Main);
        std::thread::spawn(|| {
            register_thread_role(ThreadRole::Audio);
            assert_eq!(current_thread_role(), ThreadRole::Audio);
        })
        .join()
        .unwrap();
        assert_eq!(current_thread_role(), ThreadRole::Main);
    }
}
