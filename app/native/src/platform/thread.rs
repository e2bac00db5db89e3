//! Named background threads.

use std::thread::{self, JoinHandle};

use crate::constants::APP_ID;

/// Spawns an OS thread named `backdrop-{name}`.
///
/// Returns `None` and logs when the OS refuses to create the thread; callers
/// treat that the same as the capability being unavailable.
pub fn spawn_named_thread<F>(name: &str, task: F) -> Option<JoinHandle<()>>
where F: FnOnce() + Send + 'static {
    let thread_name = format!("{APP_ID}-{name}");

    match thread::Builder::new().name(thread_name.clone()).spawn(task) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::error!(thread = %thread_name, error = %err, "failed to spawn thread");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawned_thread_carries_prefix() {
        let handle = spawn_named_thread("probe", || {
            let name = thread::current().name().map(str::to_string);
            assert_eq!(name.as_deref(), Some("backdrop-probe"));
        })
        .unwrap();

        handle.join().unwrap();
    }
}
