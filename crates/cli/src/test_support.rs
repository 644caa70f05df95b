use std::sync::{Mutex, MutexGuard, OnceLock};

/// Environment variables `Config::load` reads as overrides.
pub(crate) const OVERRIDE_VARS: &[&str] = &[
    "INCOGNITO_TOKEN",
    "GITHUB_TOKEN",
    "INCOGNITO_MODEL",
    "INCOGNITO_ENDPOINT",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Exclusive access to the config overrides for one test body.
///
/// Holds the process-wide env lock, starts with every override unset and
/// restores the previous values when dropped.
pub(crate) struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _guard: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    pub(crate) fn clean() -> Self {
        let guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in OVERRIDE_VARS {
            remove_env_var(key);
        }
        Self {
            saved,
            _guard: guard,
        }
    }

    pub(crate) fn set(&self, key: &str, value: &str) {
        set_env_var(key, value);
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => set_env_var(key, value),
                None => remove_env_var(key),
            }
        }
    }
}

fn set_env_var(key: &str, value: &str) {
    // SAFETY: callers hold the env lock through `ScopedEnv`.
    unsafe {
        std::env::set_var(key, value);
    }
}

fn remove_env_var(key: &str) {
    // SAFETY: callers hold the env lock through `ScopedEnv`.
    unsafe {
        std::env::remove_var(key);
    }
}
