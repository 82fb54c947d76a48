use std::path::PathBuf;

/// Resolve the sieve home directory.
///
/// Priority:
/// 1) SIEVE_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.sieve
pub fn sieve_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("SIEVE_HOME") {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".sieve");
    }
    PathBuf::from(".").join(".sieve")
}

/// Default logs directory: ~/.sieve/logs
pub fn default_logs_dir() -> PathBuf {
    sieve_home().join("logs")
}

/// Config file picked up when `--config` is not given: ./sieve.toml
pub fn default_config_path() -> PathBuf {
    PathBuf::from("sieve.toml")
}
