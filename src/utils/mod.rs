//! Utility functions for whisper

use log::debug;
use std::env;
use std::path::Path;

/// Check if an environment variable is set to a truthy value
/// Accepts: "1", "true", "on", "yes", "t" (case insensitive)
pub fn is_env_true(key: &str) -> bool {
    match env::var(key) {
        Ok(val) => {
            let val_lower = val.to_lowercase();
            matches!(val_lower.as_str(), "1" | "true" | "on" | "yes" | "t")
        }
        Err(_) => false,
    }
}

/// Read a tool override from the environment, falling back to `default`
pub fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => val,
        _ => default.to_string(),
    }
}

/// Resolve an executable name using the PATH environment variable
///
/// Explicit paths (containing a separator) are used as given, except that
/// relative ones are anchored to our current directory: tools are started
/// inside the work directory, where a relative path would no longer resolve.
/// Names that cannot be found on PATH are returned unchanged so the spawn
/// error names the tool.
pub fn resolve_executable(executable: &str) -> String {
    if executable.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(executable);
        if path.is_relative() {
            if let Ok(cwd) = env::current_dir() {
                let anchored = cwd.join(path).to_string_lossy().to_string();
                debug!("🔍 Anchored relative tool '{}' to '{}'", executable, anchored);
                return anchored;
            }
        }
        return executable.to_string();
    }

    match which::which(executable) {
        Ok(path) => {
            let resolved = path.to_string_lossy().to_string();
            debug!("🔍 Resolved executable '{}' to '{}'", executable, resolved);
            resolved
        }
        Err(_) => {
            debug!(
                "⚠️  Could not resolve executable '{}' in PATH, using it verbatim",
                executable
            );
            executable.to_string()
        }
    }
}
