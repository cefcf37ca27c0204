use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let version = if let Ok(v) = env::var("WHISPER_VERSION") {
        v
    } else {
        // A VERSION file next to the manifest wins over the package version
        let version_file = Path::new("VERSION");
        if version_file.exists() {
            fs::read_to_string(version_file)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap_or_default())
        } else {
            env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.1".to_string())
        }
    };

    println!("cargo:rustc-env=WHISPER_VERSION={}", version);
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-env-changed=WHISPER_VERSION");
}
