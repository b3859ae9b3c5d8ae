use std::time::{SystemTime, UNIX_EPOCH};

fn emit_build_version() {
    let n = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    println!("cargo:rustc-env=STAPSH_BUILD_N={n}");
    println!("cargo:rustc-env=STAPSH_DISPLAY_VERSION={version}");
}

fn main() {
    emit_build_version();
}
