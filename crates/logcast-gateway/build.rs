use std::process::Command;

/// Commit reported by `/health`. `LOGCAST_GIT_SHA` wins so builds from a
/// source tarball (no `.git`) can still stamp a revision.
fn git_sha() -> String {
    if let Ok(sha) = std::env::var("LOGCAST_GIT_SHA") {
        if !sha.trim().is_empty() {
            return sha.trim().to_string();
        }
    }
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rustc-env=LOGCAST_GIT_SHA={}", git_sha());
    println!("cargo:rerun-if-env-changed=LOGCAST_GIT_SHA");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}
