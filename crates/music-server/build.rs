use std::env;
use std::process::Command;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Stamps `GIT_SHA` and `BUILD_DATE` into the binary for `/health` and startup logs.
fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    println!("cargo:rustc-env=GIT_SHA={}", git_revision());
    println!("cargo:rustc-env=BUILD_DATE={}", build_timestamp());
}

fn git_revision() -> String {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let rev = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if rev.is_empty() { "unknown".to_string() } else { rev }
        }
        _ => "unknown".to_string(),
    }
}

fn build_timestamp() -> String {
    // Reproducible builds pin the clock through SOURCE_DATE_EPOCH.
    let when = match env::var("SOURCE_DATE_EPOCH").ok().and_then(|v| v.parse::<i64>().ok()) {
        Some(secs) => OffsetDateTime::from_unix_timestamp(secs).unwrap_or_else(|_| OffsetDateTime::now_utc()),
        None => OffsetDateTime::now_utc(),
    };
    when.format(&Rfc3339).unwrap_or_else(|_| "unknown-date".to_string())
}
