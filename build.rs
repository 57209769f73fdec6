//! Embeds a human-readable version string as `BUILD_INFO_HUMAN`.
//!
//! Format: `{CARGO_PKG_VERSION} ({git}) {rustc --version}`, where `{git}` is
//! `git describe --tags --always --dirty` when it names a tag, and
//! `g{short-sha}[-dirty] {commit-date}` otherwise. Parts that cannot be
//! determined are left out.

use std::process::Command;

use chrono::{DateTime, Utc};

fn main() {
    for path in ["src", "prompts", "build.rs", "Cargo.toml"] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn git_version() -> Option<String> {
    let describe = run("git", &["describe", "--tags", "--always", "--dirty"])?;
    // Without tags, describe only yields the abbreviated hash.
    if describe.contains("-g") || describe.starts_with('v') {
        return Some(describe);
    }

    let commit_date = run("git", &["log", "-1", "--format=%ct"])
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|date| date.format("%Y-%m-%d").to_string());

    Some(match commit_date {
        Some(date) => format!("g{describe} {date}"),
        None => format!("g{describe}"),
    })
}

fn build_info() -> String {
    [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        git_version().map(|version| format!("({version})")),
        run("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}
