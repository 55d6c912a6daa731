//! # Octo CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! Shared helpers for the integration tests in this directory. Each test
//! file runs the compiled `octo` binary; none of them needs a running engine.
//!

#![allow(dead_code)]

pub use assert_cmd::Command;
use tempfile::TempDir;

/// A command for the compiled `octo` binary.
pub fn octo_cmd() -> Command {
    Command::cargo_bin("octo").expect("Failed to find octo binary for testing")
}

/// A command whose home and config directories point into `home`, so that no
/// user `config.toml` is picked up.
pub fn isolated_octo_cmd(home: &TempDir) -> Command {
    let mut cmd = octo_cmd();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("DOCKER_HOST")
        .env_remove("RUST_LOG");
    cmd
}
