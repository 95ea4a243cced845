use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn index_crawl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_index-crawl"))
}

pub fn index_gen() -> Command {
    Command::new(env!("CARGO_BIN_EXE_index-gen"))
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

/// Write `body` to `dir/relative`, creating parent directories.
pub fn write_document(dir: &Path, relative: &str, body: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create document directory");
    }
    fs::write(&path, body).expect("write index document");
    path
}

/// Minimal index document with one identity-only resource per name.
pub fn index_with(names: &[&str], referrals: &[(&str, u32)]) -> String {
    let mut doc = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><repository xmlns="http://www.osgi.org/xmlns/repository/v1.0.0" name="fixture">"#,
    );
    for (url, depth) in referrals {
        doc.push_str(&format!(r#"<referral url="{url}" depth="{depth}"/>"#));
    }
    for name in names {
        doc.push_str(&format!(
            r#"<resource><capability namespace="osgi.identity"><attribute name="osgi.identity" value="{name}"/><attribute name="version" type="Version" value="1.0.0"/></capability></resource>"#
        ));
    }
    doc.push_str("</repository>");
    doc
}
