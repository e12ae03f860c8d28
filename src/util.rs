use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn require_case_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("case directory does not exist: {}", path.display());
    }
    Ok(())
}

pub fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("input file does not exist: {}", path.display());
    }
    Ok(())
}

pub fn document_basename(path: &Path) -> String {
    path.file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("document")
        .to_string()
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read(path)
        .with_context(|| format!("failed to read json file: {}", path.display()))?;
    serde_json::from_slice(&data)
        .with_context(|| format!("failed to parse json file: {}", path.display()))
}

pub fn run_tool<I, S>(program: &str, args: I, subject: &Path) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to execute {} for {}", program, subject.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} returned non-zero exit status for {}: {}",
            program,
            subject.display(),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).replace('\u{0000}', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_through_nested_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("value.json");

        write_json_pretty(&path, &vec![1_u32, 2, 3]).expect("write");
        let raw = fs::read_to_string(&path).expect("read raw");
        assert!(raw.ends_with("]\n"));

        let restored: Vec<u32> = read_json(&path).expect("read");
        assert_eq!(restored, vec![1, 2, 3]);
    }

    #[test]
    fn missing_case_dir_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(require_case_dir(dir.path()).is_ok());
        assert!(require_case_dir(&dir.path().join("absent")).is_err());
        assert!(require_file(dir.path()).is_err());
    }

    #[test]
    fn sha256_of_known_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").expect("write");
        assert_eq!(
            sha256_file(&path).expect("hash"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn basename_drops_directory_and_extension() {
        assert_eq!(document_basename(Path::new("/cases/a/Vendor TOC.pdf")), "Vendor TOC");
    }
}
