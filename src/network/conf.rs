//! Minimal `key=value` access to hostapd / wpa_supplicant style config files.

use std::path::Path;

use tokio::fs;

use crate::error::{WifiError, WifiResult};

/// Value of the first uncommented `key=` line
pub fn get_value(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        if line.starts_with('#') {
            return None;
        }
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
    })
}

/// Replace the first `key=` line, or append one if the key is absent
pub fn set_value(content: &str, key: &str, value: &str) -> String {
    let mut replaced = false;
    let mut out: Vec<String> = content
        .lines()
        .map(|line| {
            let is_key = !replaced
                && !line.trim_start().starts_with('#')
                && line
                    .split_once('=')
                    .map(|(k, _)| k.trim() == key)
                    .unwrap_or(false);
            if is_key {
                replaced = true;
                format!("{key}={value}")
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        out.push(format!("{key}={value}"));
    }

    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}

pub async fn read_value(path: &Path, key: &str) -> WifiResult<String> {
    let content = fs::read_to_string(path).await?;
    get_value(&content, key)
        .ok_or_else(|| WifiError::Property(format!("{key} not set in {}", path.display())))
}

pub async fn write_value(path: &Path, key: &str, value: &str) -> WifiResult<()> {
    let content = match fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    fs::write(path, set_value(&content, key, value)).await?;
    Ok(())
}
