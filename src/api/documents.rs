use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

/// `data:<mime>;base64,<payload>`, the inline form JSON endpoints expect
/// for embedded documents.
pub fn data_url(bytes: &[u8], file_name: &str) -> String {
    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes))
}

pub fn read_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(data_url(&bytes, &file_name(path)))
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
