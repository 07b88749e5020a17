//! Input resolution: turn a user-supplied path or URL into deck bytes.
//!
//! The whole deck is held in memory. It is posted verbatim to the conversion
//! service and parsed from the same buffer, so nothing is ever written to a
//! fixed location on disk. The ZIP magic (`PK\x03\x04`) is checked up front
//! so a stray PDF or text file fails with a clear message instead of a ZIP
//! parser error.

use crate::error::SlideVisualsError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Local file header signature that opens every ZIP (and so every PPTX).
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// A deck loaded into memory.
#[derive(Debug, Clone)]
pub struct DeckInput {
    /// File name used for error messages and the upload to the service.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to deck bytes.
///
/// If the input is a URL, download it. If it is a local file, read it.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<DeckInput, SlideVisualsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SlideVisualsError::InvalidInput {
            input: input.to_string(),
        });
    }

    let deck = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };

    check_zip_magic(&deck.bytes, &deck.name)?;
    Ok(deck)
}

/// Reject buffers that cannot be a PPTX package.
pub fn check_zip_magic(bytes: &[u8], name: &str) -> Result<(), SlideVisualsError> {
    if bytes.len() >= 4 && bytes[..4] == ZIP_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(SlideVisualsError::NotAPresentation {
        name: name.to_string(),
        magic,
    })
}

async fn read_local(path_str: &str) -> Result<DeckInput, SlideVisualsError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => SlideVisualsError::PermissionDenied {
            path: path.clone(),
        },
        _ => SlideVisualsError::FileNotFound { path: path.clone() },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local deck: {} ({} bytes)", path.display(), bytes.len());
    Ok(DeckInput { name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<DeckInput, SlideVisualsError> {
    info!("Downloading deck from: {}", url);

    let failed = |reason: String| SlideVisualsError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SlideVisualsError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            SlideVisualsError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(DeckInput {
        name: file_name_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last path segment of the URL when it looks like a file name.
fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pptx".to_string()
}
