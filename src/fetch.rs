//! Downloading and unpacking archived site dumps.
//!
//! Dumps live on archive.org as 7z archives. Downloads stream to a
//! `.partial` file renamed into place on success. Extraction shells out to
//! the system `7z` binary since the format has no pure-Rust reader worth
//! depending on.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{CatalogError, Site, SiteCatalog, ARCHIVE_BASE_URL};
use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("no 7z or 7za binary found; install p7zip to unpack site archives")]
    SevenZipMissing,

    #[error("7z exited with {status} while unpacking {}", archive.display())]
    SevenZipFailed {
        status: std::process::ExitStatus,
        archive: PathBuf,
    },
}

/// HTTP client configured for archive.org.
pub fn http_client(config: &FetchConfig) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()?)
}

/// Download and parse the network's site catalog.
pub async fn fetch_sites_catalog(client: &Client) -> Result<SiteCatalog, FetchError> {
    let url = format!("{ARCHIVE_BASE_URL}/Sites.xml");
    debug!("fetching site catalog from {}", url);

    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status {
            status: response.status().as_u16(),
            url,
        });
    }
    let xml = response.text().await?;
    Ok(SiteCatalog::from_xml_str(&xml)?)
}

/// Download one site's dump archive into `dest_dir`, returning its path.
pub async fn download_dump(
    client: &Client,
    site: &Site,
    dest_dir: &Path,
    quiet: bool,
) -> Result<PathBuf, FetchError> {
    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(site.archive_file());
    let url = site.dump_url();
    info!("downloading {}", url);

    let mut response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status {
            status: response.status().as_u16(),
            url,
        });
    }

    let progress_bar = if !quiet {
        let pb = match response.content_length() {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(site.host.clone());
        Some(pb)
    } else {
        None
    };

    let partial = dest.with_extension("7z.partial");
    let mut file = File::create(&partial)?;
    let mut downloaded: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        if let Some(ref pb) = progress_bar {
            pb.set_position(downloaded);
        }
    }
    file.flush()?;
    drop(file);
    fs::rename(&partial, &dest)?;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }
    info!("saved {}", dest.display());
    Ok(dest)
}

/// Unpack a 7z archive into `dest_dir` with the system binary.
///
/// Tries `7z` first, then the standalone `7za` some p7zip packages install
/// instead.
pub fn extract_dump(archive: &Path, dest_dir: &Path) -> Result<(), FetchError> {
    fs::create_dir_all(dest_dir)?;
    info!("extracting {}", archive.display());

    let mut status = None;
    for binary in ["7z", "7za"] {
        match run_7z(binary, archive, dest_dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(FetchError::Io(e)),
            Ok(s) => {
                status = Some(s);
                break;
            }
        }
    }
    let status = status.ok_or(FetchError::SevenZipMissing)?;

    if !status.success() {
        return Err(FetchError::SevenZipFailed {
            status,
            archive: archive.to_path_buf(),
        });
    }
    Ok(())
}

fn run_7z(binary: &str, archive: &Path, dest_dir: &Path) -> std::io::Result<std::process::ExitStatus> {
    Command::new(binary)
        .arg("x")
        .arg("-y")
        .arg(format!("-o{}", dest_dir.display()))
        .arg(archive)
        .stdout(Stdio::null())
        .status()
}

/// Download and unpack one site, returning the directory holding its dump.
pub async fn fetch_site(
    client: &Client,
    site: &Site,
    config: &FetchConfig,
    quiet: bool,
) -> Result<PathBuf, FetchError> {
    let site_dir = config.sources_dir.join(&site.host);
    let archive = download_dump(client, site, &config.sources_dir, quiet).await?;
    extract_dump(&archive, &site_dir)?;
    Ok(site_dir)
}

/// Remove a site's downloaded archive and extracted tree. Called after a
/// successful build when sources are not kept; tolerates paths that are
/// already gone.
pub fn cleanup_site(site: &Site, config: &FetchConfig) -> Result<(), FetchError> {
    let archive = config.sources_dir.join(site.archive_file());
    if archive.exists() {
        fs::remove_file(&archive)?;
        debug!("removed {}", archive.display());
    }
    let site_dir = config.sources_dir.join(&site.host);
    if site_dir.exists() {
        fs::remove_dir_all(&site_dir)?;
        debug!("removed {}", site_dir.display());
    }
    Ok(())
}
