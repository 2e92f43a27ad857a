use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::error::{ArchiveError, Result};

/// Plain request/response access to remote audio.
pub trait Fetcher {
    /// Streams the body of `url` into `destination`.
    /// Any non-success status is a `Download` error carrying the status.
    fn download(&self, url: &str, destination: &Path) -> Result<()>;

    /// Target of the redirect `url` answers with, without following it.
    fn redirect_location(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
    no_redirect: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        let no_redirect = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            no_redirect,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn download(&self, url: &str, destination: &Path) -> Result<()> {
        debug!("downloading {} to {}", url, destination.display());
        let mut response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let file = File::create(destination).map_err(|e| ArchiveError::io(destination, e))?;
        let mut writer = BufWriter::new(file);
        response.copy_to(&mut writer)?;
        writer.flush().map_err(|e| ArchiveError::io(destination, e))
    }

    fn redirect_location(&self, url: &str) -> Result<String> {
        let response = self.no_redirect.get(url).send()?;
        let status = response.status();
        if !status.is_redirection() {
            return Err(ArchiveError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|location| location.to_string())
            .ok_or_else(|| ArchiveError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            })
    }
}
