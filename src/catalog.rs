//! Site catalog for the StackExchange archive collection.
//!
//! The archive publishes a `Sites.xml` listing every network site; dump
//! archives are named after the site host, with Stack Overflow split into
//! per-table archives.

use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use url::Url;

/// Base URL of the dump collection.
pub const ARCHIVE_BASE_URL: &str = "https://archive.org/download/stackexchange";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for CatalogError {
    fn from(e: quick_xml::Error) -> Self {
        CatalogError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CatalogError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        CatalogError::Xml(e.to_string())
    }
}

/// One site in the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Host name, e.g. `askubuntu.com`. Used as the source name everywhere.
    pub host: String,
    /// Display name, e.g. `Ask Ubuntu`.
    pub name: String,
}

impl Site {
    /// Archive file holding this site's posts. Stack Overflow is too large
    /// for a single archive and ships one file per table.
    pub fn archive_file(&self) -> String {
        if self.host == "stackoverflow.com" {
            "stackoverflow.com-Posts.7z".to_string()
        } else {
            format!("{}.7z", self.host)
        }
    }

    pub fn dump_url(&self) -> String {
        format!("{}/{}", ARCHIVE_BASE_URL, self.archive_file())
    }
}

/// Parsed `Sites.xml`.
pub struct SiteCatalog {
    sites: Vec<Site>,
}

impl SiteCatalog {
    pub fn from_xml_str(xml: &str) -> Result<Self, CatalogError> {
        let mut reader = Reader::from_str(xml);
        let mut sites = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"row" => {
                    let mut url = None;
                    let mut name = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Url" => {
                                url = attr.unescape_value().ok().map(|v| v.into_owned());
                            }
                            b"Name" => {
                                name = attr.unescape_value().ok().map(|v| v.into_owned());
                            }
                            _ => {}
                        }
                    }
                    if let Some(host) = url.as_deref().and_then(host_of) {
                        sites.push(Site {
                            host,
                            name: name.unwrap_or_default(),
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { sites })
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let xml = fs::read_to_string(path)?;
        Self::from_xml_str(&xml)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Find a site by exact host, or by host prefix as a convenience
    /// (`askubuntu` matches `askubuntu.com`).
    pub fn find(&self, query: &str) -> Option<&Site> {
        self.sites
            .iter()
            .find(|site| site.host == query)
            .or_else(|| {
                self.sites
                    .iter()
                    .find(|site| site.host.starts_with(&format!("{query}.")))
            })
    }

    /// All sites in build order: stackoverflow.com first since it dwarfs
    /// the rest, then the others alphabetically.
    pub fn ordered_for_build(&self) -> Vec<&Site> {
        let mut sites: Vec<&Site> = self.sites.iter().collect();
        sites.sort_by(|a, b| a.host.cmp(&b.host));
        if let Some(pos) = sites.iter().position(|s| s.host == "stackoverflow.com") {
            let stackoverflow = sites.remove(pos);
            sites.insert(0, stackoverflow);
        }
        sites
    }
}

fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
}
