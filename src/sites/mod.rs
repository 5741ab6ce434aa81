//! Agenda sources: which page to fetch for each city, how to find the agenda
//! link on it, and the [`Task`] that ties fetching and finding together.
//!
//! Split into focused submodules:
//! - [`catalog`] - the known sites and their link finders
//! - [`fetcher`] - HTTP fetching with cancellation

pub mod catalog;
pub mod fetcher;


use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::Html;
use tokio_util::sync::CancellationToken;

use crate::error::{FindError, TaskError};
use crate::types::{Agenda, Task};

pub use fetcher::{Fetcher, HttpFetcher};

/// Locates the agenda link inside a parsed page
///
/// `today` lets calendar-style pages pick the next upcoming meeting.
pub type Finder = fn(&Html, NaiveDate) -> Result<String, FindError>;

/// A city website publishing planning commission agendas
#[derive(Clone)]
pub struct Site {
    entity: String,
    base_url: String,
    out_ext: String,
    finder: Finder,
}

impl Site {
    /// Describe a site
    pub fn new(
        entity: impl Into<String>,
        base_url: impl Into<String>,
        out_ext: impl Into<String>,
        finder: Finder,
    ) -> Self {
        Self {
            entity: entity.into(),
            base_url: base_url.into(),
            out_ext: out_ext.into(),
            finder,
        }
    }

    /// Point the site at a different listing page, e.g. a mirror
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Short city name, also the task name
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Listing page that links to the latest agenda
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// File name the agenda is saved under
    pub fn output_name(&self) -> String {
        format!("{}.{}", self.entity, self.out_ext)
    }

    /// Find the absolute agenda URL in a fetched listing page
    ///
    /// Relative links are resolved against the listing page URL.
    pub fn find_agenda_url(&self, page: &[u8], today: NaiveDate) -> Result<String, FindError> {
        let link = {
            let doc = Html::parse_document(&String::from_utf8_lossy(page));
            (self.finder)(&doc, today)?
        };
        let resolved = url::Url::parse(&self.base_url).and_then(|base| base.join(&link));
        match resolved {
            Ok(url) => Ok(url.to_string()),
            Err(e) => Err(FindError::InvalidUrl {
                url: link,
                reason: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("entity", &self.entity)
            .field("base_url", &self.base_url)
            .field("out_ext", &self.out_ext)
            .finish_non_exhaustive()
    }
}

/// Fetch a site's listing page, find the agenda link, and open the agenda
pub struct SiteTask {
    site: Site,
    fetcher: Arc<dyn Fetcher>,
    today: NaiveDate,
}

impl SiteTask {
    /// Create a task for `site`, treating `today` as the current date
    pub fn new(site: Site, fetcher: Arc<dyn Fetcher>, today: NaiveDate) -> Self {
        Self {
            site,
            fetcher,
            today,
        }
    }

    fn fetch_error(&self, url: &str, source: crate::error::FetchError) -> TaskError {
        TaskError::Fetch {
            task: self.site.entity.clone(),
            url: url.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Task for SiteTask {
    fn name(&self) -> &str {
        &self.site.entity
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<Agenda, TaskError> {
        let base_url = self.site.base_url();
        let page = self
            .fetcher
            .fetch_bytes(cancel, base_url)
            .await
            .map_err(|source| self.fetch_error(base_url, source))?;

        let agenda_url = match self.site.find_agenda_url(&page, self.today) {
            Ok(url) => url,
            Err(source) => {
                return Err(TaskError::Extraction {
                    task: self.site.entity.clone(),
                    source,
                    content: page,
                });
            }
        };
        tracing::debug!(task = %self.site.entity, url = %agenda_url, "found agenda link");

        let content = self
            .fetcher
            .open(cancel, &agenda_url)
            .await
            .map_err(|source| self.fetch_error(&agenda_url, source))?;

        Ok(Agenda {
            name: self.site.output_name(),
            content,
        })
    }
}
