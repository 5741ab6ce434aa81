//! Mock city websites served by wiremock

use std::sync::Arc;

use agenda_get::{Fetcher, HttpConfig, HttpFetcher, Site, SiteTask, Task, catalog};
use chrono::NaiveDate;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Agenda body served for every healthy site
pub const AGENDA_BODY: &str = "%PDF-1.4 agenda\n";

/// Date the fixtures treat as "today"
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 8, 3).unwrap()
}

/// Oakland-style listing page linking to `href`
pub fn oakland_listing(href: &str) -> String {
    format!(
        r#"<html><body><table id="meetings"><tbody>
<tr><td>Aug 5</td><td>6:00</td><td>Planning</td><td>City Hall</td><td><a href="{href}">Agenda</a></td></tr>
</tbody></table></body></html>"#
    )
}

/// San Francisco-style listing page linking to `href`
pub fn san_francisco_listing(href: &str) -> String {
    format!(
        r#"<div class="view-content"><div class="views-row">
<div class="right"><a href="{href}">AGENDA</a></div>
</div></div>"#
    )
}

/// Serve `body` with status 200 at `route`
pub async fn serve(server: &MockServer, route: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

/// Serve a bare status code at `route`
pub async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Catalog site re-pointed at a listing page on the mock server
pub fn mirrored(server: &MockServer, entity: &str, route: &str) -> Site {
    catalog::catalog()
        .into_iter()
        .find(|site| site.entity() == entity)
        .unwrap()
        .with_base_url(format!("{}{route}", server.uri()))
}

/// Wrap sites into tasks sharing one HTTP fetcher
pub fn site_tasks(sites: Vec<Site>) -> Vec<Arc<dyn Task>> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&HttpConfig::default()).unwrap());
    sites
        .into_iter()
        .map(|site| Arc::new(SiteTask::new(site, fetcher.clone(), today())) as Arc<dyn Task>)
        .collect()
}
