//! Known sites and the page logic that finds each one's latest agenda.

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::Site;
use crate::error::{Error, FindError, Result};

const BAKERSFIELD_AGENDA_BASE: &str = "https://bakersfield.novusagenda.com/AgendaPublic/";
const FRESNO_AGENDA_BASE: &str = "https://fresno.legistar.com/";

/// Every site agenda-get knows how to fetch
pub fn catalog() -> Vec<Site> {
    vec![oakland(), bakersfield(), fresno(), san_francisco()]
}

/// Pick sites from the catalog by entity name, keeping catalog order
///
/// An empty selection means every site.
pub fn select(names: &[String]) -> Result<Vec<Site>> {
    let all = catalog();
    if names.is_empty() {
        return Ok(all);
    }

    if let Some(unknown) = names
        .iter()
        .find(|name| !all.iter().any(|site| site.entity() == name.as_str()))
    {
        let known: Vec<&str> = all.iter().map(Site::entity).collect();
        return Err(Error::config(
            "sites",
            format!("unknown site {unknown:?} (known: {})", known.join(", ")),
        ));
    }

    Ok(all
        .into_iter()
        .filter(|site| names.iter().any(|name| name == site.entity()))
        .collect())
}

/// Oakland planning commission
pub fn oakland() -> Site {
    Site::new(
        "oakland",
        "https://www.oaklandca.gov/boards-commissions/planning-commission/meetings",
        "pdf",
        find_oakland,
    )
}

/// Bakersfield planning commission
pub fn bakersfield() -> Site {
    Site::new(
        "bakersfield",
        "https://bakersfield.novusagenda.com/AgendaPublic/?MeetingType=6",
        "pdf",
        find_bakersfield,
    )
}

/// Fresno planning commission
pub fn fresno() -> Site {
    Site::new(
        "fresno",
        "https://fresno.legistar.com/DepartmentDetail.aspx?ID=24452&GUID=26F8DAF5-AC08-46BE-A9E4-EC0C6DDC0F66&Search=",
        "pdf",
        find_fresno,
    )
}

/// San Francisco planning commission
pub fn san_francisco() -> Site {
    Site::new(
        "sanfrancisco",
        "https://sfplanning.org/hearings-cpc",
        "pdf",
        find_san_francisco,
    )
}

fn selector(css: &'static str) -> std::result::Result<Selector, FindError> {
    Selector::parse(css).map_err(|_| FindError::InvalidPattern(css.to_string()))
}

/// First `a` under the `index`-th cell of `row`
fn nth_cell_link<'a>(row: ElementRef<'a>, index: usize) -> Option<ElementRef<'a>> {
    let cells = selector("td").ok()?;
    let links = selector("a").ok()?;
    row.select(&cells)
        .nth(index)
        .and_then(|cell| cell.select(&links).next())
}

fn find_oakland(doc: &Html, _today: NaiveDate) -> std::result::Result<String, FindError> {
    let rows = selector("#meetings tbody tr")?;
    doc.select(&rows)
        .next()
        .and_then(|row| nth_cell_link(row, 4))
        .and_then(|link| link.value().attr("href"))
        .map(str::to_string)
        .ok_or(FindError::MissingAttribute("href"))
}

fn find_bakersfield(doc: &Html, _today: NaiveDate) -> std::result::Result<String, FindError> {
    let rows = selector(
        "#ctl00_ContentPlaceHolder1_SearchAgendasMeetings_radGridMeetings_ctl00 tbody tr",
    )?;
    let script = doc
        .select(&rows)
        .next()
        .and_then(|row| nth_cell_link(row, 4))
        .and_then(|link| link.value().attr("onclick"))
        .ok_or(FindError::MissingAttribute("onclick"))?;

    let quoted = Regex::new("'(.+?)'").map_err(|e| FindError::InvalidPattern(e.to_string()))?;
    let path = quoted
        .captures(script)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| FindError::UnparsableScript(script.to_string()))?;
    Ok(format!("{BAKERSFIELD_AGENDA_BASE}{}", path.as_str()))
}

fn find_fresno(doc: &Html, today: NaiveDate) -> std::result::Result<String, FindError> {
    let rows_sel = selector("#ctl00_ContentPlaceHolder1_gridCalendar_ctl00 tbody tr")?;
    let cells = selector("td")?;

    let meetings: Vec<ElementRef<'_>> = doc.select(&rows_sel).collect();
    if meetings.is_empty() {
        return Err(FindError::NoMeetings);
    }

    // Rows are listed newest first, so the last upcoming row is the next meeting.
    meetings
        .into_iter()
        .filter(|row| {
            row.select(&cells)
                .next()
                .and_then(|cell| meeting_date(&cell.text().collect::<String>()))
                .is_some_and(|date| date > today)
        })
        .last()
        .and_then(|row| nth_cell_link(row, 5))
        .and_then(|link| link.value().attr("href"))
        .map(|href| format!("{FRESNO_AGENDA_BASE}{href}"))
        .ok_or(FindError::MissingAttribute("href"))
}

/// Parse a calendar date like `8/5/2020`
fn meeting_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%m/%d/%Y").ok()
}

fn find_san_francisco(doc: &Html, _today: NaiveDate) -> std::result::Result<String, FindError> {
    let rows = selector("div.view-content div.views-row")?;
    let right = selector("div.right")?;
    let links = selector("a")?;

    doc.select(&rows)
        .next()
        .and_then(|row| {
            row.select(&right)
                .flat_map(|column| column.select(&links))
                .find(|link| link.text().collect::<String>().contains("AGENDA"))
        })
        .and_then(|link| link.value().attr("href"))
        .map(str::to_string)
        .ok_or(FindError::MissingAttribute("href"))
}
