//! Meet results page parser for tfrrs.org
//!
//! A meet page carries several tables (team and individual, per gender)
//! introduced by title divs. This picks the requested individual table,
//! maps its columns by header name, and yields the rectangular result set
//! ingestion expects. Splits and other extra columns are ignored.

use anyhow::{bail, Context, Result};
use scraper::{Html, Selector};

use super::Gender;
use crate::storage::repository::{MeetResults, MeetRow};

/// Parse a meet results page into the rows of one individual race.
///
/// Runners marked DNF or DNS are dropped unless the matching flag keeps
/// them. The meet date comes from the page header, with `"Unknown Date"`
/// standing in when the page has none.
pub fn parse_results_page(
    html: &str,
    course_name: &str,
    gender: Gender,
    drop_dnf: bool,
    drop_dns: bool,
) -> Result<MeetResults> {
    let document = Html::parse_document(html);

    let date_selector = Selector::parse("div.panel-heading-normal-text.inline-block").unwrap();
    let date = document
        .select(&date_selector)
        .next()
        .map(|div| div.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "Unknown Date".to_string());

    let title_selector = Selector::parse("div.custom-table-title.custom-table-title-xc").unwrap();
    let heading_selector = Selector::parse("h3.font-weight-500").unwrap();
    let table_selector = Selector::parse("table").unwrap();

    let tables: Vec<_> = document.select(&table_selector).collect();
    let mut results_table = None;
    for (index, title_div) in document.select(&title_selector).enumerate() {
        let Some(heading) = title_div.select(&heading_selector).next() else {
            continue;
        };
        let title = heading.text().collect::<String>().trim().to_string();
        if title.contains("Team") || !gender.matches_title(&title) {
            continue;
        }
        if let Some(table) = tables.get(index) {
            results_table = Some(*table);
            break;
        }
    }
    let Some(table) = results_table else {
        bail!(
            "no individual {:?} results table found on page for {}",
            gender,
            course_name
        );
    };

    let th_selector = Selector::parse("th").unwrap();
    let headers: Vec<String> = table
        .select(&th_selector)
        .map(|th| th.text().collect::<String>().trim().to_string())
        .collect();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("results table for {} has no {} column", course_name, name))
    };
    let place_col = column("PL")?;
    let name_col = column("NAME")?;
    let year_col = column("YEAR")?;
    let team_col = column("TEAM")?;
    let time_col = column("TIME")?;

    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();
    let needed = place_col
        .max(name_col)
        .max(year_col)
        .max(team_col)
        .max(time_col);

    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        // header rows carry th cells
        if row.select(&th_selector).next().is_some() {
            continue;
        }
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() <= needed {
            continue;
        }
        if drop_dnf && cells.iter().any(|c| c == "DNF") {
            continue;
        }
        if drop_dns && cells.iter().any(|c| c == "DNS") {
            continue;
        }
        rows.push(MeetRow {
            place: cells[place_col].clone(),
            name: cells[name_col].clone(),
            eligibility: cells[year_col].clone(),
            school: cells[team_col].clone(),
            raw_time: cells[time_col].clone(),
        });
    }

    Ok(MeetResults {
        course: course_name.to_string(),
        date,
        rows,
    })
}
