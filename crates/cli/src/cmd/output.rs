//! Shared output formatting for result records.

use actstats_core::resultset::ResultRecord;
use chrono::DateTime;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Last used")]
    last_used: String,
    #[tabled(rename = "Link")]
    link: &'static str,
    #[tabled(rename = "Activities")]
    activities: String,
}

impl From<&ResultRecord> for RecordRow {
    fn from(record: &ResultRecord) -> Self {
        Self {
            resource: record.resource.clone(),
            title: truncate(&record.title, 40),
            score: format!("{:.2}", record.score),
            last_used: format_timestamp(record.last_update),
            link: record.link_status.as_str(),
            activities: record.linked_activities.join(", "),
        }
    }
}

/// One row of a live view.
#[derive(Serialize)]
pub struct RowLine<'a> {
    pub row: usize,
    #[serde(flatten)]
    pub record: &'a ResultRecord,
}

fn format_timestamp(ts: u32) -> String {
    if ts == 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp(i64::from(ts), 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

pub fn print_records_table(records: &[ResultRecord]) {
    if records.is_empty() {
        println!("(no results)");
        return;
    }

    let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!("-- {} results --", records.len());
}

pub fn print_records_json(records: &[ResultRecord]) -> serde_json::Result<()> {
    for record in records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
