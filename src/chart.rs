//! Doughnut chart of ticket counts.
//!
//! The dashboard renders the three counts as text; the chart widget reads them
//! back once on page load and draws a Chart.js doughnut. The config built here
//! is the same object the shipped script constructs.

use crate::models::TicketCounts;
use serde::Serialize;

pub const CANVAS_ID: &str = "ticketChart";
pub const OPEN_CLASS: &str = "text-primary";
pub const PROGRESS_CLASS: &str = "text-warning";
pub const CLOSED_CLASS: &str = "text-success";

pub const LABELS: [&str; 3] = ["Open", "In Progress", "Closed"];
pub const COLORS: [&str; 3] = ["#0d6efd", "#ffc107", "#198754"];
pub const ANIMATION_MS: u32 = 1000;

/// What the widget can see of the page.
#[derive(Debug, Clone, Default)]
pub struct ChartSnapshot {
    pub canvas_present: bool,
    pub open_text: String,
    pub progress_text: String,
    pub closed_text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartData {
    pub labels: [&'static str; 3],
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub data: [i64; 3],
    pub background_color: [&'static str; 3],
    pub border_width: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartOptions {
    pub plugins: Plugins,
    pub animation: Animation,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Plugins {
    pub legend: Legend,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Legend {
    pub position: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub animate_rotate: bool,
    pub duration: u32,
}

impl ChartConfig {
    pub fn doughnut(values: [i64; 3]) -> Self {
        Self {
            kind: "doughnut",
            data: ChartData {
                labels: LABELS,
                datasets: vec![Dataset {
                    data: values,
                    background_color: COLORS,
                    border_width: 1,
                }],
            },
            options: ChartOptions {
                plugins: Plugins {
                    legend: Legend { position: "bottom" },
                },
                animation: Animation {
                    animate_rotate: true,
                    duration: ANIMATION_MS,
                },
            },
        }
    }

    pub fn values(&self) -> [i64; 3] {
        self.data.datasets.first().map(|d| d.data).unwrap_or([0; 3])
    }
}

/// Integer prefix of `text`, or 0 when there is none.
///
/// Leading whitespace and one sign are accepted, trailing garbage is ignored
/// (`"12 tickets"` is 12). Values outside `i64` saturate.
pub fn parse_count(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for byte in rest.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        seen_digit = true;
        let digit = i64::from(byte - b'0');
        value = value.saturating_mul(10).saturating_add(digit);
    }

    match (seen_digit, negative) {
        (false, _) => 0,
        (true, true) => -value,
        (true, false) => value,
    }
}

/// Builds the chart for a freshly loaded page, or nothing when the page has
/// no chart canvas.
pub fn chart_for_page(snapshot: &ChartSnapshot) -> Option<ChartConfig> {
    if !snapshot.canvas_present {
        return None;
    }
    Some(ChartConfig::doughnut([
        parse_count(&snapshot.open_text),
        parse_count(&snapshot.progress_text),
        parse_count(&snapshot.closed_text),
    ]))
}

pub fn chart_for_counts(counts: TicketCounts) -> ChartConfig {
    let clamp = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);
    ChartConfig::doughnut([
        clamp(counts.open),
        clamp(counts.in_progress),
        clamp(counts.closed),
    ])
}
