//! Fixed row and column layout of one endpoint partition.
//!
//! ```text
//! row 1   max of each metric for the newest date
//! row 2   min  "
//! row 3   mean "
//! row 4   column headers
//! row 5+  observations, newest first
//! ```

use crate::store::Row;

/// Logical role of each fixed row at the top of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    MaxSummary,
    MinSummary,
    MeanSummary,
    Header,
}

/// Row number (1-based) of the newest observation.
pub const FIRST_OBSERVATION_ROW: usize = 5;

impl RowRole {
    pub const ALL: [RowRole; 4] = [
        RowRole::MaxSummary,
        RowRole::MinSummary,
        RowRole::MeanSummary,
        RowRole::Header,
    ];

    /// 1-based row number in the partition.
    pub fn row(self) -> usize {
        match self {
            Self::MaxSummary => 1,
            Self::MinSummary => 2,
            Self::MeanSummary => 3,
            Self::Header => 4,
        }
    }

    /// Canonical cell contents for this row.
    pub fn canonical(self) -> Row {
        match self {
            Self::MaxSummary => summary_row("MAXIFS", "Najdłuższy czas z dnia: "),
            Self::MinSummary => summary_row("MINIFS", "Najkrótszy czas z dnia: "),
            Self::MeanSummary => summary_row("AVERAGEIFS", "Średni czas z dnia: "),
            Self::Header => Column::ALL.iter().map(|c| c.header().to_string()).collect(),
        }
    }
}

/// Formula row restricted to rows dated like the newest observation (`A5`).
fn summary_row(function: &str, label: &str) -> Row {
    let first = FIRST_OBSERVATION_ROW;
    let date = Column::Date.letter();

    let mut row = vec![String::new(); Column::BackendSeconds.index()];
    for col in [
        Column::BackendSeconds,
        Column::FrontendSeconds,
        Column::TotalSeconds,
    ] {
        let c = col.letter();
        row.push(format!(
            "={function}({c}{first}:{c}, {date}{first}:{date}, {date}{first})"
        ));
    }
    row.push(label.to_string());
    row.push(format!("={date}{first}"));
    row
}

/// Fixed column order of an observation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Time,
    Endpoint,
    BackendSeconds,
    FrontendSeconds,
    TotalSeconds,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Date,
        Column::Time,
        Column::Endpoint,
        Column::BackendSeconds,
        Column::FrontendSeconds,
        Column::TotalSeconds,
    ];

    /// 0-based cell index within a row.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    pub fn header(self) -> &'static str {
        match self {
            Self::Date => "Data",
            Self::Time => "Godzina",
            Self::Endpoint => "Adres",
            Self::BackendSeconds => "Backend (s)",
            Self::FrontendSeconds => "Frontend (s)",
            Self::TotalSeconds => "Całkowity czas (s)",
        }
    }
}
