use serde::Serialize;

use super::Reading;
use crate::layout::Column;
use crate::store::Row;

/// Max / min / mean breakdown for one metric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub count: u64,
}

impl MetricSummary {
    /// Returns zeroed values if `values` is empty.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut acc: Option<Self> = None;
        let mut sum = 0.0;

        for v in values {
            sum += v;
            acc = Some(match acc {
                None => Self {
                    max: v,
                    min: v,
                    mean: 0.0,
                    count: 1,
                },
                Some(s) => Self {
                    max: s.max.max(v),
                    min: s.min.min(v),
                    mean: 0.0,
                    count: s.count + 1,
                },
            });
        }

        match acc {
            Some(s) => Self {
                mean: sum / s.count as f64,
                ..s
            },
            None => Self::empty(),
        }
    }

    /// All-zero placeholder for a day with no numeric readings.
    pub fn empty() -> Self {
        Self {
            max: 0.0,
            min: 0.0,
            mean: 0.0,
            count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// What the three summary rows of a history show: statistics over every
/// observation sharing the newest observation's date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    /// Date cell of the newest observation row, `None` for an empty history.
    pub date: Option<String>,
    pub backend: MetricSummary,
    pub frontend: MetricSummary,
    pub total: MetricSummary,
}

impl DailySummary {
    /// `rows` are observation rows only, newest first. Marker cells are
    /// skipped the same way `MAXIFS` skips text.
    pub fn from_rows(rows: &[Row]) -> Self {
        let anchor = rows.first().and_then(|r| r.get(Column::Date.index())).cloned();

        let same_day: Vec<&Row> = match &anchor {
            Some(date) => rows
                .iter()
                .filter(|r| r.get(Column::Date.index()) == Some(date))
                .collect(),
            None => Vec::new(),
        };

        let column = |col: Column| {
            MetricSummary::from_values(
                same_day
                    .iter()
                    .filter_map(|r| r.get(col.index()))
                    .filter_map(|cell| Reading::parse(cell).seconds()),
            )
        };

        Self {
            date: anchor,
            backend: column(Column::BackendSeconds),
            frontend: column(Column::FrontendSeconds),
            total: column(Column::TotalSeconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, backend: &str, frontend: &str, total: &str) -> Row {
        vec![
            date.into(),
            "12:00:00".into(),
            "https://example.com/".into(),
            backend.into(),
            frontend.into(),
            total.into(),
        ]
    }

    #[test]
    fn empty_history_has_no_data() {
        let s = DailySummary::from_rows(&[]);
        assert_eq!(s.date, None);
        assert!(!s.total.has_data());
    }

    #[test]
    fn only_newest_date_is_summarised() {
        let rows = vec![
            row("02/03/2024", "0.2", "0.4", "0.6"),
            row("02/03/2024", "0.1", "0.2", "0.3"),
            row("01/03/2024", "5", "5", "10"),
        ];
        let s = DailySummary::from_rows(&rows);
        assert_eq!(s.date.as_deref(), Some("02/03/2024"));
        assert_eq!(s.total.count, 2);
        assert_eq!(s.total.max, 0.6);
        assert_eq!(s.total.min, 0.3);
        assert!((s.total.mean - 0.45).abs() < 1e-9);
        assert_eq!(s.backend.max, 0.2);
    }

    #[test]
    fn sentinel_cells_are_ignored() {
        let rows = vec![
            row("02/03/2024", "Błąd", "Brak", "połączenia"),
            row("02/03/2024", "0.1", "0.2", "0.3"),
        ];
        let s = DailySummary::from_rows(&rows);
        assert_eq!(s.total.count, 1);
        assert_eq!(s.frontend.mean, 0.2);
    }
}
