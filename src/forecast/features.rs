//! Feature engineering for the consumption models
//!
//! Builds the 24-row hourly input table for one day and aligns it to the
//! exact column list a trained artifact declares. Categorical columns are
//! one-hot encoded with the first category dropped, which is how the
//! training pipeline encoded them; any dummy column the day does not produce
//! is zero-filled by the final reindex.

use chrono::Datelike;
use itertools::Itertools;

use crate::domain::{CalendarProfile, HourlyTemperatures, HOURS_PER_DAY};
use crate::ml::{FeatureFrame, ModelError};

pub const SEASON_COLUMN: &str = "Saison de demande";
pub const PROFILE_COLUMN: &str = "profil_type";

/// Numeric columns, in assembly order. `is_holiday` is not a model input.
pub const NUMERIC_COLUMNS: [&str; 11] = [
    "year",
    "month",
    "hour",
    "temperature",
    "day_of_week",
    "is_weekend",
    "is_ramadan",
    "is_tabaski",
    "is_korite",
    "is_gamou",
    "is_magal",
];

/// A categorical column before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalColumn {
    pub name: String,
    pub values: Vec<String>,
}

/// One-hot encode a categorical column, dropping the first category.
///
/// Categories are the distinct values in sorted order; each remaining
/// category becomes a `"<name>_<category>"` column of 0/1. A column holding a
/// single category therefore produces no output column at all.
pub fn one_hot_drop_first(column: &CategoricalColumn) -> Vec<(String, Vec<f64>)> {
    column
        .values
        .iter()
        .unique()
        .sorted()
        .skip(1)
        .map(|category| {
            let indicator = column
                .values
                .iter()
                .map(|v| if v == category { 1.0 } else { 0.0 })
                .collect();
            (format!("{}_{}", column.name, category), indicator)
        })
        .collect()
}

/// Reorder a frame to `expected` columns: missing columns are zero-filled,
/// extra columns are dropped.
pub fn reindex(frame: &FeatureFrame, expected: &[String]) -> FeatureFrame {
    let sources: Vec<Option<usize>> = expected.iter().map(|c| frame.column_index(c)).collect();
    let rows = frame
        .rows()
        .iter()
        .map(|row| {
            sources
                .iter()
                .map(|src| src.map_or(0.0, |i| row[i]))
                .collect()
        })
        .collect();

    FeatureFrame::from_aligned(expected.to_vec(), rows)
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Builds model inputs for a day
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self
    }

    /// The encoded table before alignment: numeric columns followed by dummies
    pub fn encode(
        &self,
        profile: &CalendarProfile,
        temperatures: &HourlyTemperatures,
    ) -> Result<FeatureFrame, ModelError> {
        let h = &profile.holidays;
        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut rows: Vec<Vec<f64>> = (0..HOURS_PER_DAY)
            .map(|hour| {
                vec![
                    profile.date.year() as f64,
                    profile.date.month() as f64,
                    hour as f64,
                    temperatures.at(hour),
                    profile.weekday.index() as f64,
                    flag(profile.is_weekend),
                    flag(h.is_ramadan),
                    flag(h.is_tabaski),
                    flag(h.is_korite),
                    flag(h.is_gamou),
                    flag(h.is_magal),
                ]
            })
            .collect();

        let categoricals = [
            CategoricalColumn {
                name: SEASON_COLUMN.to_string(),
                values: vec![profile.season.to_string(); HOURS_PER_DAY],
            },
            CategoricalColumn {
                name: PROFILE_COLUMN.to_string(),
                values: vec![profile.profile_label.clone(); HOURS_PER_DAY],
            },
        ];

        for (name, values) in categoricals.iter().flat_map(one_hot_drop_first) {
            columns.push(name);
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(v);
            }
        }

        FeatureFrame::new(columns, rows)
    }

    /// 24 rows aligned to `expected_columns`. Never fails on schema drift.
    pub fn assemble(
        &self,
        profile: &CalendarProfile,
        temperatures: &HourlyTemperatures,
        expected_columns: &[String],
    ) -> Result<FeatureFrame, ModelError> {
        let encoded = self.encode(profile, temperatures)?;
        Ok(reindex(&encoded, expected_columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HolidayCalendar;
    use chrono::NaiveDate;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tabaski_profile() -> CalendarProfile {
        HolidayCalendar::default().resolve(NaiveDate::from_ymd_opt(2025, 6, 6).unwrap())
    }

    #[test]
    fn test_one_hot_drops_first_sorted_category() {
        let column = CategoricalColumn {
            name: "saison".to_string(),
            values: names(&["Transition", "Bas", "Hautes", "Bas"]),
        };
        let encoded = one_hot_drop_first(&column);

        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[0], ("saison_Hautes".to_string(), vec![0.0, 0.0, 1.0, 0.0]));
        assert_eq!(encoded[1], ("saison_Transition".to_string(), vec![1.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_one_hot_single_category_yields_nothing() {
        let column = CategoricalColumn {
            name: "profil_type".to_string(),
            values: vec!["Transition vendredi".to_string(); 24],
        };
        assert!(one_hot_drop_first(&column).is_empty());
    }

    #[test]
    fn test_encode_day() {
        let frame = FeatureAssembler::new()
            .encode(&tabaski_profile(), &HourlyTemperatures::synthetic())
            .unwrap();

        assert_eq!(frame.columns(), &names(&NUMERIC_COLUMNS)[..]);
        assert_eq!(frame.n_rows(), 24);
        assert_eq!(frame.column("hour").unwrap(), (0..24).map(|h| h as f64).collect::<Vec<_>>());
        assert_eq!(frame.value(5, "temperature"), Some(30.0));
        assert_eq!(frame.value(0, "year"), Some(2025.0));
        assert_eq!(frame.value(0, "month"), Some(6.0));
        assert_eq!(frame.value(0, "day_of_week"), Some(4.0));
        assert_eq!(frame.value(0, "is_weekend"), Some(0.0));
        assert_eq!(frame.value(0, "is_tabaski"), Some(1.0));
        assert_eq!(frame.value(0, "is_ramadan"), Some(0.0));
        assert_eq!(frame.column_index("is_holiday"), None);
    }

    #[test]
    fn test_assemble_zero_fills_missing_columns() {
        let expected = names(&[
            "hour",
            "temperature",
            "profil_type_Transition vendredi",
            "Saison de demande_Transition",
            "is_tabaski",
        ]);
        let frame = FeatureAssembler::new()
            .assemble(&tabaski_profile(), &HourlyTemperatures::synthetic(), &expected)
            .unwrap();

        assert_eq!(frame.columns(), &expected[..]);
        assert_eq!(frame.n_rows(), 24);
        assert_eq!(frame.rows()[8], vec![8.0, 27.0, 0.0, 0.0, 1.0]);
        assert!(frame.column("Saison de demande_Transition").unwrap().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_reindex_drops_extra_columns_and_keeps_order() {
        let frame = FeatureFrame::new(
            names(&["a", "b", "c"]),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        let out = reindex(&frame, &names(&["c", "z", "a"]));

        assert_eq!(out.columns(), &names(&["c", "z", "a"])[..]);
        assert_eq!(out.rows(), &[vec![3.0, 0.0, 1.0], vec![6.0, 0.0, 4.0]]);
    }

    #[test]
    fn test_reindex_to_empty_schema() {
        let frame = FeatureFrame::new(names(&["a"]), vec![vec![1.0]; 3]).unwrap();
        let out = reindex(&frame, &[]);
        assert!(out.columns().is_empty());
        assert_eq!(out.n_rows(), 3);
    }
}
