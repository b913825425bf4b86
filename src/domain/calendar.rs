//! Calendar, season and holiday resolution
//!
//! Everything the load model knows about a day besides its temperatures:
//! the French weekday label, the demand season, the composite profile label
//! and the Senegalese public/religious holiday flags.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Weekday labels in the fixed Monday-first order the models were trained with
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Weekday {
    Lundi,
    Mardi,
    Mercredi,
    Jeudi,
    Vendredi,
    Samedi,
    Dimanche,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Lundi,
        Weekday::Mardi,
        Weekday::Mercredi,
        Weekday::Jeudi,
        Weekday::Vendredi,
        Weekday::Samedi,
        Weekday::Dimanche,
    ];

    pub fn from_date(date: NaiveDate) -> Self {
        Self::ALL[date.weekday().num_days_from_monday() as usize]
    }

    /// Position in the label list (0 = lundi). This is the `day_of_week` feature.
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, Weekday::Samedi | Weekday::Dimanche)
    }

    /// Label with an upper-case first letter, for display ("Vendredi")
    pub fn capitalized(self) -> String {
        let label = self.to_string();
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => label,
        }
    }
}

/// Demand season ("Saison de demande")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Season {
    /// Low demand: December to March
    Bas,
    /// April to June and November
    Transition,
    /// High demand: July to October
    Hautes,
    /// Not reachable for a valid month
    Autres,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 | 3 => Season::Bas,
            4 | 5 | 6 | 11 => Season::Transition,
            7 | 8 | 9 | 10 => Season::Hautes,
            _ => Season::Autres,
        }
    }
}

/// Religious holidays whose civil date moves every year
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum VariableEvent {
    Gamou,
    Ramadan,
    Tabaski,
    #[strum(serialize = "korite", to_string = "Korité")]
    Korite,
    Magal,
}

/// Holiday indicators for one date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayFlags {
    pub is_holiday: bool,
    pub is_ramadan: bool,
    pub is_tabaski: bool,
    pub is_korite: bool,
    pub is_gamou: bool,
    pub is_magal: bool,
}

impl HolidayFlags {
    fn mark(&mut self, event: VariableEvent) {
        self.is_holiday = true;
        match event {
            VariableEvent::Gamou => self.is_gamou = true,
            VariableEvent::Ramadan => self.is_ramadan = true,
            VariableEvent::Tabaski => self.is_tabaski = true,
            VariableEvent::Korite => self.is_korite = true,
            VariableEvent::Magal => self.is_magal = true,
        }
    }
}

/// Public holiday that falls on the same month/day every year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedHoliday {
    pub name: String,
    pub month: u32,
    pub day: u32,
}

const FIXED_HOLIDAYS: &[(&str, u32, u32)] = &[
    ("Nouvel An", 1, 1),
    ("Fête du Travail", 5, 1),
    ("Toussaint", 11, 1),
    ("Noël", 12, 25),
    ("Assomption", 8, 15),
];

// (year, event, month, day)
const VARIABLE_HOLIDAYS: &[(i32, VariableEvent, u32, u32)] = &[
    (2024, VariableEvent::Gamou, 9, 15),
    (2024, VariableEvent::Ramadan, 4, 10),
    (2024, VariableEvent::Tabaski, 6, 16),
    (2024, VariableEvent::Korite, 4, 4),
    (2024, VariableEvent::Magal, 5, 20),
    (2025, VariableEvent::Gamou, 9, 4),
    (2025, VariableEvent::Ramadan, 3, 30),
    (2025, VariableEvent::Tabaski, 6, 6),
    (2025, VariableEvent::Korite, 3, 21),
    (2025, VariableEvent::Magal, 5, 9),
];

/// Holiday tables: fixed month/day holidays plus per-year variable events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayCalendar {
    fixed: Vec<FixedHoliday>,
    variable: BTreeMap<i32, BTreeMap<VariableEvent, (u32, u32)>>,
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        let fixed = FIXED_HOLIDAYS
            .iter()
            .map(|(name, month, day)| FixedHoliday {
                name: (*name).to_string(),
                month: *month,
                day: *day,
            })
            .collect();

        let mut variable: BTreeMap<i32, BTreeMap<VariableEvent, (u32, u32)>> = BTreeMap::new();
        for (year, event, month, day) in VARIABLE_HOLIDAYS {
            variable.entry(*year).or_default().insert(*event, (*month, *day));
        }

        Self { fixed, variable }
    }
}

impl HolidayCalendar {
    /// Calendar without any holiday
    pub fn empty() -> Self {
        Self {
            fixed: Vec::new(),
            variable: BTreeMap::new(),
        }
    }

    /// Register (or move) a variable event for the year of `date`
    pub fn set_variable(&mut self, event: VariableEvent, date: NaiveDate) {
        self.variable
            .entry(date.year())
            .or_default()
            .insert(event, (date.month(), date.day()));
    }

    pub fn fixed_holidays(&self) -> &[FixedHoliday] {
        &self.fixed
    }

    /// Years with a variable holiday table
    pub fn supported_years(&self) -> impl Iterator<Item = i32> + '_ {
        self.variable.keys().copied()
    }

    pub fn variable_date(&self, year: i32, event: VariableEvent) -> Option<NaiveDate> {
        let (month, day) = self.variable.get(&year)?.get(&event)?;
        NaiveDate::from_ymd_opt(year, *month, *day)
    }

    /// Holiday flags for a date. Years without a variable table only get fixed holidays.
    pub fn flags(&self, date: NaiveDate) -> HolidayFlags {
        let mut flags = HolidayFlags::default();
        let month_day = (date.month(), date.day());

        if self.fixed.iter().any(|h| (h.month, h.day) == month_day) {
            flags.is_holiday = true;
        }

        if let Some(events) = self.variable.get(&date.year()) {
            for (event, _) in events.iter().filter(|(_, md)| **md == month_day) {
                flags.mark(*event);
            }
        }

        flags
    }

    /// Display names of the holidays on a date: fixed ones first, then variable events
    pub fn holiday_names(&self, date: NaiveDate) -> Vec<String> {
        let month_day = (date.month(), date.day());
        let fixed = self
            .fixed
            .iter()
            .filter(|h| (h.month, h.day) == month_day)
            .map(|h| h.name.clone());
        let variable = self
            .variable
            .get(&date.year())
            .into_iter()
            .flatten()
            .filter(|(_, md)| **md == month_day)
            .map(|(event, _)| event.to_string());
        fixed.chain(variable).collect()
    }

    pub fn resolve(&self, date: NaiveDate) -> CalendarProfile {
        let weekday = Weekday::from_date(date);
        let season = Season::from_month(date.month());
        CalendarProfile {
            date,
            weekday,
            season,
            profile_label: format!("{season} {weekday}"),
            is_weekend: weekday.is_weekend(),
            holidays: self.flags(date),
            holiday_names: self.holiday_names(date),
        }
    }
}

/// Everything derived from the date alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarProfile {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub season: Season,
    /// "<season> <weekday>", e.g. "Hautes lundi"
    pub profile_label: String,
    pub is_weekend: bool,
    pub holidays: HolidayFlags,
    pub holiday_names: Vec<String>,
}
