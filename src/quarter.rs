use chrono::{Datelike, NaiveDate};

use crate::error::{Result, YtdError};

/// A calendar quarter. `number` is always 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    pub year: i32,
    pub number: u32,
}

impl Quarter {
    pub fn new(year: i32, number: u32) -> Result<Self> {
        if !(1..=4).contains(&number) {
            return Err(YtdError::InvalidQuarter(number));
        }
        Ok(Self { year, number })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            number: (date.month() - 1) / 3 + 1,
        }
    }

    /// First and last day, both inclusive.
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        let first_month = (self.number - 1) * 3 + 1;
        let start = NaiveDate::from_ymd_opt(self.year, first_month, 1).unwrap_or(NaiveDate::MIN);
        let end = match self.number {
            4 => NaiveDate::from_ymd_opt(self.year, 12, 31),
            _ => NaiveDate::from_ymd_opt(self.year, first_month + 3, 1).and_then(|d| d.pred_opt()),
        }
        .unwrap_or(NaiveDate::MAX);
        (start, end)
    }

    /// 1-based month numbers.
    pub fn months(&self) -> [u32; 3] {
        let first = (self.number - 1) * 3 + 1;
        [first, first + 1, first + 2]
    }

    pub fn ordinal(&self) -> &'static str {
        match self.number {
            1 => "1st",
            2 => "2nd",
            3 => "3rd",
            _ => "4th",
        }
    }

    /// `2025 2nd Quarter YTD.xlsx`
    pub fn ledger_file_name(&self) -> String {
        format!("{} {} Quarter YTD.xlsx", self.year, self.ordinal())
    }

    pub fn sheet_title(&self) -> String {
        format!("Q{} {} YTD", self.number, self.year)
    }

    /// The quarter whose ledger carries forward into this one. None for Q1:
    /// a new year starts from zero.
    pub fn previous(&self) -> Option<Self> {
        match self.number {
            1 => None,
            n => Some(Self {
                year: self.year,
                number: n - 1,
            }),
        }
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{} {}", self.number, self.year)
    }
}
