//! Booking calendar month widget.
//!
//! [`MonthView`] holds the displayed month and the bounds of what may be
//! picked. It renders a [`MonthGrid`] from the availability set and the
//! current selection; it never fetches anything itself. Month navigation
//! returns the newly displayed month so the caller can refill its cache.
//!
//! A day is selectable only when the availability feed lists it and it is
//! not before the minimum date. Weekends follow the same rule as any other
//! day.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::time::{YearMonth, date_key};

/// Reasons a day cannot be picked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("{0} is not available for booking")]
    Unavailable(NaiveDate),
    #[error("{0} is in the past")]
    BeforeMinimum(NaiveDate),
}

/// How a day cell should be presented.
///
/// Precedence when several apply: selected, then available, then today.
/// "Today" styling therefore only shows on a day that has nothing free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Selected,
    Available,
    Today,
    Unavailable,
}

/// One day in the month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub available: bool,
    pub selectable: bool,
    pub selected: bool,
    pub is_today: bool,
    pub style: CellStyle,
}

impl DayCell {
    pub fn day(&self) -> u32 {
        self.date.day()
    }
}

/// A rendered month: leading blanks followed by one cell per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub month: YearMonth,
    /// `None` for the blank cells before the first day.
    pub cells: Vec<Option<DayCell>>,
    pub can_go_previous: bool,
}

const WEEKDAY_HEADERS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl MonthGrid {
    /// Number of blank cells before the first of the month (Sunday-first).
    pub fn leading_blanks(&self) -> usize {
        self.cells.iter().take_while(|c| c.is_none()).count()
    }

    /// Cells split into weeks of seven (the last week may be shorter).
    pub fn weeks(&self) -> impl Iterator<Item = &[Option<DayCell>]> {
        self.cells.chunks(7)
    }

    /// Looks up the cell for `date`.
    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells.iter().flatten().find(|c| c.date == date)
    }

    /// Plain-text rendering for terminals.
    ///
    /// `[dd]` selected, `*dd` available, `(dd)` today, `dd` otherwise.
    pub fn render_text(&self) -> String {
        let title = MONTH_NAMES[(self.month.month() - 1) as usize];
        let mut lines = vec![format!("{} {}", title, self.month.year())];

        let header: String = WEEKDAY_HEADERS.iter().map(|h| format!("{:>5}", h)).collect();
        lines.push(header);

        for week in self.weeks() {
            let line: String = week
                .iter()
                .map(|cell| match cell {
                    None => format!("{:>5}", ""),
                    Some(cell) => {
                        let token = match cell.style {
                            CellStyle::Selected => format!("[{}]", cell.day()),
                            CellStyle::Available => format!("*{}", cell.day()),
                            CellStyle::Today => format!("({})", cell.day()),
                            CellStyle::Unavailable => cell.day().to_string(),
                        };
                        format!("{:>5}", token)
                    }
                })
                .collect();
            lines.push(line.trim_end().to_string());
        }

        lines.join("\n")
    }
}

/// The calendar's navigation and selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthView {
    today: NaiveDate,
    min_date: NaiveDate,
    displayed: YearMonth,
}

impl MonthView {
    /// Opens on the month of `today`, with `today` as the minimum date.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            min_date: today,
            displayed: YearMonth::of(today),
        }
    }

    /// Sets the earliest selectable date.
    pub fn with_min_date(mut self, min_date: NaiveDate) -> Self {
        self.min_date = min_date;
        self
    }

    /// Displays `month`, clamped to no earlier than the current month.
    pub fn showing(mut self, month: YearMonth) -> Self {
        self.displayed = month.max(self.current_month());
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn min_date(&self) -> NaiveDate {
        self.min_date
    }

    pub fn displayed_month(&self) -> YearMonth {
        self.displayed
    }

    /// The real-world month containing today.
    pub fn current_month(&self) -> YearMonth {
        YearMonth::of(self.today)
    }

    /// Previous-month navigation stops at the current month.
    pub fn can_go_previous(&self) -> bool {
        self.displayed > self.current_month()
    }

    /// Moves back one month. Returns the new month, or `None` when disabled.
    pub fn go_to_previous_month(&mut self) -> Option<YearMonth> {
        if !self.can_go_previous() {
            return None;
        }
        self.displayed = self.displayed.previous();
        Some(self.displayed)
    }

    /// Moves forward one month and returns it.
    pub fn go_to_next_month(&mut self) -> YearMonth {
        self.displayed = self.displayed.next();
        self.displayed
    }

    /// Returns `true` if `date` may be picked given `available`.
    pub fn is_selectable(&self, date: NaiveDate, available: &BTreeSet<NaiveDate>) -> bool {
        date >= self.min_date && available.contains(&date)
    }

    /// Validates a tap on `date`, returning its canonical key.
    pub fn select(
        &self,
        date: NaiveDate,
        available: &BTreeSet<NaiveDate>,
    ) -> Result<String, CalendarError> {
        if date < self.min_date {
            return Err(CalendarError::BeforeMinimum(date));
        }
        if !available.contains(&date) {
            return Err(CalendarError::Unavailable(date));
        }
        Ok(date_key(date))
    }

    /// Renders the displayed month.
    pub fn grid(&self, available: &BTreeSet<NaiveDate>, selected: Option<NaiveDate>) -> MonthGrid {
        let month = self.displayed;
        let blanks = month.first_day().weekday().num_days_from_sunday() as usize;

        let mut cells: Vec<Option<DayCell>> = vec![None; blanks];
        cells.extend(month.days().map(|date| {
            let is_available = available.contains(&date);
            let is_selected = selected == Some(date);
            let is_today = date == self.today;
            let style = if is_selected {
                CellStyle::Selected
            } else if is_available {
                CellStyle::Available
            } else if is_today {
                CellStyle::Today
            } else {
                CellStyle::Unavailable
            };

            Some(DayCell {
                date,
                available: is_available,
                selectable: self.is_selectable(date, available),
                selected: is_selected,
                is_today,
                style,
            })
        }));

        MonthGrid {
            month,
            cells,
            can_go_previous: self.can_go_previous(),
        }
    }
}
