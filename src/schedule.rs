//! Reading-schedule loader.
//!
//! The schedule is a flat UTF-8 text file made of day blocks:
//!
//! ```text
//! День первый
//! 1
//! Быт. 1
//! Мф. 1:1-17
//! ```
//!
//! A marker line opens a day (the whole line is its label), a digits-only
//! line sets the day's number, and every other non-blank line is a raw
//! chapter reference.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

/// Marker word that opens a day block.
pub const DEFAULT_DAY_MARKER: &str = "День";

/// One day of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Day {
    pub label: String,
    pub number: Option<u32>,
    pub references: Vec<String>,
}

impl Day {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            number: None,
            references: Vec::new(),
        }
    }
}

/// Parsed schedule in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    days: Vec<Day>,
}

/// Days arranged for output.
#[derive(Debug, Default)]
pub struct ReadingOrder<'a> {
    /// Days to produce, ascending by number.
    pub days: Vec<&'a Day>,
    /// Days with no number line; never produced.
    pub unnumbered: Vec<&'a Day>,
    /// Days whose number was claimed again by a later day in the file.
    pub superseded: Vec<&'a Day>,
}

impl Schedule {
    /// Parse schedule text using [`DEFAULT_DAY_MARKER`].
    pub fn parse(text: &str) -> Self {
        Self::parse_with_marker(text, DEFAULT_DAY_MARKER)
    }

    pub fn parse_with_marker(text: &str, marker: &str) -> Self {
        let mut days: Vec<Day> = Vec::new();
        let mut current: Option<usize> = None;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if is_day_marker(line, marker) {
                // A repeated label replaces the earlier block in place.
                let idx = match days.iter().position(|d| d.label == line) {
                    Some(idx) => {
                        warn!(label = line, line = line_no + 1, "Day label repeated; earlier block replaced");
                        days[idx] = Day::new(line);
                        idx
                    }
                    None => {
                        days.push(Day::new(line));
                        days.len() - 1
                    }
                };
                current = Some(idx);
                continue;
            }

            let Some(idx) = current else {
                debug!(line = line_no + 1, text = line, "Ignoring line before first day");
                continue;
            };

            if line.bytes().all(|b| b.is_ascii_digit())
                && let Ok(number) = line.parse::<u32>()
            {
                days[idx].number = Some(number);
            } else {
                days[idx].references.push(line.to_string());
            }
        }

        Self { days }
    }

    /// Read and parse a schedule file.
    pub fn load<P: AsRef<Path>>(path: P, marker: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse_with_marker(&text, marker))
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn get(&self, label: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.label == label)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Arrange days by ascending number.
    ///
    /// When two days share a number the later one in the file wins. Days
    /// without a number are set aside rather than guessed at.
    pub fn reading_order(&self) -> ReadingOrder<'_> {
        let mut by_number: BTreeMap<u32, &Day> = BTreeMap::new();
        let mut order = ReadingOrder::default();

        for day in &self.days {
            match day.number {
                Some(number) => {
                    if let Some(previous) = by_number.insert(number, day) {
                        order.superseded.push(previous);
                    }
                }
                None => order.unnumbered.push(day),
            }
        }

        order.days = by_number.into_values().collect();
        order
    }
}

fn is_day_marker(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}
