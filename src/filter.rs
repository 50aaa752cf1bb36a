//! Pure predicate filtering over time-of-day, weekday, and identity.
//!
//! The three predicates are combined with logical AND. Filtering never
//! mutates its input and never fails on well-formed input; it degrades to
//! an empty result.

use std::collections::BTreeSet;

use chrono::{Datelike, Timelike};

use crate::{SignalCollection, SignalRecord};

/// Filter dimensions for a signal collection.
///
/// - Hours are inclusive bounds in 0..=23. If `start_hour > end_hour` the
///   hour predicate matches the empty set of hours (no wraparound).
/// - Weekdays are 0 = Monday .. 6 = Sunday. `None` means all seven;
///   `Some` of an empty set matches nothing.
/// - Identities: `None` means all identities present; `Some` of an empty
///   set matches nothing. The unset/default case is deliberately distinct
///   from an explicitly empty selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterParams {
    pub start_hour: u8,
    pub end_hour: u8,
    pub weekdays: Option<BTreeSet<u8>>,
    pub identities: Option<BTreeSet<String>>,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: 23,
            weekdays: None,
            identities: None,
        }
    }
}

impl FilterParams {
    /// Create params filtering on an inclusive hour range only.
    pub fn new(start_hour: u8, end_hour: u8) -> Self {
        Self {
            start_hour,
            end_hour,
            ..Self::default()
        }
    }

    /// Restrict to a set of weekday numbers (0 = Monday .. 6 = Sunday).
    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = u8>) -> Self {
        self.weekdays = Some(weekdays.into_iter().collect());
        self
    }

    /// Restrict to a set of device identities.
    pub fn with_identities<S: Into<String>>(
        mut self,
        identities: impl IntoIterator<Item = S>,
    ) -> Self {
        self.identities = Some(identities.into_iter().map(Into::into).collect());
        self
    }

    /// Check whether a single record passes all three predicates.
    pub fn matches(&self, record: &SignalRecord) -> bool {
        let hour = record.timestamp.hour() as u8;
        if hour < self.start_hour || hour > self.end_hour {
            return false;
        }

        if let Some(weekdays) = &self.weekdays {
            let weekday = record.timestamp.weekday().num_days_from_monday() as u8;
            if !weekdays.contains(&weekday) {
                return false;
            }
        }

        if let Some(identities) = &self.identities {
            if !identities.contains(&record.registration_id) {
                return false;
            }
        }

        true
    }
}

/// Filter a collection, returning a new collection with the surviving rows
/// in their original order.
pub fn filter_signals(signals: &SignalCollection, params: &FilterParams) -> SignalCollection {
    let records = signals
        .iter()
        .filter(|record| params.matches(record))
        .cloned()
        .collect();
    SignalCollection::from_records(records)
}
