//! Slot selection over fetched rows
//!
//! Both functions are pure: same rows in, same row out.

use crate::ned::types::TimeSlotRecord;
use chrono::{DateTime, Utc};

/// Row whose interval contains `now`
///
/// Falls back to the most recent slot that started at or before `now` when no
/// interval contains it, which covers the gap between the end of the last
/// known slot and the next poll. Rows whose timestamps do not parse, or whose
/// interval is empty or inverted, are skipped.
pub fn match_current(rows: &[TimeSlotRecord], now: DateTime<Utc>) -> Option<&TimeSlotRecord> {
    let mut latest_past: Option<(DateTime<Utc>, &TimeSlotRecord)> = None;

    for row in rows {
        let Some((from, to)) = row.interval() else {
            continue;
        };
        if from > now {
            continue;
        }
        if now < to {
            return Some(row);
        }
        if latest_past.is_none_or(|(best, _)| from > best) {
            latest_past = Some((from, row));
        }
    }

    latest_past.map(|(_, row)| row)
}

/// Row with the smallest emission factor; ties go to the earliest row
pub fn min_emission_slot(rows: &[TimeSlotRecord]) -> Option<&TimeSlotRecord> {
    rows.iter()
        .filter_map(|row| {
            row.emissionfactor
                .filter(|ef| ef.is_finite())
                .map(|ef| (ef, row))
        })
        .fold(None, |best: Option<(f64, &TimeSlotRecord)>, (ef, row)| match best {
            Some((best_ef, _)) if best_ef <= ef => best,
            _ => Some((ef, row)),
        })
        .map(|(_, row)| row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ned::types::Classification;
    use chrono::TimeZone;

    fn slot(from_h: u32, to_h: u32, ef: Option<f64>) -> TimeSlotRecord {
        TimeSlotRecord {
            validfrom: format!("2025-10-16T{:02}:00:00Z", from_h),
            validto: format!("2025-10-16T{:02}:00:00Z", to_h),
            emissionfactor: ef,
            classification: Classification::Current,
        }
    }

    fn ef_only(ef: Option<f64>) -> TimeSlotRecord {
        slot(0, 1, ef)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 16, h, m, 0).unwrap()
    }

    #[test]
    fn match_current_picks_containing_interval() {
        let rows = vec![slot(8, 9, Some(100.0)), slot(9, 10, Some(90.0))];
        let hit = match_current(&rows, at(9, 30)).unwrap();
        assert_eq!(hit, &rows[1]);
    }

    #[test]
    fn match_current_start_is_inclusive_end_is_exclusive() {
        let rows = vec![slot(8, 9, Some(100.0)), slot(9, 10, Some(90.0))];
        assert_eq!(match_current(&rows, at(9, 0)), Some(&rows[1]));
        assert_eq!(match_current(&rows, at(8, 0)), Some(&rows[0]));
    }

    #[test]
    fn match_current_falls_back_to_latest_past_slot() {
        let rows = vec![slot(8, 9, Some(100.0))];
        assert_eq!(match_current(&rows, at(9, 30)), Some(&rows[0]));

        let rows = vec![slot(6, 7, Some(1.0)), slot(8, 9, Some(2.0)), slot(7, 8, Some(3.0))];
        assert_eq!(match_current(&rows, at(12, 0)), Some(&rows[1]));
    }

    #[test]
    fn match_current_ignores_future_only_rows() {
        let rows = vec![slot(10, 11, Some(1.0))];
        assert_eq!(match_current(&rows, at(9, 30)), None);
    }

    #[test]
    fn match_current_empty_input() {
        assert_eq!(match_current(&[], at(9, 30)), None);
    }

    #[test]
    fn match_current_skips_malformed_rows() {
        let mut broken = slot(9, 10, Some(5.0));
        broken.validfrom = "yesterday-ish".to_string();
        let inverted = slot(10, 9, Some(6.0));
        let good = slot(8, 9, Some(7.0));
        let rows = vec![broken, inverted, good];
        assert_eq!(match_current(&rows, at(9, 30)), Some(&rows[2]));
    }

    #[test]
    fn min_emission_slot_returns_smallest() {
        let rows = vec![ef_only(Some(120.0)), ef_only(Some(80.0)), ef_only(Some(95.0))];
        assert_eq!(min_emission_slot(&rows), Some(&rows[1]));
    }

    #[test]
    fn min_emission_slot_absent_when_no_factors() {
        let rows = vec![ef_only(None), ef_only(None)];
        assert_eq!(min_emission_slot(&rows), None);
        assert_eq!(min_emission_slot(&[]), None);
    }

    #[test]
    fn min_emission_slot_tie_keeps_first() {
        let rows = vec![slot(1, 2, Some(0.2)), slot(2, 3, Some(0.1)), slot(3, 4, Some(0.1))];
        let best = min_emission_slot(&rows).unwrap();
        assert_eq!(best.validfrom, rows[1].validfrom);
    }

    #[test]
    fn min_emission_slot_ignores_nan() {
        let rows = vec![ef_only(Some(f64::NAN)), ef_only(Some(0.4))];
        assert_eq!(min_emission_slot(&rows), Some(&rows[1]));
    }

    #[test]
    fn selectors_are_idempotent() {
        let rows = vec![slot(8, 9, Some(100.0)), slot(9, 10, Some(90.0)), ef_only(None)];
        let snapshot = rows.clone();
        let now = at(9, 15);
        assert_eq!(match_current(&rows, now), match_current(&rows, now));
        assert_eq!(min_emission_slot(&rows), min_emission_slot(&rows));
        assert_eq!(rows, snapshot);
    }
}
