#![no_main]
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use ned_co2::ned::types::parse_collection;
use ned_co2::ned::{Classification, match_current, min_emission_slot, parse_timestamp};

fuzz_target!(|data: &[u8]| {
    // Raw bytes double as a timestamp candidate
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_timestamp(s);
    }

    let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Exercise the selectors over whatever rows survive parsing
    let rows = parse_collection(&body, Classification::Current);
    let now = Utc.with_ymd_and_hms(2025, 10, 16, 9, 30, 0).single();
    if let Some(now) = now
        && let Some(row) = match_current(&rows, now)
    {
        assert!(row.starts_at().is_some_and(|from| from <= now));
    }
    if let Some(best) = min_emission_slot(&rows) {
        let ef = best.emissionfactor.unwrap_or(f64::NAN);
        assert!(ef.is_finite());
        assert!(rows
            .iter()
            .filter_map(|r| r.emissionfactor)
            .filter(|v| v.is_finite())
            .all(|v| ef <= v));
    }
});
