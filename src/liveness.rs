//! Per-device liveness state machine.
//!
//! Drives [`DeviceRecord::active_count`] from exchange outcomes and decides
//! when a change is worth reporting. The poll-retry-cadence rule checks the
//! *pre-decrement* failure budget before the decrement is applied — this
//! ordering came from tracing the original firmware's `do_poll`/
//! `device_not_responding` call sequence, not from the distilled wording,
//! which was ambiguous about which side of the decrement the threshold
//! applied to.

use crate::config::BusMasterConfig;
use crate::device::DeviceRecord;
use crate::error::ExchangeError;
use crate::frame::{DiscoverFields, PollFields};
use crate::report::Reporter;

/// Applies a discover exchange outcome to `record` and emits any resulting
/// report line via `reporter`.
///
/// `force_report` is the scheduler's full-report flag: when set, an
/// unchanged-but-active device is still re-announced.
pub(crate) fn apply_discover(
    cfg: &BusMasterConfig,
    record: &mut DeviceRecord,
    dev: u8,
    result: Result<DiscoverFields, ExchangeError>,
    force_report: bool,
    reporter: &mut impl Reporter,
) {
    match result {
        Ok(fields) => {
            let was_inactive = record.active_count == 0;
            let changed = record.poll_interval_s != fields.poll_interval_s
                || record.description != fields.description
                || record.unit != fields.unit;

            if was_inactive {
                record.last_poll_time_ms = 0;
            }
            record.active_count = cfg.max_fail_respond;
            record.poll_interval_s = fields.poll_interval_s;
            record.description = fields.description;
            record.unit = fields.unit;

            if was_inactive || changed || force_report {
                reporter.active(
                    dev,
                    record.poll_interval_s,
                    &record.description,
                    &record.unit,
                );
            }
        }
        Err(ExchangeError::CrcMismatch) => {
            reporter.crc_mismatch(dev);
            on_failure(record, dev, force_report, reporter);
        }
        Err(_) => on_failure(record, dev, force_report, reporter),
    }
}

/// Applies a poll exchange outcome to `record`, implementing the original
/// firmware's fast-retry cadence for the first half of the failure budget.
pub(crate) fn apply_poll(
    cfg: &BusMasterConfig,
    record: &mut DeviceRecord,
    dev: u8,
    result: Result<PollFields, ExchangeError>,
    start_ms: u64,
    reporter: &mut impl Reporter,
) {
    match result {
        Ok(fields) => {
            record.active_count = cfg.max_fail_respond;
            reporter.poll(dev, &fields.value_text);
            record.last_poll_time_ms = start_ms;
        }
        Err(err) => {
            if matches!(err, ExchangeError::Timeout) {
                reporter.poll_timeout(dev);
            }
            if record.active_count <= cfg.max_fail_respond / 2 {
                record.last_poll_time_ms = start_ms;
            }
            on_failure(record, dev, false, reporter);
        }
    }
}

fn on_failure(
    record: &mut DeviceRecord,
    dev: u8,
    force_report: bool,
    reporter: &mut impl Reporter,
) {
    if record.active_count > 0 {
        record.active_count -= 1;
        if record.active_count == 0 {
            record.clear();
            reporter.inactive(dev);
        }
    } else if force_report {
        reporter.inactive(dev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::RecordingReporter;
    use heapless::Vec;

    fn fields(interval: u16, desc: &str, unit: &str) -> DiscoverFields {
        let mut description = Vec::new();
        description.extend_from_slice(desc.as_bytes()).unwrap();
        let mut u = Vec::new();
        u.extend_from_slice(unit.as_bytes()).unwrap();
        DiscoverFields {
            poll_interval_s: interval,
            description,
            unit: u,
        }
    }

    #[test]
    fn first_discover_activates_and_reports() {
        let cfg = BusMasterConfig::default();
        let mut record = DeviceRecord::empty();
        let mut reporter = RecordingReporter::new();

        apply_discover(&cfg, &mut record, 9, Ok(fields(60, "sensor", "C")), false, &mut reporter);

        assert_eq!(record.active_count, cfg.max_fail_respond);
        assert_eq!(record.last_poll_time_ms, 0);
        assert_eq!(reporter.lines[0].as_str(), "ACTIVE 9|60|sensor|C");
    }

    #[test]
    fn unchanged_discover_without_force_report_is_silent() {
        let cfg = BusMasterConfig::default();
        let mut record = DeviceRecord::empty();
        let mut reporter = RecordingReporter::new();
        apply_discover(&cfg, &mut record, 9, Ok(fields(60, "sensor", "C")), false, &mut reporter);
        reporter.lines.clear();

        apply_discover(&cfg, &mut record, 9, Ok(fields(60, "sensor", "C")), false, &mut reporter);

        assert!(reporter.lines.is_empty());
    }

    #[test]
    fn changed_field_reports_even_when_already_active() {
        let cfg = BusMasterConfig::default();
        let mut record = DeviceRecord::empty();
        let mut reporter = RecordingReporter::new();
        apply_discover(&cfg, &mut record, 9, Ok(fields(60, "sensor", "C")), false, &mut reporter);
        reporter.lines.clear();

        apply_discover(&cfg, &mut record, 9, Ok(fields(60, "sensor", "F")), false, &mut reporter);

        assert_eq!(reporter.lines[0].as_str(), "ACTIVE 9|60|sensor|F");
    }

    #[test]
    fn poll_success_refreshes_budget_and_timestamp() {
        let cfg = BusMasterConfig::default();
        let mut record = DeviceRecord::empty();
        record.active_count = 3;
        let mut reporter = RecordingReporter::new();
        let fields = PollFields {
            value_text: {
                let mut v = Vec::new();
                v.extend_from_slice(b"23.5").unwrap();
                v
            },
            value: 23.5,
        };

        apply_poll(&cfg, &mut record, 9, Ok(fields), 1_000, &mut reporter);

        assert_eq!(record.active_count, cfg.max_fail_respond);
        assert_eq!(record.last_poll_time_ms, 1_000);
        assert_eq!(reporter.lines[0].as_str(), "POLL 9 23.5");
    }

    #[test]
    fn poll_failure_decays_and_eventually_reports_inactive() {
        let cfg = BusMasterConfig::default();
        let mut record = DeviceRecord::empty();
        record.active_count = cfg.max_fail_respond;
        let mut reporter = RecordingReporter::new();

        for _ in 0..cfg.max_fail_respond {
            apply_poll(&cfg, &mut record, 9, Err(ExchangeError::Timeout), 0, &mut reporter);
        }

        assert_eq!(record.active_count, 0);
        assert_eq!(reporter.lines.last().unwrap().as_str(), "INACTIVE 9");
    }

    #[test]
    fn fast_retry_cadence_holds_timestamp_above_half_budget() {
        let cfg = BusMasterConfig::default();
        let mut record = DeviceRecord::empty();
        record.active_count = cfg.max_fail_respond;
        record.last_poll_time_ms = 500;
        let mut reporter = RecordingReporter::new();

        // active_count starts above half the budget, so the timestamp is
        // left untouched for a fast retry on the very next sweep.
        apply_poll(&cfg, &mut record, 9, Err(ExchangeError::Timeout), 9_999, &mut reporter);

        assert_eq!(record.last_poll_time_ms, 500);
        assert_eq!(record.active_count, cfg.max_fail_respond - 1);
    }

    #[test]
    fn retry_cadence_updates_timestamp_at_half_budget() {
        let cfg = BusMasterConfig::default();
        let mut record = DeviceRecord::empty();
        record.active_count = cfg.max_fail_respond / 2;
        record.last_poll_time_ms = 500;
        let mut reporter = RecordingReporter::new();

        apply_poll(&cfg, &mut record, 9, Err(ExchangeError::Timeout), 9_999, &mut reporter);

        assert_eq!(record.last_poll_time_ms, 9_999);
    }
}
