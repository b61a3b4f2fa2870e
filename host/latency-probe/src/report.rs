// Licensed under the Apache-2.0 license

use std::fmt::{self, Write};

use serde::Serialize;
use syscounter::ticks_to_us;

use crate::scenario::{ClockCheck, ClockSync, ScenarioResult};

const RULE: &str = "================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------";

/// Everything measured in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub clock: ClockCheck,
    pub scenarios: Vec<ScenarioResult>,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn write_scenario(f: &mut impl Write, result: &ScenarioResult) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "{}", result.scenario.title())?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Counter frequency: {} Hz", result.frequency)?;
        writeln!(
            f,
            "When                           Counter Value   Interval(us)"
        )?;
        writeln!(f, "{}", THIN_RULE)?;

        let synchronized = result.one_way.is_some();
        let mut previous = None;
        for (index, sample) in result.samples.iter().enumerate() {
            // Without a shared counter the middle sample belongs to the other side.
            let foreign = !synchronized && index == 1;
            let interval = match previous {
                None => "0".to_string(),
                Some(_) if foreign => "-".to_string(),
                Some(prev) => {
                    ticks_to_us(result.frequency, sample.counter.saturating_sub(prev)).to_string()
                }
            };
            writeln!(
                f,
                "{:<27}{:>16}{:>15}",
                sample.label, sample.counter, interval
            )?;
            if !foreign {
                previous = Some(sample.counter);
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", THIN_RULE)?;
        writeln!(f, "Summary")?;
        writeln!(f, "{}", THIN_RULE)?;
        match &result.one_way {
            Some(one_way) => writeln!(
                f,
                "{:<31}= {:>10} ticks {:>10} (us)",
                one_way.label, one_way.ticks, one_way.micros
            )?,
            None => writeln!(
                f,
                "One way trip                   = unsynchronized clocks, comparison invalid"
            )?,
        }
        writeln!(
            f,
            "{:<31}= {:>10} ticks {:>10} (us)",
            result.round_trip.label, result.round_trip.ticks, result.round_trip.micros
        )?;
        writeln!(f)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sync = match self.clock.sync {
            ClockSync::Shared => "shared",
            ClockSync::Unsynchronized => "unsynchronized clocks, one-way comparison invalid",
        };
        writeln!(
            f,
            "Client counter: {} Hz, TA counter: {} Hz ({})",
            self.clock.local.frequency, self.clock.remote.frequency, sync
        )?;
        writeln!(f)?;
        for result in &self.scenarios {
            Self::write_scenario(f, result)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{CounterDomain, Scenario};
    use syscounter::CounterSource;

    fn report(remote_source: CounterSource) -> Report {
        let clock = ClockCheck::compare(
            CounterDomain::new(1_000_000, CounterSource::ArmGenericTimer),
            CounterDomain::new(1_000_000, remote_source),
        );
        let result =
            ScenarioResult::crossing(Scenario::InvokeCommand, &clock, 100, 130, 180).unwrap();
        Report {
            clock,
            scenarios: vec![result],
        }
    }

    fn row(label: &str, counter: u64, interval: impl fmt::Display) -> String {
        format!("{:<27}{:>16}{:>15}", label, counter, interval)
    }

    fn summary(label: &str, ticks: u64, micros: u64) -> String {
        format!("{:<31}= {:>10} ticks {:>10} (us)", label, ticks, micros)
    }

    #[test]
    fn test_text_report() {
        let text = report(CounterSource::ArmGenericTimer).to_string();
        assert!(text.contains("Invoke command (TEEC_InvokeCommand)"));
        assert!(text.contains(&row("TA entry", 130, 30)));
        assert!(text.contains(&row("Client return", 180, 50)));
        let one_way = summary("Client -> TA (one way trip)", 30, 30);
        let round_trip = summary("Client -> Client (round trip)", 80, 80);
        assert!(text.contains(&one_way));
        assert!(text.contains(&round_trip));
    }

    #[test]
    fn test_text_report_unsynchronized() {
        let text = report(CounterSource::HostMonotonic).to_string();
        assert!(text.contains("unsynchronized clocks, comparison invalid"));
        assert!(text.contains(&row("TA entry", 130, "-")));
        assert!(text.contains(&row("Client return", 180, 80)));
    }

    #[test]
    fn test_json_report() {
        let text = report(CounterSource::ArmGenericTimer).to_json().unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["clock"]["sync"], "shared");
        assert_eq!(json["clock"]["local"]["source"], "arm-generic-timer");
        let scenario = &json["scenarios"][0];
        assert_eq!(scenario["scenario"], "invoke-command");
        assert_eq!(scenario["one_way"]["micros"], 30);
        assert_eq!(scenario["round_trip"]["ticks"], 80);
        assert_eq!(scenario["samples"][1]["counter"], 130);
    }

    #[test]
    fn test_json_unsynchronized_one_way_is_null() {
        let text = report(CounterSource::HostMonotonic).to_json().unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["clock"]["sync"], "unsynchronized");
        assert!(json["scenarios"][0]["one_way"].is_null());
    }
}
