// Licensed under the Apache-2.0 license

//! Measured scenarios and the intervals derived from their samples.

use std::fmt;

use clap::ValueEnum;
use latency_messages::{CounterInfo, SyscallSamples};
use serde::{Deserialize, Serialize, Serializer};
use syscounter::{ticks_to_us, CounterSource};

use crate::error::ProbeError;

/// A crossing to measure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Opening a session (`TEEC_OpenSession`).
    OpenSession,
    /// Invoking a command (`TEEC_InvokeCommand`).
    InvokeCommand,
    /// A system call made from inside the trusted application.
    NestedSyscall,
}

impl Scenario {
    /// Every scenario in execution order.
    pub const ALL: [Scenario; 3] = [
        Scenario::OpenSession,
        Scenario::InvokeCommand,
        Scenario::NestedSyscall,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Scenario::OpenSession => "Open session (TEEC_OpenSession)",
            Scenario::InvokeCommand => "Invoke command (TEEC_InvokeCommand)",
            Scenario::NestedSyscall => "System call inside the trusted application",
        }
    }

    /// Labels for the outbound and return legs.
    fn legs(self) -> (&'static str, &'static str) {
        match self {
            Scenario::OpenSession | Scenario::InvokeCommand => (
                "Client -> TA (one way trip)",
                "Client -> Client (round trip)",
            ),
            Scenario::NestedSyscall => ("TA -> TEE core (one way trip)", "TA -> TA (round trip)"),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::OpenSession => "open-session",
            Scenario::InvokeCommand => "invoke-command",
            Scenario::NestedSyscall => "nested-syscall",
        };
        f.write_str(name)
    }
}

/// Frequency and source of one side's counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterDomain {
    pub frequency: u32,
    #[serde(serialize_with = "serialize_source")]
    pub source: Option<CounterSource>,
}

impl CounterDomain {
    pub fn new(frequency: u32, source: CounterSource) -> Self {
        Self {
            frequency,
            source: Some(source),
        }
    }
}

impl From<CounterInfo> for CounterDomain {
    fn from(info: CounterInfo) -> Self {
        Self {
            frequency: info.frequency,
            source: info.source(),
        }
    }
}

fn serialize_source<S: Serializer>(
    source: &Option<CounterSource>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(source.map(CounterSource::name).unwrap_or("unknown"))
}

/// Whether samples from both sides can be subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockSync {
    Shared,
    Unsynchronized,
}

/// Outcome of comparing the local counter with the trusted application's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockCheck {
    pub local: CounterDomain,
    pub remote: CounterDomain,
    pub sync: ClockSync,
}

impl ClockCheck {
    /// Both sides must name the same known source at the same nonzero
    /// frequency.
    pub fn compare(local: CounterDomain, remote: CounterDomain) -> Self {
        let shared = local.source.is_some() && local.frequency != 0 && local == remote;
        Self {
            local,
            remote,
            sync: if shared {
                ClockSync::Shared
            } else {
                ClockSync::Unsynchronized
            },
        }
    }

    pub fn is_shared(&self) -> bool {
        self.sync == ClockSync::Shared
    }
}

/// One labelled counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub label: &'static str,
    pub counter: u64,
}

/// A derived interval, in ticks and microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub label: &'static str,
    pub ticks: u64,
    pub micros: u64,
}

impl Interval {
    fn new(label: &'static str, ticks: u64, frequency: u32) -> Self {
        Self {
            label,
            ticks,
            micros: ticks_to_us(frequency, ticks),
        }
    }
}

/// Samples and intervals for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    /// Frequency the intervals were converted with.
    pub frequency: u32,
    pub samples: Vec<Sample>,
    /// `None` when the samples span two counters that cannot be compared.
    pub one_way: Option<Interval>,
    pub round_trip: Interval,
}

impl ScenarioResult {
    /// A client -> TA -> client crossing: `start` and `end` are local,
    /// `entry` was sampled by the trusted application.
    pub fn crossing(
        scenario: Scenario,
        clock: &ClockCheck,
        start: u64,
        entry: u64,
        end: u64,
    ) -> Result<Self, ProbeError> {
        let (one_way_label, round_trip_label) = scenario.legs();
        let samples = vec![
            Sample {
                label: "Client start",
                counter: start,
            },
            Sample {
                label: "TA entry",
                counter: entry,
            },
            Sample {
                label: "Client return",
                counter: end,
            },
        ];
        let frequency = clock.local.frequency;

        let one_way = if clock.is_shared() {
            ensure_ordered(scenario, &samples)?;
            Some(Interval::new(one_way_label, entry - start, frequency))
        } else {
            ensure_ordered(scenario, &[samples[0], samples[2]])?;
            None
        };

        Ok(Self {
            scenario,
            frequency,
            samples,
            one_way,
            round_trip: Interval::new(round_trip_label, end - start, frequency),
        })
    }

    /// The nested system call: every sample was taken inside the secure
    /// world, so the intervals use the trusted application's frequency.
    pub fn nested(clock: &ClockCheck, samples: SyscallSamples) -> Result<Self, ProbeError> {
        let scenario = Scenario::NestedSyscall;
        let (one_way_label, round_trip_label) = scenario.legs();
        let labelled = vec![
            Sample {
                label: "TA start",
                counter: samples.start,
            },
            Sample {
                label: "TEE core received",
                counter: samples.received,
            },
            Sample {
                label: "TA return",
                counter: samples.returned,
            },
        ];
        ensure_ordered(scenario, &labelled)?;
        let frequency = clock.remote.frequency;

        Ok(Self {
            scenario,
            frequency,
            samples: labelled,
            one_way: Some(Interval::new(
                one_way_label,
                samples.received - samples.start,
                frequency,
            )),
            round_trip: Interval::new(
                round_trip_label,
                samples.returned - samples.start,
                frequency,
            ),
        })
    }
}

fn ensure_ordered(scenario: Scenario, samples: &[Sample]) -> Result<(), ProbeError> {
    for pair in samples.windows(2) {
        if pair[1].counter < pair[0].counter {
            return Err(ProbeError::NonMonotonic {
                scenario,
                earlier: pair[0].label,
                earlier_ticks: pair[0].counter,
                later: pair[1].label,
                later_ticks: pair[1].counter,
            });
        }
    }
    Ok(())
}
