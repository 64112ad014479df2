//! Run length and forcing cadence.
//!
//! A run is described either by its end time in seconds or by a number of
//! forcing intervals; the other quantity follows from
//! `end_time = length * interval_seconds`.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY;
pub const SECONDS_PER_MONTH: f64 = SECONDS_PER_YEAR / 12.0;

const RELATIVE_TOLERANCE: f64 = 1e-9;

/// How forcing data varies over the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForcingMode {
    SteadyState,
    Periodic,
    Transient,
}

impl ForcingMode {
    fn classify(raw: &str) -> Option<Self> {
        if matches!(raw, "mean" | "steady" | "steady-state") || raw.ends_with("-mean") {
            Some(Self::SteadyState)
        } else if raw.starts_with("clim") || raw.starts_with("peri") {
            Some(Self::Periodic)
        } else if matches!(raw, "time-series" | "timeseries" | "trans" | "transient") {
            Some(Self::Transient)
        } else {
            None
        }
    }
}

impl FromStr for ForcingMode {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        Self::classify(&normalized).ok_or_else(|| Error::UnsupportedInterval(raw.to_string()))
    }
}

impl fmt::Display for ForcingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SteadyState => "steady-state",
            Self::Periodic => "periodic",
            Self::Transient => "transient",
        })
    }
}

/// Update cadence of forcing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interval {
    Daily,
    Monthly,
}

impl Interval {
    pub fn seconds(self) -> f64 {
        match self {
            Self::Daily => SECONDS_PER_DAY,
            Self::Monthly => SECONDS_PER_MONTH,
        }
    }

    fn classify(raw: &str) -> Option<Self> {
        if raw.starts_with("month") {
            Some(Self::Monthly)
        } else if raw.starts_with("day") || raw == "daily" {
            Some(Self::Daily)
        } else {
            None
        }
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        Self::classify(&normalized).ok_or_else(|| Error::UnsupportedInterval(raw.to_string()))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        })
    }
}

/// Result of classifying a free-form cadence word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Mode(ForcingMode),
    Interval(Interval),
}

/// Classify a mode or interval word ("clim", "monthly", "steady", ...).
pub fn classify(raw: &str) -> Result<Cadence> {
    let normalized = raw.trim().to_lowercase();
    if let Some(mode) = ForcingMode::classify(&normalized) {
        return Ok(Cadence::Mode(mode));
    }
    if let Some(interval) = Interval::classify(&normalized) {
        return Ok(Cadence::Interval(interval));
    }
    Err(Error::UnsupportedInterval(raw.to_string()))
}

/// Canonical run length.
///
/// `length` is `None` only when an end time was given without an interval
/// (steady-state runs have no forcing cadence).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunLength {
    pub length: Option<u64>,
    pub end_time: f64,
}

/// Derive the missing one of `length`, `end_time` from the other and
/// `interval_seconds`.
///
/// When both `length` and `end_time` are given they win, but must agree with
/// the interval if one is supplied. A length derived from an end time is the
/// number of whole intervals needed to cover it.
pub fn resolve_interval(
    length: Option<u64>,
    end_time: Option<f64>,
    interval_seconds: Option<f64>,
) -> Result<RunLength> {
    if let Some(interval) = interval_seconds {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(Error::UnsupportedInterval(format!("{interval} seconds")));
        }
    }
    match (length, end_time, interval_seconds) {
        (Some(length), Some(end_time), interval) => {
            if let Some(interval) = interval {
                let expected = length as f64 * interval;
                if !approx_eq(expected, end_time) {
                    return Err(Error::InconsistentRunLength {
                        length: length as f64,
                        end_time,
                        interval,
                    });
                }
            }
            Ok(RunLength {
                length: Some(length),
                end_time,
            })
        }
        (Some(length), None, Some(interval)) => Ok(RunLength {
            length: Some(length),
            end_time: length as f64 * interval,
        }),
        (None, Some(end_time), Some(interval)) => Ok(RunLength {
            length: Some(intervals_covering(end_time, interval)),
            end_time,
        }),
        (None, Some(end_time), None) => Ok(RunLength {
            length: None,
            end_time,
        }),
        (Some(_), None, None) | (None, None, _) => Err(Error::MissingRunLength),
    }
}

fn intervals_covering(end_time: f64, interval: f64) -> u64 {
    let ratio = end_time / interval;
    let nearest = ratio.round();
    if approx_eq(ratio, nearest) {
        nearest.max(0.0) as u64
    } else {
        ratio.ceil().max(0.0) as u64
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}
