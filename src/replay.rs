//! Scripted replay
//!
//! Runs a JSON-lines script through a dispatcher backed by a
//! [`StaticSensor`], using the events' own timestamps for timing windows.
//! Each line is one step:
//!
//! ```text
//! {"type":"touch","surface":"mousepad","count":2}
//! {"type":"event","event":{"type":"scroll_wheel","phase":"began","scroll_point_delta":[4,0,0],"timestamp":0}}
//! {"type":"sensor","double_tap":true,"tap_to_click":true}
//! {"type":"tap","count":3,"location":[100.0,200.0]}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. For every `event`
//! and `tap` step one [`ReplayRecord`] is written as a JSON line.

use crate::chain::{Dispatcher, MappingChain, TimingSource};
use crate::event::Event;
use crate::sensor::{StaticSensor, Surface};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// One line of a replay script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayStep {
    /// Feed an input event
    Event { event: Event },
    /// Set the finger count on a surface
    Touch { surface: Surface, count: u32 },
    /// Set tap-related sensor answers
    Sensor {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        one_and_a_half_tap: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        double_tap: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tap_to_click: Option<bool>,
    },
    /// A discrete trackpad tap with `count` fingers
    Tap {
        count: u32,
        #[serde(default)]
        location: (f64, f64),
    },
}

/// Output written for an `event` or `tap` step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// 1-based script line
    pub line: usize,
    pub output: Vec<Event>,
}

/// Totals of a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub events_in: usize,
    pub events_out: usize,
}

/// Parse one script line. Returns `None` for blank and comment lines.
pub fn parse_step(line: &str) -> Result<Option<ReplayStep>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Replay driver
pub struct Replay {
    dispatcher: Dispatcher,
    sensor: Arc<StaticSensor>,
}

impl Replay {
    pub fn new(chain: MappingChain) -> Self {
        let sensor = Arc::new(StaticSensor::new());
        let dispatcher = Dispatcher::new(chain, sensor.clone()).with_timing(TimingSource::Event);
        Self { dispatcher, sensor }
    }

    pub fn with_event_logging(mut self, log_events: bool) -> Self {
        self.dispatcher = self.dispatcher.with_event_logging(log_events);
        self
    }

    pub fn sensor(&self) -> &StaticSensor {
        &self.sensor
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Apply one step. Returns the produced events for `event` and `tap`
    /// steps.
    pub fn apply(&mut self, step: ReplayStep) -> Option<Vec<Event>> {
        match step {
            ReplayStep::Event { event } => Some(self.dispatcher.process(event)),
            ReplayStep::Touch { surface, count } => {
                self.sensor.set_touch_count(surface, count);
                None
            }
            ReplayStep::Sensor {
                one_and_a_half_tap,
                double_tap,
                tap_to_click,
            } => {
                if let Some(value) = one_and_a_half_tap {
                    self.sensor.set_one_and_a_half_tap(value);
                }
                if let Some(value) = double_tap {
                    self.sensor.set_double_tap(value);
                }
                if let Some(value) = tap_to_click {
                    self.sensor.set_tap_to_click(value);
                }
                None
            }
            ReplayStep::Tap { count, location } => {
                self.sensor.set_last_touch_count(count);
                Some(self.dispatcher.on_trackpad_tap(location))
            }
        }
    }

    /// Run a whole script, writing one JSON line per produced record.
    ///
    /// # Errors
    /// Fails on unreadable input, malformed lines (with the line number) and
    /// write errors.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();

        for (index, line) in input.lines().enumerate() {
            let line_number = index + 1;
            let line = line?;
            let step = parse_step(&line)
                .map_err(|e| Error::Replay(format!("line {}: {}", line_number, e)))?;
            let Some(step) = step else {
                continue;
            };

            summary.steps += 1;
            if matches!(step, ReplayStep::Event { .. }) {
                summary.events_in += 1;
            }

            if let Some(events) = self.apply(step) {
                summary.events_out += events.len();
                let record = ReplayRecord {
                    line: line_number,
                    output: events,
                };
                serde_json::to_writer(&mut output, &record)?;
                writeln!(output)?;
            }
        }

        output.flush()?;
        debug!("Replay stats: {:?}", self.dispatcher.stats());
        info!(
            "Replayed {} steps: {} events in, {} events out",
            summary.steps, summary.events_in, summary.events_out
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventType, Phase};
    use crate::mapping::MappingSettings;

    #[test]
    fn test_parse_step_skips_blank_and_comments() {
        assert!(parse_step("").unwrap().is_none());
        assert!(parse_step("   # a comment").unwrap().is_none());
        assert!(parse_step("{not json").is_err());
    }

    #[test]
    fn test_parse_steps() {
        let step = parse_step(r#"{"type":"touch","surface":"trackpad","count":3}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            step,
            ReplayStep::Touch {
                surface: Surface::Trackpad,
                count: 3
            }
        );

        let step = parse_step(r#"{"type":"sensor","double_tap":true}"#).unwrap().unwrap();
        assert_eq!(
            step,
            ReplayStep::Sensor {
                one_and_a_half_tap: None,
                double_tap: Some(true),
                tap_to_click: None
            }
        );

        let step = parse_step(r#"{"type":"event","event":{"type":"gesture","subtype":"magnify","phase":"began"}}"#)
            .unwrap()
            .unwrap();
        match step {
            ReplayStep::Event { event } => {
                assert!(event.is_magnify());
                assert_eq!(event.phase, Phase::Began);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_run_writes_records() {
        let script = r#"
# two fingers on the mouse, then a short swipe
{"type":"touch","surface":"mousepad","count":2}
{"type":"event","event":{"type":"scroll_wheel","scroll_unit":"pixel","phase":"began","scroll_point_delta":[10,0,0],"timestamp":0}}
{"type":"event","event":{"type":"scroll_wheel","scroll_unit":"pixel","phase":"ended","timestamp":5000000}}
"#;
        let mut replay = Replay::new(MappingChain::from_settings(&[MappingSettings::magic_mouse_zoom()]));
        let mut out = Vec::new();
        let summary = replay.run(script.as_bytes(), &mut out).unwrap();

        assert_eq!(summary.steps, 3);
        assert_eq!(summary.events_in, 2);
        assert_eq!(summary.events_out, 2);

        let text = String::from_utf8(out).unwrap();
        let records: Vec<ReplayRecord> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 4);
        assert_eq!(records[0].output[0].event_type, EventType::Gesture);
        assert_eq!(records[1].output[0].phase, Phase::Ended);
    }

    #[test]
    fn test_run_reports_bad_line() {
        let script = "{\"type\":\"touch\",\"surface\":\"mousepad\",\"count\":2}\n{\"type\":\"bogus\"}\n";
        let mut replay = Replay::new(MappingChain::default());
        let err = replay.run(script.as_bytes(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_tap_step() {
        let mut replay = Replay::new(MappingChain::from_settings(&[MappingSettings::middle_click()]));
        replay.apply(ReplayStep::Sensor {
            one_and_a_half_tap: None,
            double_tap: None,
            tap_to_click: Some(true),
        });
        let out = replay
            .apply(ReplayStep::Tap {
                count: 3,
                location: (4.0, 2.0),
            })
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].event_type, EventType::OtherMouseDown);
        assert_eq!(out[0].location, (4.0, 2.0));
    }
}
