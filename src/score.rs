//! Score files for the offline renderer
//!
//! A score is a JSON array of raw channel-voice messages stamped in seconds:
//!
//! ```json
//! [
//!   { "at": 0.0, "midi": [144, 57, 100] },
//!   { "at": 0.5, "midi": [128, 57, 0] }
//! ]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use ym2149_voice_driver::{PerformanceEvent, TimedEvent};

/// One line of a score file
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreEntry {
    /// Time in seconds from the start of the render
    pub at: f64,
    /// Raw message bytes
    pub midi: Vec<u8>,
}

/// Event stamped with an absolute sample position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    /// Absolute sample index
    pub sample: u64,
    /// Decoded event
    pub event: PerformanceEvent,
}

/// Decoded score, ordered by sample position
#[derive(Debug, Clone, Default)]
pub struct Score {
    events: Vec<ScheduledEvent>,
}

impl Score {
    /// Parse a JSON score
    pub fn from_json_str(text: &str, sample_rate: u32) -> Result<Self> {
        let entries: Vec<ScoreEntry> = serde_json::from_str(text).context("malformed score")?;
        Ok(Self::from_entries(&entries, sample_rate))
    }

    /// Load a JSON score from disk
    pub fn load(path: &Path, sample_rate: u32) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading score {}", path.display()))?;
        let score = Self::from_json_str(&text, sample_rate)?;
        tracing::debug!(path = %path.display(), events = score.events.len(), "score loaded");
        Ok(score)
    }

    /// Decode score entries; undecodable messages are skipped
    pub fn from_entries(entries: &[ScoreEntry], sample_rate: u32) -> Self {
        let mut events: Vec<ScheduledEvent> = entries
            .iter()
            .filter_map(|entry| {
                let Some(event) = PerformanceEvent::from_midi(&entry.midi) else {
                    tracing::warn!(at = entry.at, midi = ?entry.midi, "skipping unsupported message");
                    return None;
                };
                let sample = (entry.at.max(0.0) * sample_rate as f64).round() as u64;
                Some(ScheduledEvent { sample, event })
            })
            .collect();
        // Stable: simultaneous events keep file order
        events.sort_by_key(|e| e.sample);
        Self { events }
    }

    /// Built-in demo phrase
    pub fn demo(sample_rate: u32) -> Self {
        let beat = 0.25;
        let mut entries = vec![
            // Channel 1: noise + tone with a short percussive envelope
            entry(0.0, &[0xC1, 0b0110_0011]),
            entry(0.0, &[0xB1, 0x66, 2]),
            entry(0.0, &[0xB1, 0x67, 3]),
            entry(0.0, &[0xB1, 0x68, 127]),
            entry(0.0, &[0xB1, 0x69, 12]),
            entry(0.0, &[0xB1, 0x6A, 0]),
            entry(0.0, &[0xB1, 0x07, 96]),
            entry(0.0, &[0xB1, 0x0A, 32]),
            // Channel 2: hardware envelope bass
            entry(0.0, &[0xB2, 0x00, 0b101]),
            entry(0.0, &[0xB2, 0x12, 0x20]),
            entry(0.0, &[0xB2, 0x13, 10]),
            entry(0.0, &[0xB2, 0x0A, 96]),
        ];

        let melody = [57u8, 60, 64, 69, 67, 64, 60, 62];
        for (i, &key) in melody.iter().enumerate() {
            let at = i as f64 * beat;
            entries.push(entry(at, &[0x90, key, 100]));
            entries.push(entry(at + beat * 0.9, &[0x80, key, 0]));
            entries.push(entry(at, &[0x91, 81, 90]));
            entries.push(entry(at + 0.1, &[0x81, 81, 0]));
        }
        for (i, &key) in [33u8, 36, 31, 33].iter().enumerate() {
            let at = i as f64 * beat * 2.0;
            entries.push(entry(at, &[0x92, key, 100]));
            entries.push(entry(at + beat * 1.8, &[0x82, key, 0]));
        }

        Self::from_entries(&entries, sample_rate)
    }

    /// Scheduled events in order
    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    /// Sample position of the last event
    pub fn end_sample(&self) -> u64 {
        self.events.last().map_or(0, |e| e.sample)
    }

    /// Events falling in `[start, start + len)`, as block-relative offsets
    ///
    /// `cursor` tracks the first event not yet handed out and must be kept
    /// by the caller between blocks.
    pub fn block_events(
        &self,
        cursor: &mut usize,
        start: u64,
        len: usize,
        out: &mut Vec<TimedEvent>,
    ) {
        out.clear();
        let end = start + len as u64;
        while let Some(scheduled) = self.events.get(*cursor) {
            if scheduled.sample >= end {
                break;
            }
            let offset = scheduled.sample.saturating_sub(start) as usize;
            out.push(TimedEvent::new(offset, scheduled.event));
            *cursor += 1;
        }
    }
}

fn entry(at: f64, midi: &[u8]) -> ScoreEntry {
    ScoreEntry {
        at,
        midi: midi.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_order() {
        let score = Score::from_json_str(
            r#"[
                { "at": 0.5, "midi": [128, 57, 0] },
                { "at": 0.0, "midi": [144, 57, 100] },
                { "at": 0.25, "midi": [208, 3] }
            ]"#,
            1000,
        )
        .unwrap();
        let events = score.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sample, 0);
        assert_eq!(events[1].sample, 500);
        assert_eq!(score.end_sample(), 500);
    }

    #[test]
    fn test_block_events_split() {
        let score = Score::from_json_str(
            r#"[
                { "at": 0.010, "midi": [144, 57, 100] },
                { "at": 0.064, "midi": [128, 57, 0] },
                { "at": 0.100, "midi": [144, 60, 100] }
            ]"#,
            1000,
        )
        .unwrap();

        let mut cursor = 0;
        let mut out = Vec::new();
        score.block_events(&mut cursor, 0, 64, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].offset, 10);

        score.block_events(&mut cursor, 64, 64, &mut out);
        assert_eq!(
            out.iter().map(|e| e.offset).collect::<Vec<_>>(),
            vec![0, 36]
        );

        score.block_events(&mut cursor, 128, 64, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_malformed_score() {
        assert!(Score::from_json_str("{}", 44_100).is_err());
    }

    #[test]
    fn test_demo_is_not_empty() {
        let score = Score::demo(44_100);
        assert!(score.events().len() > 20);
        assert!(score.end_sample() > 44_100);
    }
}
