//! Inbound chunk classification.
//!
//! The processor speaks a loosely delimited ASCII stream: status lines,
//! keypad button echoes, and error reports all arrive on the same
//! channel, and a read may return several logical lines or cut one in
//! half. The parser keeps the unterminated tail of each chunk and
//! prepends it to the next, so a line split across reads still parses.
//!
//! Button echoes are classified before status and error lines: they are
//! time-sensitive and must not be shadowed by a status broadcast arriving
//! in the same chunk.

use crate::events::{ButtonPress, ControllerEvent, StatusSnapshot, STATUS_UNITS};
use crate::scene::Scene;
use once_cell::sync::Lazy;
use regex::Regex;

/// A button echo is a bare two-character line: pressing unit `A`-`X`
/// (1-24) and a numeric scene symbol. Lowercase command echoes never
/// match, and a symbol run inside a `:ss` line can't reach this pattern
/// because matching is per logical line.
static BUTTON_PRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-X])([0-9A-F])$").expect("valid button pattern"));

/// Status broadcast: `:ss ` followed by one scene symbol per unit.
static STATUS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:ss\s(.*)$").expect("valid status pattern"));

/// Controller-reported error with free-form trailing text.
static ERROR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^~ERROR(.*)$").expect("valid error pattern"));

/// Longest unterminated tail worth keeping; real protocol lines are a few
/// dozen bytes, so anything beyond this is garbage, not a split line.
const MAX_CARRY: usize = 1024;

/// Stateful parser turning raw text chunks into typed events.
pub struct ResponseParser {
    carry: String,
    forward_protocol_errors: bool,
}

impl ResponseParser {
    /// Create a parser. `forward_protocol_errors` controls whether
    /// `~ERROR` lines become [`ControllerEvent::ProtocolError`] events or
    /// are logged and dropped (the default behavior).
    #[must_use]
    pub fn new(forward_protocol_errors: bool) -> Self {
        Self {
            carry: String::new(),
            forward_protocol_errors,
        }
    }

    /// Drop any carried partial line. Called when the transport is
    /// replaced; a tail from the old connection must not prefix data
    /// from the new one.
    pub fn reset(&mut self) {
        self.carry.clear();
    }

    /// Feed one decoded chunk; returns the events it completes.
    ///
    /// Button press events come first, in order of appearance, followed
    /// by status and error events in line order.
    pub fn feed(&mut self, chunk: &str) -> Vec<ControllerEvent> {
        self.carry.push_str(chunk);

        let Some(end) = self.carry.rfind('\n') else {
            if self.carry.len() > MAX_CARRY {
                tracing::warn!(len = self.carry.len(), "dropping unterminated input");
                self.carry.clear();
            }
            return Vec::new();
        };

        let complete = self.carry[..=end].to_string();
        self.carry.drain(..=end);

        let mut buttons = Vec::new();
        let mut others = Vec::new();

        for line in complete.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = BUTTON_PRESS.captures(line) {
                let letter = caps[1].chars().next().unwrap_or('A');
                let symbol = caps[2].chars().next().unwrap_or('0');
                let unit = letter as u8 - b'A' + 1;
                match Scene::decode(symbol).ok().and_then(Scene::number) {
                    Some(scene) => {
                        tracing::debug!(unit, scene, "button press");
                        buttons.push(ControllerEvent::ButtonPress(ButtonPress { unit, scene }));
                    }
                    None => {
                        tracing::warn!(%line, "undecodable button scene symbol");
                    }
                }
            } else if let Some(caps) = STATUS_LINE.captures(line) {
                match parse_snapshot(&caps[1]) {
                    Some(snapshot) => others.push(ControllerEvent::Status(snapshot)),
                    None => tracing::warn!(%line, "weird data in status line"),
                }
            } else if let Some(caps) = ERROR_LINE.captures(line) {
                let message = caps[1].to_string();
                tracing::warn!(%message, "controller reported error");
                if self.forward_protocol_errors {
                    others.push(ControllerEvent::ProtocolError { message });
                }
            } else {
                tracing::debug!(%line, "unhandled line");
            }
        }

        buttons.extend(others);
        buttons
    }
}

/// Decode the first 8 symbols of a status run into a snapshot.
///
/// Any undecodable symbol, or a run shorter than 8, aborts the whole
/// snapshot; partial snapshots are never emitted or merged.
fn parse_snapshot(run: &str) -> Option<StatusSnapshot> {
    let mut scenes = [Scene::Missing; STATUS_UNITS];
    let mut count = 0;
    for (slot, symbol) in scenes.iter_mut().zip(run.chars().take(STATUS_UNITS)) {
        *slot = Scene::decode(symbol).ok()?;
        count += 1;
    }
    if count < STATUS_UNITS {
        return None;
    }
    Some(StatusSnapshot::new(scenes))
}
