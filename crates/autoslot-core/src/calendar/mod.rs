//! External calendar boundary.
//!
//! The engine never talks to a calendar service directly; it goes through
//! [`CalendarGateway`]. Two implementations ship with the crate:
//! - [`GoogleCalendar`]: Google Calendar v3 REST API
//! - [`MemoryCalendar`]: in-process store for tests and offline runs

pub mod codec;
pub mod google;
pub mod memory;

pub use codec::EventCodec;
pub use google::GoogleCalendar;
pub use memory::MemoryCalendar;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// Palette colours understood by the calendar backend.
///
/// Numeric ids follow the Google Calendar event palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventColor {
    Lavender,
    Sage,
    Grape,
    Flamingo,
    Banana,
    Tangerine,
    Peacock,
    Graphite,
    Blueberry,
    Basil,
    Tomato,
}

impl EventColor {
    /// Backend colour id.
    pub fn id(self) -> u8 {
        match self {
            EventColor::Lavender => 1,
            EventColor::Sage => 2,
            EventColor::Grape => 3,
            EventColor::Flamingo => 4,
            EventColor::Banana => 5,
            EventColor::Tangerine => 6,
            EventColor::Peacock => 7,
            EventColor::Graphite => 8,
            EventColor::Blueberry => 9,
            EventColor::Basil => 10,
            EventColor::Tomato => 11,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            1 => EventColor::Lavender,
            2 => EventColor::Sage,
            3 => EventColor::Grape,
            4 => EventColor::Flamingo,
            5 => EventColor::Banana,
            6 => EventColor::Tangerine,
            7 => EventColor::Peacock,
            8 => EventColor::Graphite,
            9 => EventColor::Blueberry,
            10 => EventColor::Basil,
            11 => EventColor::Tomato,
            _ => return None,
        })
    }
}

impl fmt::Display for EventColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventColor::Lavender => "lavender",
            EventColor::Sage => "sage",
            EventColor::Grape => "grape",
            EventColor::Flamingo => "flamingo",
            EventColor::Banana => "banana",
            EventColor::Tangerine => "tangerine",
            EventColor::Peacock => "peacock",
            EventColor::Graphite => "graphite",
            EventColor::Blueberry => "blueberry",
            EventColor::Basil => "basil",
            EventColor::Tomato => "tomato",
        };
        f.write_str(name)
    }
}

impl FromStr for EventColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lavender" => Ok(EventColor::Lavender),
            "sage" => Ok(EventColor::Sage),
            "grape" => Ok(EventColor::Grape),
            "flamingo" => Ok(EventColor::Flamingo),
            "banana" => Ok(EventColor::Banana),
            "tangerine" => Ok(EventColor::Tangerine),
            "peacock" => Ok(EventColor::Peacock),
            "graphite" => Ok(EventColor::Graphite),
            "blueberry" => Ok(EventColor::Blueberry),
            "basil" => Ok(EventColor::Basil),
            "tomato" => Ok(EventColor::Tomato),
            other => Err(format!("unknown colour '{other}'")),
        }
    }
}

/// An event as seen through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub color: Option<EventColor>,
}

impl ExternalEvent {
    /// Half-open overlap test; events that merely touch do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// An event to be created; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub color: Option<EventColor>,
}

impl NewEvent {
    pub fn with_id(self, id: impl Into<String>) -> ExternalEvent {
        ExternalEvent {
            id: id.into(),
            start: self.start,
            end: self.end,
            summary: self.summary,
            description: self.description,
            color: self.color,
        }
    }
}

/// Operations the engine needs from a calendar backend.
///
/// Calls are blocking. Implementations own their timeout and retry policy;
/// any error aborts the current cycle step.
pub trait CalendarGateway {
    /// Events intersecting `[from, to)`, ascending by start.
    fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, GatewayError>;

    /// Create an event and return it with its stable id.
    fn add_event(&mut self, event: &NewEvent) -> Result<ExternalEvent, GatewayError>;

    /// Fetch an event by id; [`GatewayError::NotFound`] once deleted.
    fn get_event(&self, id: &str) -> Result<ExternalEvent, GatewayError>;

    fn delete_event(&mut self, id: &str) -> Result<(), GatewayError>;
}

impl<G: CalendarGateway + ?Sized> CalendarGateway for Box<G> {
    fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, GatewayError> {
        (**self).list_events(from, to)
    }

    fn add_event(&mut self, event: &NewEvent) -> Result<ExternalEvent, GatewayError> {
        (**self).add_event(event)
    }

    fn get_event(&self, id: &str) -> Result<ExternalEvent, GatewayError> {
        (**self).get_event(id)
    }

    fn delete_event(&mut self, id: &str) -> Result<(), GatewayError> {
        (**self).delete_event(id)
    }
}
