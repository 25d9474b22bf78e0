//! Tool calls issued by the chat orchestrator.
//!
//! The set of tools is closed: a request either deserializes into a
//! [`ToolCall`] variant or it is a bad request. Argument values arrive as the
//! model produced them (strings) and are parsed here, so that an unknown
//! category or a malformed time becomes a user-facing result rather than a
//! protocol error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::engine::{Engine, EngineError};
use crate::model::*;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    CheckAvailability(SpanArgs),
    GetAvailableSlots(SlotArgs),
    MakeReservation(SpanArgs),
    CollectContact(ContactArgs),
    ListTools {},
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpanArgs {
    pub space_type: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl SpanArgs {
    fn parse(&self) -> Result<(SpaceCategory, NaiveDate, Span), EngineError> {
        Ok((
            self.space_type.parse()?,
            parse_date(&self.date)?,
            Span::parse(&self.start_time, &self.end_time)?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlotArgs {
    pub space_type: String,
    pub date: String,
    #[serde(default)]
    pub min_duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactArgs {
    pub name: String,
    pub contact_type: String,
    pub contact_value: String,
    pub space_type: String,
    #[serde(default)]
    pub requirements: Map<String, Value>,
}

impl ContactArgs {
    fn parse(self) -> Result<ContactRequest, EngineError> {
        Ok(ContactRequest {
            contact_type: self.contact_type.parse()?,
            space_type: self.space_type.parse()?,
            name: self.name,
            contact_value: self.contact_value,
            requirements: self.requirements,
        })
    }
}

/// Structured result of one tool call, serialized as the response `result`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Availability(Availability),
    Slots {
        slots: Vec<Span>,
        message: String,
    },
    Reservation {
        reserved: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        booking: Option<Booking>,
    },
    Contact {
        acknowledged: bool,
        message: String,
    },
    Tools {
        tools: Vec<Value>,
    },
}

/// A request line that names no known tool or carries malformed arguments.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("request is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("request must be a JSON object")]
    NotAnObject,
    #[error("invalid tool call: {0}")]
    InvalidCall(#[source] serde_json::Error),
}

/// Split a request line into its echoed `id` and the tool call.
///
/// The id is recovered whenever the line is a JSON object, even when the
/// call itself is rejected.
pub fn parse_request(line: &str) -> (Value, Result<ToolCall, ToolError>) {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return (Value::Null, Err(ToolError::Json(e))),
    };
    let Value::Object(mut object) = value else {
        return (Value::Null, Err(ToolError::NotAnObject));
    };
    let id = object.remove("id").unwrap_or(Value::Null);
    object
        .entry("arguments")
        .or_insert_with(|| Value::Object(Map::new()));
    let call = serde_json::from_value(Value::Object(object)).map_err(ToolError::InvalidCall);
    (id, call)
}

/// Run one tool call against the engine.
///
/// Validation, conflict and not-found outcomes are rendered into the
/// returned output; only storage failures come back as `Err`.
pub async fn dispatch(engine: &Engine, call: ToolCall) -> Result<ToolOutput, EngineError> {
    match call {
        ToolCall::CheckAvailability(args) => {
            let availability = match args.parse() {
                Ok((category, date, span)) => engine.check_availability(category, date, span).await,
                Err(e) => Availability {
                    available: false,
                    message: e.to_string(),
                    conflict: None,
                },
            };
            Ok(ToolOutput::Availability(availability))
        }
        ToolCall::GetAvailableSlots(args) => {
            let parsed = args
                .space_type
                .parse::<SpaceCategory>()
                .and_then(|category| Ok((category, parse_date(&args.date)?)));
            let (category, date) = match parsed {
                Ok(v) => v,
                Err(e) => {
                    return Ok(ToolOutput::Slots {
                        slots: Vec::new(),
                        message: e.to_string(),
                    });
                }
            };
            let min_duration = args
                .min_duration_minutes
                .map(|m| Minute::try_from(m).unwrap_or(Minute::MAX));
            let slots = engine.get_available_slots(category, date, min_duration).await;
            let message = slots_message(category, date, &slots);
            Ok(ToolOutput::Slots { slots, message })
        }
        ToolCall::MakeReservation(args) => {
            let result = match args.parse() {
                Ok((category, date, span)) => engine
                    .make_reservation(category, date, span)
                    .await
                    .map_err(|e| (category, e)),
                Err(e) => {
                    return Ok(ToolOutput::Reservation {
                        reserved: false,
                        message: e.to_string(),
                        booking: None,
                    });
                }
            };
            match result {
                Ok(booking) => Ok(ToolOutput::Reservation {
                    reserved: true,
                    message: format!(
                        "Your reservation of the {} on {} from {} to {} is confirmed.",
                        booking.category.label(),
                        booking.date,
                        format_time(booking.span.start),
                        format_time(booking.span.end)
                    ),
                    booking: Some(booking),
                }),
                Err((_, e @ EngineError::Persistence(_))) => Err(e),
                Err((category, e)) => Ok(ToolOutput::Reservation {
                    reserved: false,
                    message: rejection_message(category, &e),
                    booking: None,
                }),
            }
        }
        ToolCall::CollectContact(args) => {
            let outcome = match args.parse() {
                Ok(request) => engine.collect_contact(request).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(message) => Ok(ToolOutput::Contact {
                    acknowledged: true,
                    message,
                }),
                Err(e @ EngineError::Persistence(_)) => Err(e),
                Err(e) => Ok(ToolOutput::Contact {
                    acknowledged: false,
                    message: e.to_string(),
                }),
            }
        }
        ToolCall::ListTools {} => Ok(ToolOutput::Tools {
            tools: tool_definitions(),
        }),
    }
}

fn slots_message(category: SpaceCategory, date: NaiveDate, slots: &[Span]) -> String {
    if slots.is_empty() {
        return format!("The {} has no free time on {date}.", category.label());
    }
    let listed: Vec<String> = slots
        .iter()
        .map(|s| format!("{} to {}", format_time(s.start), format_time(s.end)))
        .collect();
    format!(
        "The {} is free on {date} from {}.",
        category.label(),
        listed.join(", ")
    )
}

fn rejection_message(category: SpaceCategory, err: &EngineError) -> String {
    match err {
        EngineError::Conflict { requested, existing } => format!(
            "The {} cannot be reserved from {} to {}: it is already booked from {} to {}.",
            category.label(),
            format_time(requested.start),
            format_time(requested.end),
            format_time(existing.start),
            format_time(existing.end)
        ),
        other => format!("The {} cannot be reserved: {other}.", category.label()),
    }
}

/// Function-calling definitions handed to the language model.
pub fn tool_definitions() -> Vec<Value> {
    let space_type = json!({
        "type": "string",
        "enum": SpaceCategory::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        "description": "The kind of space",
    });
    let date = json!({"type": "string", "description": "Date as YYYY-MM-DD"});
    let time = |what: &str| {
        json!({"type": "string", "description": format!("{what} time as HH:MM (24-hour)")})
    };
    let span_params = json!({
        "type": "object",
        "properties": {
            "space_type": space_type.clone(),
            "date": date.clone(),
            "start_time": time("Start"),
            "end_time": time("End"),
        },
        "required": ["space_type", "date", "start_time", "end_time"],
    });

    vec![
        function(
            "check_availability",
            "Check whether a space is free on a date between two times.",
            span_params.clone(),
        ),
        function(
            "get_available_slots",
            "List the free time ranges of a space on a date within business hours (08:00-22:00).",
            json!({
                "type": "object",
                "properties": {
                    "space_type": space_type.clone(),
                    "date": date,
                    "min_duration_minutes": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Only list ranges at least this long",
                    },
                },
                "required": ["space_type", "date"],
            }),
        ),
        function(
            "make_reservation",
            "Reserve a space on a date between two times. Fails if the time is taken.",
            span_params,
        ),
        function(
            "collect_contact",
            "Record the customer's contact details and requirements so staff can send an offer.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Customer name"},
                    "contact_type": {"type": "string", "enum": ["email", "phone"]},
                    "contact_value": {"type": "string", "description": "Email address or phone number"},
                    "space_type": space_type,
                    "requirements": {
                        "type": "object",
                        "description": "Free-form requirements such as attendee count or equipment",
                    },
                },
                "required": ["name", "contact_type", "contact_value", "space_type"],
            }),
        ),
    ]
}

fn function(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        },
    })
}
