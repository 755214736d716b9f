//! Sample dice-roll handler.
//!
//! Each roll opens a `roll` span on the service tracer and counts the
//! rolled value in `dice.rolls`.

use axum::{extract::State, Json};
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::trace::{Span as _, Tracer as _};
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::Tracer;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::TelemetryError;

const ROLLS_COUNTER: &str = "dice.rolls";

/// Handler state: the tracer and the roll counter.
#[derive(Debug, Clone)]
pub struct DiceState {
    tracer: Tracer,
    rolls: Counter<u64>,
}

impl DiceState {
    pub fn new(tracer: Tracer, meter: &Meter) -> Result<Self, TelemetryError> {
        let rolls = meter
            .u64_counter(ROLLS_COUNTER)
            .with_description("The number of rolls by roll value")
            .with_unit("{roll}")
            .try_init()
            .map_err(|source| TelemetryError::Instrument {
                name: ROLLS_COUNTER,
                source,
            })?;

        Ok(Self { tracer, rolls })
    }
}

/// Body of a `GET /api` response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RollResponse {
    pub roll: i64,
}

/// Handle GET /api - roll a six-sided die.
pub async fn handle_roll(State(state): State<Arc<DiceState>>) -> Json<RollResponse> {
    let mut span = state.tracer.start("roll");

    let roll: i64 = rand::thread_rng().gen_range(1..=6);
    let roll_value = KeyValue::new("roll.value", roll);
    span.set_attribute(roll_value.clone());
    state.rolls.add(1, &[roll_value]);
    span.end();

    tracing::debug!(roll, "Rolled die");
    Json(RollResponse { roll })
}
