//! Engine Frame Codec - fixed-layout text frames
//!
//! One request frame (setpoints) is answered by exactly one response frame
//! (engine state). Frames are single newline-terminated lines in the
//! external-interface layout used by building-energy engines:
//!
//! ```text
//! <version> <flag> <n_double> <n_int> <n_bool> <sim_time> <double_1> ... <double_n>
//! ```
//!
//! - `version` is always 2; integer and boolean payloads are unused (0)
//! - `flag`: 0 = state, 1 = end of simulation, negative = engine failure
//! - `n_double` must equal the count agreed at reset (observation count for
//!   responses, action count for requests)
//!
//! Any deviation fails fast with `EnvError::Protocol`; nothing is truncated
//! or padded.

use hvacgym_env::EnvError;

/// Protocol version written and accepted
pub const PROTOCOL_VERSION: i32 = 2;

/// Flag values
pub const FLAG_OK: i32 = 0;
pub const FLAG_END_OF_SIMULATION: i32 = 1;

/// Number of header tokens before the double payload
const HEADER_FIELDS: usize = 6;

/// A decoded response frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine state after a timestep
    State {
        /// Simulated seconds since the start of the run period
        sim_time: f64,
        values: Vec<f64>,
    },

    /// The engine reached the end of its run period
    Terminated { sim_time: f64 },
}

/// Encoder/decoder bound to the field counts agreed for one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    observation_count: usize,
    action_count: usize,
}

impl FrameCodec {
    /// Creates a codec for the given agreed field counts.
    pub fn new(observation_count: usize, action_count: usize) -> Self {
        Self {
            observation_count,
            action_count,
        }
    }

    pub fn observation_count(&self) -> usize {
        self.observation_count
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    /// Encodes a setpoint request frame (newline included).
    pub fn encode(&self, setpoints: &[f64], sim_time: f64) -> Result<Vec<u8>, EnvError> {
        if setpoints.len() != self.action_count {
            return Err(EnvError::protocol(format!(
                "request carries {} setpoints, engine expects {}",
                setpoints.len(),
                self.action_count
            )));
        }
        if !sim_time.is_finite() {
            return Err(EnvError::protocol("request sim_time is not finite"));
        }
        if let Some(i) = setpoints.iter().position(|v| !v.is_finite()) {
            return Err(EnvError::protocol(format!(
                "setpoint #{} is not finite ({})",
                i, setpoints[i]
            )));
        }

        let mut line = format!(
            "{} {} {} 0 0 {}",
            PROTOCOL_VERSION, FLAG_OK, self.action_count, sim_time
        );
        for value in setpoints {
            line.push(' ');
            line.push_str(&value.to_string());
        }
        line.push('\n');

        Ok(line.into_bytes())
    }

    /// Decodes a response frame.
    ///
    /// # Returns
    /// * `Ok(Frame::State)` - a well-formed state frame
    /// * `Ok(Frame::Terminated)` - the engine signalled end of simulation
    /// * `Err(EnvError::Protocol)` - malformed frame
    /// * `Err(EnvError::SimulationCrashed)` - the engine reported a failure flag
    pub fn decode(&self, frame: &[u8]) -> Result<Frame, EnvError> {
        let text = std::str::from_utf8(frame)
            .map_err(|_| EnvError::protocol("frame is not valid UTF-8"))?;
        let tokens: Vec<&str> = text.split_whitespace().collect();

        if tokens.is_empty() {
            return Err(EnvError::protocol("empty frame"));
        }
        if tokens.len() < HEADER_FIELDS {
            return Err(EnvError::protocol(format!(
                "frame header has {} fields, expected {}",
                tokens.len(),
                HEADER_FIELDS
            )));
        }

        let version: i32 = parse_field(tokens[0], "version")?;
        if version != PROTOCOL_VERSION {
            return Err(EnvError::protocol(format!(
                "unsupported protocol version {}",
                version
            )));
        }

        let flag: i32 = parse_field(tokens[1], "flag")?;
        let n_double: usize = parse_field(tokens[2], "n_double")?;
        let n_int: usize = parse_field(tokens[3], "n_int")?;
        let n_bool: usize = parse_field(tokens[4], "n_bool")?;
        let sim_time: f64 = parse_field(tokens[5], "sim_time")?;

        if flag < 0 {
            return Err(EnvError::crashed(format!("engine reported failure flag {}", flag)));
        }
        if flag == FLAG_END_OF_SIMULATION {
            return Ok(Frame::Terminated { sim_time });
        }
        if flag != FLAG_OK {
            return Err(EnvError::protocol(format!("unknown frame flag {}", flag)));
        }

        if n_int != 0 || n_bool != 0 {
            return Err(EnvError::protocol(format!(
                "integer/boolean payloads are not supported (got {}/{})",
                n_int, n_bool
            )));
        }
        if n_double != self.observation_count {
            return Err(EnvError::protocol(format!(
                "frame declares {} values, {} were agreed",
                n_double, self.observation_count
            )));
        }

        let payload = &tokens[HEADER_FIELDS..];
        if payload.len() != n_double {
            return Err(EnvError::protocol(format!(
                "frame declares {} values but carries {}",
                n_double,
                payload.len()
            )));
        }

        let values = payload
            .iter()
            .enumerate()
            .map(|(i, token)| parse_field::<f64>(token, &format!("value #{}", i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Frame::State { sim_time, values })
    }
}

fn parse_field<T: std::str::FromStr>(token: &str, field: &str) -> Result<T, EnvError> {
    token
        .parse()
        .map_err(|_| EnvError::protocol(format!("{} is not numeric: '{}'", field, token)))
}

/// Builds a state response frame (engine side).
pub fn encode_state(sim_time: f64, values: &[f64]) -> String {
    let mut line = format!("{} {} {} 0 0 {}", PROTOCOL_VERSION, FLAG_OK, values.len(), sim_time);
    for value in values {
        line.push(' ');
        line.push_str(&value.to_string());
    }
    line.push('\n');
    line
}

/// Builds an end-of-simulation frame (engine side).
pub fn encode_end(sim_time: f64) -> String {
    format!("{} {} 0 0 0 {}\n", PROTOCOL_VERSION, FLAG_END_OF_SIMULATION, sim_time)
}

/// Decodes a request frame (engine side) into `(sim_time, setpoints)`.
pub fn decode_request(frame: &str, action_count: usize) -> Result<(f64, Vec<f64>), EnvError> {
    let codec = FrameCodec::new(action_count, action_count);
    match codec.decode(frame.as_bytes())? {
        Frame::State { sim_time, values } => Ok((sim_time, values)),
        Frame::Terminated { .. } => Err(EnvError::protocol("request frame carries the end flag")),
    }
}
