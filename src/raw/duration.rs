//! Raw duration list format: a comma-separated list of signed microsecond
//! burst durations plus an optional carrier frequency. Grounded on the
//! Python source's `raw/duration.py`; the teacher's `.sub` raw-duration
//! import/export in `export/flipper.rs` works the same underlying shape
//! (alternating mark/space durations), just in a different container file
//! format.

use crate::error::{RemoteProtoError, Result};
use crate::numeric::{alternating_signs, parse_integer, quoted_split};
use crate::protocol::{ArgDef, DecodeMatch, ProtocolDef, ProtocolKind, SignalData};

pub struct DurationFormat {
    args: Vec<ArgDef>,
}

impl DurationFormat {
    pub fn new() -> Self {
        Self {
            args: super::data_and_frequency_args("durations", "List of durations (comma separated)", 0),
        }
    }
}

impl Default for DurationFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDef for DurationFormat {
    fn name(&self) -> &str {
        "duration"
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Raw
    }

    fn desc(&self) -> &str {
        "Raw durations format"
    }

    fn args(&self) -> &[ArgDef] {
        &self.args
    }

    fn parse_args(&self, args: &[String]) -> Result<Vec<i128>> {
        if args.is_empty() || args.len() > 2 {
            return Err(RemoteProtoError::CommandParse {
                command: args.join(":"),
                message: format!("expected 1 or 2 arguments, got {}", args.len()),
                signature: self.get_signature(),
            });
        }

        let mut durations = Vec::new();
        for part in quoted_split(&args[0], ',') {
            if part.is_empty() {
                return Err(RemoteProtoError::RawCodec {
                    format: "duration",
                    message: "empty duration value".to_string(),
                });
            }
            durations.push(parse_integer(&part)?);
        }
        alternating_signs(&durations).map_err(|message| RemoteProtoError::RawCodec {
            format: "duration",
            message,
        })?;

        let frequency = if args.len() == 2 { parse_integer(&args[1])? } else { 0 };
        durations.push(frequency);
        Ok(durations)
    }

    fn to_command(&self, args: &[i128]) -> String {
        let durations = &args[..args.len().saturating_sub(1)];
        let mut command = format!(
            "duration:{}",
            durations.iter().map(i128::to_string).collect::<Vec<_>>().join(", ")
        );
        let frequency = args.last().copied().unwrap_or(0);
        if frequency != 0 {
            command.push(':');
            command.push_str(&frequency.to_string());
        }
        command
    }

    fn encode(&self, args: &[i128]) -> Result<SignalData> {
        let (durations, frequency) = args.split_at(args.len().saturating_sub(1));
        Ok(SignalData {
            frequency: frequency.first().copied().unwrap_or(0),
            bursts: durations.to_vec(),
        })
    }

    fn decode(&self, signal: &SignalData, _tolerance: f64) -> Vec<DecodeMatch> {
        let mut args = signal.bursts.clone();
        args.push(signal.frequency);

        vec![DecodeMatch {
            protocol: self.name().to_string(),
            args,
            missing_bits: Vec::new(),
            uniquematch: true,
            toggle_bit: 0,
            tolerance: 0.0,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_command_parsing() {
        let fmt = DurationFormat::new();
        let args = fmt.parse_args(&["100,-200,100,-200".to_string(), "38000".to_string()]).unwrap();
        assert_eq!(args, vec![100, -200, 100, -200, 38000]);

        let signal = fmt.encode(&args).unwrap();
        assert_eq!(signal.frequency, 38000);
        assert_eq!(signal.bursts, vec![100, -200, 100, -200]);

        let matches = fmt.decode(&signal, 0.25);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].args, args);
    }

    #[test]
    fn rejects_non_alternating_signs() {
        let fmt = DurationFormat::new();
        assert!(fmt.parse_args(&["100,200".to_string()]).is_err());
    }
}
