//! Xiaomi Miio base64 raw format. Grounded on the Python source's
//! `raw/miio.py`, credited there to
//! <https://github.com/rytilahti/python-miio/blob/master/miio/chuangmi_ir.py>.
//!
//! Wire layout: `A5 67`, a big-endian edge count, a sorted dictionary of up
//! to 16 distinct durations (two bytes each), then one byte per pulse pair
//! packing `low_index | high_index << 4`.

use base64::Engine;

use crate::error::{RemoteProtoError, Result};
use crate::numeric::parse_integer;
use crate::protocol::{ArgDef, DecodeMatch, ProtocolDef, ProtocolKind, SignalData};

const HEADER1: u8 = 0xA5;
const HEADER2: u8 = 0x67;
const MAX_DISTINCT_DURATIONS: usize = 0x10;

pub struct MiioFormat {
    args: Vec<ArgDef>,
}

impl MiioFormat {
    pub fn new() -> Self {
        Self {
            args: super::data_and_frequency_args("b64", "Base 64 encoded data", 38400),
        }
    }
}

impl Default for MiioFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDef for MiioFormat {
    fn name(&self) -> &str {
        "miio"
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Raw
    }

    fn desc(&self) -> &str {
        "Miio base64 raw format"
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

        let frequency = if args.len() == 2 { parse_integer(&args[1])? } else { 0 };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(args[0].as_bytes())
            .map_err(|e| RemoteProtoError::RawCodec {
                format: "miio",
                message: format!("invalid base64: {e}"),
            })?;

        if bytes.len() < 6 {
            return Err(RemoteProtoError::RawCodec {
                format: "miio",
                message: "no header data".to_string(),
            });
        }
        if bytes[0] != HEADER1 || bytes[1] != HEADER2 {
            return Err(RemoteProtoError::RawCodec {
                format: "miio",
                message: "invalid data header".to_string(),
            });
        }

        let edges = (bytes[2] as usize) * 256 + bytes[3] as usize;
        let pairs = (edges + 1) / 2;
        if pairs > bytes.len() {
            return Err(RemoteProtoError::RawCodec {
                format: "miio",
                message: "inconsistent declared edge count".to_string(),
            });
        }
        let data = &bytes[bytes.len() - pairs..];

        let mut times = Vec::new();
        let mut idx = 4usize;
        let times_end = bytes.len() - pairs + 1;
        while idx < times_end && idx + 1 < bytes.len() {
            times.push(((bytes[idx] as i128) << 8) + bytes[idx + 1] as i128);
            idx += 2;
        }

        let mut result = Vec::new();
        for &byte in data {
            let low = (byte & 0xF) as usize;
            let high = (byte >> 4) as usize;
            let low_time = *times.get(low).ok_or_else(|| RemoteProtoError::RawCodec {
                format: "miio",
                message: format!("duration index {low} out of range of the {} entry dictionary", times.len()),
            })?;
            let high_time = *times.get(high).ok_or_else(|| RemoteProtoError::RawCodec {
                format: "miio",
                message: format!("duration index {high} out of range of the {} entry dictionary", times.len()),
            })?;
            result.push(low_time);
            result.push(high_time);
        }

        result.push(frequency);
        Ok(result)
    }

    fn to_command(&self, args: &[i128]) -> String {
        let edges = args.len() as i128 - 2;
        let mut data = vec![HEADER1, HEADER2, (edges >> 8) as u8, (edges & 0xFF) as u8];

        let mut times: Vec<i128> = args[..args.len() - 1].to_vec();
        times.sort_unstable();
        times.dedup();

        for &t in &times {
            data.push((t >> 8) as u8);
            data.push((t & 0xFF) as u8);
        }

        let mut idx = 0;
        while idx + 1 < args.len() - 1 {
            let low = times.iter().position(|&t| t == args[idx]).unwrap_or(0);
            let high = times.iter().position(|&t| t == args[idx + 1]).unwrap_or(0);
            data.push((low | (high << 4)) as u8);
            idx += 2;
        }

        let mut command = format!("miio:{}", base64::engine::general_purpose::STANDARD.encode(&data));
        let frequency = *args.last().unwrap_or(&0);
        if frequency != 0 {
            command.push(':');
            command.push_str(&frequency.to_string());
        }
        command
    }

    fn encode(&self, args: &[i128]) -> Result<SignalData> {
        let durations: Vec<i128> = args[..args.len() - 1].to_vec();
        let distinct = {
            let mut t = durations.clone();
            t.sort_unstable();
            t.dedup();
            t.len()
        };
        if distinct > MAX_DISTINCT_DURATIONS {
            return Err(RemoteProtoError::RawCodec {
                format: "miio",
                message: format!("too many different pulse lengths in signal ({distinct} > {MAX_DISTINCT_DURATIONS})"),
            });
        }

        let frequency = *args.last().unwrap_or(&0);
        let mut bursts = Vec::with_capacity(durations.len());
        let mut sign = 1i128;
        for &pulse in &durations {
            bursts.push(pulse * sign);
            sign = -sign;
        }

        Ok(SignalData { frequency, bursts })
    }

    fn decode(&self, signal: &SignalData, _tolerance: f64) -> Vec<DecodeMatch> {
        if signal.bursts.first().is_some_and(|&b| b < 0) {
            return Vec::new();
        }

        let mut args: Vec<i128> = signal
            .bursts
            .iter()
            .map(|b| ((b.unsigned_abs() as f64 / 10.0).round() as i128) * 10)
            .collect();

        if signal.bursts.len() % 2 == 1 {
            let last = *signal.bursts.last().expect("non-empty, checked by modulo");
            args.push(((last.unsigned_abs() as f64 / 10.0).round() as i128) * 20);
        }

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
    fn encode_then_to_command_round_trips_dictionary() {
        let fmt = MiioFormat::new();
        let args = vec![560i128, -560, 1680, -560, 38400];
        let signal = fmt.encode(&args).unwrap();
        assert_eq!(signal.bursts, vec![560, -560, 1680, -560]);

        let matches = fmt.decode(&signal, 0.25);
        assert_eq!(matches.len(), 1);

        let command = fmt.to_command(&matches[0].args);
        let reparsed = fmt.parse_args(&[command["miio:".len()..].to_string()]).unwrap();
        assert_eq!(reparsed, matches[0].args);
    }

    #[test]
    fn rejects_too_many_distinct_durations_on_encode() {
        let fmt = MiioFormat::new();
        let mut args: Vec<i128> = (0..20).map(|i| 100 + i * 10).collect();
        args.push(0);
        assert!(fmt.encode(&args).is_err());
    }

    #[test]
    fn rejects_bad_header() {
        let fmt = MiioFormat::new();
        let bogus = base64::engine::general_purpose::STANDARD.encode([0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert!(fmt.parse_args(&[bogus]).is_err());
    }
}
