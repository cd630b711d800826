//! Broadlink base64 raw format: the wire format used by Broadlink universal
//! remotes. Grounded on the Python source's `raw/broadlink.py`, credited
//! there to <https://github.com/mjg59/python-broadlink/blob/master/protocol.md>.
//!
//! Argument layout after `parse_args`: `[signal_type, repeat, burst..., frequency]`.
//! `signal_type` selects the carrier: `0xB2` fixes 433 MHz, `0xD7` fixes
//! 315 MHz, anything else (conventionally `0x26`) is IR and the trailing
//! `frequency` argument is used instead.

use base64::Engine;

use crate::error::{RemoteProtoError, Result};
use crate::numeric::parse_integer;
use crate::protocol::{ArgDef, DecodeMatch, ProtocolDef, ProtocolKind, SignalData};

const SIGNAL_RF433: i128 = 0xB2;
const SIGNAL_RF315: i128 = 0xD7;
const FREQ_433MHZ: i128 = 433_000_000;
const FREQ_315MHZ: i128 = 315_000_000;

/// Scale factor between a Broadlink tick and a microsecond: `8192 / 269`.
const TICK_NUMERATOR: f64 = 8192.0;
const TICK_DENOMINATOR: f64 = 269.0;

pub struct BroadlinkFormat {
    args: Vec<ArgDef>,
}

impl BroadlinkFormat {
    pub fn new() -> Self {
        Self {
            args: super::data_and_frequency_args("b64", "Base 64 encoded data", 0),
        }
    }
}

impl Default for BroadlinkFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDef for BroadlinkFormat {
    fn name(&self) -> &str {
        "broadlink"
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Raw
    }

    fn desc(&self) -> &str {
        "Broadlink base64 raw format"
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
                format: "broadlink",
                message: format!("invalid base64: {e}"),
            })?;

        if bytes.len() < 4 {
            return Err(RemoteProtoError::RawCodec {
                format: "broadlink",
                message: "no header data".to_string(),
            });
        }
        if ![0xB2u8, 0xD7, 0x26].contains(&bytes[0]) {
            return Err(RemoteProtoError::RawCodec {
                format: "broadlink",
                message: "invalid signal type".to_string(),
            });
        }

        // The source computes this check but only logs it (a typo'd
        // `b64[3] >> 8` that can never contribute) and never enforces it;
        // kept lenient here per spec §9's open question on this check.
        let declared_len = bytes[2] as usize + (bytes[3] as usize >> 8) + 4 + 2;
        if bytes.len() != declared_len {
            tracing::debug!(
                declared = declared_len,
                actual = bytes.len(),
                "broadlink payload length mismatch (ignored, lenient mode)"
            );
        }

        let mut result = vec![bytes[0] as i128, bytes[1] as i128];

        let data = &bytes[4..];
        let mut idx = 0usize;
        while idx + 2 < data.len() {
            let pulse = if data[idx] == 0 {
                let p = ((data[idx + 1] as i128) << 8) + data[idx + 2] as i128;
                idx += 3;
                p
            } else {
                let p = data[idx] as i128;
                idx += 1;
                p
            };
            result.push((pulse as f64 * TICK_NUMERATOR / TICK_DENOMINATOR + 0.5) as i128);
        }

        result.push(frequency);
        Ok(result)
    }

    fn to_command(&self, args: &[i128]) -> String {
        let mut header = vec![args[0] as u8, args[1] as u8];
        let mut data = Vec::new();

        for &burst in &args[2..args.len() - 1] {
            let ticks = (burst.unsigned_abs() as f64 * TICK_DENOMINATOR / TICK_NUMERATOR + 0.5) as i128;
            if ticks > 0xFF {
                data.push(0);
                data.push((ticks >> 8) as u8);
                data.push((ticks & 0xFF) as u8);
            } else {
                data.push(ticks as u8);
            }
        }

        header.push((data.len() & 0xFF) as u8);
        header.push((data.len() >> 8) as u8);
        data.push(0);
        data.push(0);

        header.extend_from_slice(&data);
        let mut command = format!("broadlink:{}", base64::engine::general_purpose::STANDARD.encode(&header));
        let frequency = *args.last().unwrap_or(&0);
        if frequency != 0 {
            command.push(':');
            command.push_str(&frequency.to_string());
        }
        command
    }

    fn encode(&self, args: &[i128]) -> Result<SignalData> {
        let signal_type = args[0];
        let repeat = args[1];
        let frequency = *args.last().unwrap_or(&0);

        let carrier = if signal_type == SIGNAL_RF433 {
            FREQ_433MHZ
        } else if signal_type == SIGNAL_RF315 {
            FREQ_315MHZ
        } else {
            frequency
        };

        let mut bursts = Vec::new();
        let mut sign = 1i128;
        for &burst in &args[2..args.len() - 1] {
            bursts.push(burst * sign);
            sign = -sign;
        }

        if repeat > 0 {
            let single = bursts.clone();
            for _ in 0..repeat {
                bursts.extend_from_slice(&single);
            }
        }

        Ok(SignalData {
            frequency: carrier,
            bursts,
        })
    }

    fn decode(&self, signal: &SignalData, _tolerance: f64) -> Vec<DecodeMatch> {
        let mut args = if signal.frequency < 1_000_000 {
            vec![0x26i128, 0]
        } else if signal.frequency < 370_000_000 {
            vec![SIGNAL_RF315, 0]
        } else {
            vec![SIGNAL_RF433, 0]
        };

        args.extend(signal.bursts.iter().map(|b| b.unsigned_abs() as i128));
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
    fn decode_then_command_round_trips_header() {
        let fmt = BroadlinkFormat::new();
        let signal = SignalData {
            frequency: 0,
            bursts: vec![560, -560, 1680, -560],
        };
        let matches = fmt.decode(&signal, 0.25);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].args[0], 0x26);

        let command = fmt.to_command(&matches[0].args);
        assert!(command.starts_with("broadlink:"));

        let reparsed = fmt.parse_args(&[command["broadlink:".len()..].to_string()]).unwrap();
        assert_eq!(reparsed[0], 0x26);
        assert_eq!(reparsed.len(), matches[0].args.len());
    }

    #[test]
    fn carrier_fixed_for_rf_signal_types() {
        let fmt = BroadlinkFormat::new();
        let signal = fmt.encode(&[0xB2, 0, 100, -100, 99999]).unwrap();
        assert_eq!(signal.frequency, FREQ_433MHZ);
    }

    #[test]
    fn rejects_bad_signal_type_byte() {
        let fmt = BroadlinkFormat::new();
        let bogus = base64::engine::general_purpose::STANDARD.encode([0x01, 0x00, 0x00, 0x00]);
        assert!(fmt.parse_args(&[bogus]).is_err());
    }
}
