//! Pronto hex raw format: space-separated 4-digit hex words, the first
//! four of which are a signal-type/carrier/intro-length/repeat-length
//! header. Grounded on the Python source's `raw/pronto.py`.

use crate::error::{RemoteProtoError, Result};
use crate::numeric::quoted_split;
use crate::protocol::{ArgDef, DecodeMatch, ProtocolDef, ProtocolKind, SignalData};

/// Pronto's reference carrier clock, in Hz: pulse counts are expressed as
/// multiples of `1/REFERENCE_FREQUENCY` seconds.
pub const REFERENCE_FREQUENCY: i128 = 4_145_146;

pub struct ProntoFormat {
    args: Vec<ArgDef>,
}

impl ProntoFormat {
    pub fn new() -> Self {
        Self {
            args: super::data_and_frequency_args("data", "Data in hex codes space separated", 0),
        }
    }
}

impl Default for ProntoFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDef for ProntoFormat {
    fn name(&self) -> &str {
        "pronto"
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Raw
    }

    fn desc(&self) -> &str {
        "Pronto hex raw format"
    }

    fn args(&self) -> &[ArgDef] {
        &self.args
    }

    fn parse_args(&self, args: &[String]) -> Result<Vec<i128>> {
        if args.len() != 1 {
            return Err(RemoteProtoError::CommandParse {
                command: args.join(":"),
                message: format!("expected one argument, got {}", args.len()),
                signature: self.get_signature(),
            });
        }

        let mut data = Vec::new();
        for word in quoted_split(&args[0], ' ') {
            if word.len() != 4 || !word.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(RemoteProtoError::RawCodec {
                    format: "pronto",
                    message: format!("'{word}' is not a 4-digit hex word"),
                });
            }
            data.push(i128::from_str_radix(&word, 16).expect("validated hex digits"));
        }
        Ok(data)
    }

    fn to_command(&self, args: &[i128]) -> String {
        let mut command = String::from("pronto:");
        for item in args {
            command.push_str(&format!("{item:04X} "));
        }
        command.trim_end().to_string()
    }

    fn encode(&self, args: &[i128]) -> Result<SignalData> {
        if args.len() < 4 {
            return Err(RemoteProtoError::RawCodec {
                format: "pronto",
                message: "expected at least 4 header words".to_string(),
            });
        }

        let mut result = SignalData::default();

        if args[0] == 0 {
            result.frequency = if args[1] != 0 {
                (REFERENCE_FREQUENCY as f64 / args[1] as f64 + 0.5) as i128
            } else {
                0
            };
        } else if args[0] == 0x0100 {
            result.frequency = 0;
        } else {
            return Err(RemoteProtoError::RawCodec {
                format: "pronto",
                message: format!("unsupported pronto signal type 0x{:X}", args[0]),
            });
        }

        let intro_pairs = args[2];
        let repeat_pairs = args[3];
        let expected_len = 4 + intro_pairs * 2 + repeat_pairs * 2;
        if args.len() as i128 != expected_len {
            return Err(RemoteProtoError::RawCodec {
                format: "pronto",
                message: format!("inconsistent length: expected {expected_len} but got {}", args.len()),
            });
        }

        let base = (1_000_000f64 * args[1] as f64 / REFERENCE_FREQUENCY as f64 + 0.5) as i128;
        let mut sign = 1i128;
        for &pulse in &args[4..] {
            result.bursts.push(pulse * base * sign);
            sign *= -1;
        }

        Ok(result)
    }

    fn decode(&self, signal: &SignalData, _tolerance: f64) -> Vec<DecodeMatch> {
        let mut args = vec![0i128, 0, 0, 0];

        if signal.frequency != 0 {
            args[0] = 0;
            args[1] = (REFERENCE_FREQUENCY as f64 / signal.frequency as f64 + 0.5) as i128;
        } else {
            args[0] = 0x0100;
            args[1] = REFERENCE_FREQUENCY;
        }

        if signal.bursts.is_empty() {
            return Vec::new();
        }

        // Pronto cannot distinguish intro from repeat bursts in a bare
        // duration list, so everything decodes as intro.
        args[2] = (signal.bursts.len() / 2) as i128;
        args[3] = (signal.bursts.len() % 2) as i128;

        let base = (1_000_000f64 * args[1] as f64 / REFERENCE_FREQUENCY as f64 + 0.5) as i128;
        let mut sign = 1i128;
        for &burst in &signal.bursts {
            let pulse = burst * sign;
            if pulse < 0 {
                return Vec::new();
            }
            args.push((pulse as f64 / base as f64 + 0.5) as i128);
            sign *= -1;
        }

        if sign < 0 {
            let last = *args.last().expect("bursts non-empty");
            args.push(last * 2);
        }

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
    fn parses_hex_words() {
        let fmt = ProntoFormat::new();
        let args = fmt.parse_args(&["0000 006D 0000 0001 0060 0018".to_string()]).unwrap();
        assert_eq!(args, vec![0, 0x6D, 0, 1, 0x60, 0x18]);
    }

    #[test]
    fn rejects_short_words() {
        let fmt = ProntoFormat::new();
        assert!(fmt.parse_args(&["6D".to_string()]).is_err());
    }

    #[test]
    fn decode_then_reencode_is_consistent() {
        let fmt = ProntoFormat::new();
        let signal = SignalData {
            frequency: 38000,
            bursts: vec![9000, -4500, 560, -560],
        };
        let matches = fmt.decode(&signal, 0.25);
        assert_eq!(matches.len(), 1);
        let reencoded = fmt.encode(&matches[0].args).unwrap();
        assert_eq!(reencoded.bursts.len(), signal.bursts.len());
    }
}
