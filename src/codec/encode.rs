//! Argument-to-signal encoding: walking a pattern's rule tree and emitting
//! burst durations. Grounded on the Python source's `codecs/encoder.py`.

use crate::pattern::{BitOrder, PatternDef, RuleDef, TimingsDef};

fn encode_rule(rule: &RuleDef, args: &[i128], timings: &TimingsDef) -> Vec<i128> {
    match rule {
        RuleDef::Timing(idx) => timings.get_slot(*idx, args),

        RuleDef::Data(d) => {
            let data = d.op.apply(d.data.get(args));
            let nbits = d.nbits.get(args).max(0) as u32;

            let mut signal = Vec::new();
            let positions: Box<dyn Iterator<Item = u32>> = match d.bit_order {
                BitOrder::Msb => Box::new((0..nbits).rev()),
                BitOrder::Lsb => Box::new(0..nbits),
            };
            for i in positions {
                signal.extend(timings.get_bit(data & (1i128 << i), args));
            }
            signal
        }

        RuleDef::Conditional(c) => {
            if c.eval(args) {
                encode_rules(&c.consequent, args, timings)
            } else if let Some(alternate) = &c.alternate {
                encode_rules(alternate, args, timings)
            } else {
                Vec::new()
            }
        }
    }
}

fn encode_rules(rules: &[RuleDef], args: &[i128], timings: &TimingsDef) -> Vec<i128> {
    let mut signal = Vec::new();
    for rule in rules {
        signal.extend(encode_rule(rule, args, timings));
    }
    signal
}

/// Encodes a whole pattern (pre/data/mid/post, repeated `repeat`/`repeat_send`
/// times) into a burst-duration sequence.
pub fn encode_pattern(pattern: &PatternDef, args: &[i128], timings: &TimingsDef) -> Vec<i128> {
    let repeat = if let Some(repeat_send) = &pattern.repeat_send {
        repeat_send.get(args)
    } else if let Some(repeat) = &pattern.repeat {
        repeat.get(args)
    } else {
        1
    };

    let mut result = encode_rules(&pattern.pre, args, timings);
    for _ in 0..repeat.max(0) {
        result.extend(encode_rules(&pattern.data, args, timings));
        result.extend(encode_rules(&pattern.mid, args, timings));
    }
    result.extend(encode_rules(&pattern.post, args, timings));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{DataRule, Operation};
    use crate::value::ValueOrArg;

    fn timings_fixture() -> TimingsDef {
        TimingsDef {
            frequency: ValueOrArg::literal(38000),
            unit: ValueOrArg::literal(1),
            one: vec![ValueOrArg::literal(560), ValueOrArg::literal(-560)],
            zero: vec![ValueOrArg::literal(560), ValueOrArg::literal(-1690)],
            slot_names: vec!["header".to_string()],
            slots: vec![vec![ValueOrArg::literal(9000), ValueOrArg::literal(-4500)]],
        }
    }

    #[test]
    fn encodes_timing_slot() {
        let timings = timings_fixture();
        let rule = RuleDef::Timing(0);
        assert_eq!(encode_rule(&rule, &[], &timings), vec![9000, -4500]);
    }

    #[test]
    fn encodes_data_bits_msb() {
        let timings = timings_fixture();
        let rule = RuleDef::Data(DataRule {
            data: ValueOrArg::literal(0b10),
            op: Operation::default(),
            bit_order: BitOrder::Msb,
            nbits: ValueOrArg::literal(2),
        });
        // MSB-first: bit 1 then bit 0 => one, zero
        assert_eq!(encode_rule(&rule, &[], &timings), vec![560, -560, 560, -1690]);
    }

    #[test]
    fn pattern_repeats_data_and_mid() {
        let timings = timings_fixture();
        let pattern = PatternDef {
            pre: vec![RuleDef::Timing(0)],
            data: vec![RuleDef::Data(DataRule {
                data: ValueOrArg::literal(1),
                op: Operation::default(),
                bit_order: BitOrder::Lsb,
                nbits: ValueOrArg::literal(1),
            })],
            mid: vec![],
            post: vec![],
            repeat: Some(ValueOrArg::literal(2)),
            repeat_send: None,
        };
        let bursts = encode_pattern(&pattern, &[], &timings);
        assert_eq!(bursts, vec![9000, -4500, 560, -560, 560, -560]);
    }
}
