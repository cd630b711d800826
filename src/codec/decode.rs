//! Signal-to-argument decoding: walking a pattern's rule tree against a
//! captured [`SignalData`] and reconstructing the argument vector.
//!
//! Grounded on the Python source's `codecs/decoder.py`. The biggest
//! divergence from a literal port is `DecodeState`: the Python version
//! keeps a live reference to the owning `CodecDef` and deep-copies itself
//! for conditional-rule backtracking. Here `DecodeState` only borrows the
//! pieces it actually needs (`TimingsDef`, `SignalData`) and owns a small
//! `Vec<DecodedArg>`, so backtracking is a cheap `Clone` of that state
//! rather than a recursive deep copy of the whole protocol.

use crate::pattern::{BitOrder, PatternDef, RuleDef, TimingsDef};
use crate::protocol::{ArgDef, DecodeMatch, SignalData};
use crate::value::ValueOrArg;

/// Carries the partial/full decode status of a single argument.
#[derive(Debug, Clone)]
pub struct DecodedArg {
    pub value: i128,
    pub mask: i128,
    pub decoded_mask: i128,
    pub min: i128,
    pub max: i128,
    pub values: Option<Vec<i128>>,
}

impl DecodedArg {
    pub fn new(arg: &ArgDef) -> Self {
        Self {
            value: 0,
            mask: arg.mask(),
            decoded_mask: 0,
            min: arg.min,
            max: arg.max,
            values: arg.values.clone(),
        }
    }

    /// A `DecodedArg` that is already fully known, for rules whose data
    /// slot is a literal rather than an argument reference.
    fn fixed(literal: i128) -> Self {
        let mut arg = Self {
            value: 0,
            mask: literal,
            decoded_mask: 0,
            min: literal,
            max: literal,
            values: None,
        };
        arg.update(literal, None);
        arg
    }

    /// Checks the new bits against whatever has already been decoded; if
    /// consistent, merges them in and returns `true`.
    pub fn update(&mut self, value: i128, mask: Option<i128>) -> bool {
        let mask = mask.unwrap_or(self.mask);

        if (self.value & mask) != (value & self.decoded_mask) {
            return false;
        }
        if value > self.max {
            return false;
        }

        self.decoded_mask |= mask;
        self.value |= value;
        true
    }
}

/// Mutable decoding progress against one [`TimingsDef`] preset.
#[derive(Clone)]
pub struct DecodeState<'a> {
    signal: &'a SignalData,
    tolerance: f64,
    used_tolerance: f64,
    decoded: usize,
    timings: &'a TimingsDef,
    pub args: Vec<DecodedArg>,
}

impl<'a> DecodeState<'a> {
    pub fn new(arg_defs: &[ArgDef], signal: &'a SignalData, tolerance: f64, timings: &'a TimingsDef) -> Self {
        let toggle_def = ArgDef::new(crate::codec::TOGGLE_ARG, 1);
        let mut args = Vec::with_capacity(arg_defs.len() + 1);
        args.push(DecodedArg::new(&toggle_def));
        args.extend(arg_defs.iter().map(DecodedArg::new));

        Self {
            signal,
            tolerance,
            used_tolerance: 0.0,
            decoded: 0,
            timings,
            args,
        }
    }

    pub fn used_tolerance(&self) -> f64 {
        self.used_tolerance
    }

    /// Checks whether the next bursts of the signal match the expected
    /// ones (within tolerance); if so, advances the decode cursor.
    fn expect_burst(&mut self, bursts: &[i128]) -> bool {
        if bursts.is_empty() {
            return true;
        }
        if bursts.len() > self.signal.bursts.len() - self.decoded {
            return false;
        }

        let mut decoded = self.decoded;
        for &burst in bursts {
            let expect = self.signal.bursts[decoded];
            let tolerance = if expect >= 0 { self.tolerance } else { -self.tolerance };
            let lo = expect as f64 * (1.0 - tolerance);
            let hi = expect as f64 * (1.0 + tolerance);
            let burst = burst as f64;

            if lo <= burst && burst <= hi {
                decoded += 1;
                if expect != 0 {
                    self.used_tolerance = self.used_tolerance.max(((burst - expect as f64) / expect as f64).abs());
                }
            } else {
                return false;
            }
        }

        self.decoded = decoded;
        true
    }

    /// Reads a run of zero/one bits for a data rule. Returns
    /// `(matched, value, bits_read)`.
    fn read_data(&mut self, expected_bits: &ValueOrArg, lsb: bool) -> (bool, i128, u32) {
        let one = self.timings.get_bit(1, &[]);
        let zero = self.timings.get_bit(0, &[]);

        let mut data: i128 = 0;
        let mut nbits: u32 = 0;

        loop {
            let bit = if self.expect_burst(&one) {
                1
            } else if self.expect_burst(&zero) {
                0
            } else {
                break;
            };

            if lsb {
                data |= bit << nbits;
            } else {
                data = (data << 1) | bit;
            }
            nbits += 1;

            match expected_bits.arg_index() {
                Some(idx) => {
                    if nbits as i128 == self.args[idx].max {
                        break;
                    }
                }
                None => {
                    if expected_bits.get(&[]) == nbits as i128 {
                        break;
                    }
                }
            }
        }

        let invalid = (!expected_bits.has_arg() && nbits as i128 != expected_bits.get(&[])) || nbits == 0;
        (!invalid, data, nbits)
    }
}

/// Tries to decode a single rule against the current signal position.
fn decode_rule(state: &mut DecodeState, rule: &RuleDef) -> bool {
    let checkpoint = state.decoded;

    match rule {
        RuleDef::Timing(idx) => {
            let burst = state.timings.get_slot(*idx, &[]);
            state.expect_burst(&burst)
        }

        RuleDef::Data(d) => {
            let (is_data, data, nbits) = state.read_data(&d.nbits, matches!(d.bit_order, BitOrder::Lsb));
            if !is_data {
                state.decoded = checkpoint;
                return false;
            }

            if let Some(idx) = d.nbits.arg_index() {
                if !state.args[idx].update(nbits as i128, None) {
                    state.decoded = checkpoint;
                    return false;
                }
            }

            let (value, mask) = d.op.invert(data, nbits);

            let updated = match d.data.arg_index() {
                Some(idx) => state.args[idx].update(value, Some(mask)),
                None => DecodedArg::fixed(d.data.get(&[])).update(value, Some(mask)),
            };

            if !updated {
                state.decoded = checkpoint;
                return false;
            }
            true
        }

        RuleDef::Conditional(c) => {
            let mut branch = state.clone();
            if decode_rules(&mut branch, &c.consequent) {
                if confirm_cond(c, &mut branch.args) {
                    *state = branch;
                }
                return true;
            }

            if let Some(alternate) = &c.alternate {
                let mut branch = state.clone();
                if decode_rules(&mut branch, alternate) {
                    *state = branch;
                    return true;
                }
            }

            // A conditional that matches neither branch still "succeeds":
            // nothing has been consumed from the (unmodified) parent state.
            true
        }
    }
}

/// Checks a conditional rule's predicate against a (partially) decoded arg,
/// confirming the branch taken was consistent, or inferring a fixed value
/// where the condition pins one down.
fn confirm_cond(rule: &crate::pattern::ConditionalRule, args: &mut [DecodedArg]) -> bool {
    use crate::pattern::Comparison;

    let idx = match rule.data.arg_index() {
        Some(idx) => idx,
        None => return false,
    };
    let (value, mask, decoded_mask) = {
        let arg = &args[idx];
        (arg.value, arg.mask, arg.decoded_mask)
    };

    if decoded_mask ^ mask == 0 {
        let data = rule.op.apply(value);
        return match rule.comparison {
            Comparison::Gt => data > rule.threshold,
            Comparison::Eq => data == rule.threshold,
            Comparison::Lt => data < rule.threshold,
        };
    }

    if rule.comparison == Comparison::Eq {
        let bits = crate::pattern::bit_length(mask);
        let (data, inv_mask) = rule.op.invert(rule.threshold, bits);
        return args[idx].update(data, Some(inv_mask));
    }

    false
}

fn decode_rules(state: &mut DecodeState, rules: &[RuleDef]) -> bool {
    for rule in rules {
        if !decode_rule(state, rule) {
            return false;
        }
    }
    true
}

/// Decodes a whole pattern (pre/data/mid/post plus repeat count) against
/// the state's signal.
pub fn decode_pattern(state: &mut DecodeState, pattern: &PatternDef) -> bool {
    let mut decode_repeat = false;
    let mut expected_repeat: i128 = 1;

    if let Some(repeat) = &pattern.repeat {
        if repeat.has_arg() {
            decode_repeat = true;
        } else {
            expected_repeat = repeat.get(&[]);
        }
    }

    if !pattern.pre.is_empty() && !decode_rules(state, &pattern.pre) {
        return false;
    }

    let mut repeat_count: i128 = 0;
    loop {
        let mut result = decode_rules(state, &pattern.data);
        if result && !pattern.mid.is_empty() {
            result = decode_rules(state, &pattern.mid);
        }

        if !result {
            if repeat_count < expected_repeat {
                return false;
            }
            if decode_repeat {
                if let Some(idx) = pattern.repeat.as_ref().and_then(|r| r.arg_index()) {
                    if !state.args[idx].update(repeat_count, None) {
                        return false;
                    }
                }
                break;
            }
        }

        repeat_count += 1;
        if repeat_count == expected_repeat && !decode_repeat {
            break;
        }
    }

    if !pattern.post.is_empty() && !decode_rules(state, &pattern.post) {
        return false;
    }

    true
}

/// Builds the public [`DecodeMatch`] from a finished decode state.
pub fn create_match(state: &DecodeState, protocol: String) -> DecodeMatch {
    let mut uniquematch = true;
    let mut args = Vec::with_capacity(state.args.len().saturating_sub(1));
    let mut missing_bits = Vec::with_capacity(args.capacity());

    let toggle_bit = state.args[0].value;
    for arg in &state.args[1..] {
        if arg.decoded_mask != arg.mask {
            uniquematch = false;
        }
        args.push(arg.value);
        missing_bits.push(arg.decoded_mask ^ arg.mask);
    }

    DecodeMatch {
        protocol,
        args,
        missing_bits,
        uniquematch,
        toggle_bit,
        tolerance: state.used_tolerance(),
    }
}
