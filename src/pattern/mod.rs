//! The rule grammar used inside a protocol's `pattern` block: timing-slot
//! references, bitfield (`{...}`) rules, and `(...)` conditionals.
//!
//! Grounded on the Python source's `codecs/pattern.py` (three regexes plus a
//! recursive-descent driver) and `codecs/__init__.py`'s `RuleDef`. Here the
//! three regex-matched shapes become variants of one enum per spec §9's
//! "Tagged variants" note, and the regexes themselves become a hand-written
//! tokenizer (`lexer`) feeding a recursive-descent parser (`parser`), rather
//! than a single `Regex` per rule kind.

pub mod lexer;
pub mod parser;

use crate::error::Result;
use crate::value::ValueOrArg;

pub use parser::parse_pattern;

/// Binary operator applied to a data rule's payload before it is written
/// into the bitstream (or inverted back out of it at decode time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Shr,
    Shl,
    And,
    Or,
    Xor,
}

/// Comparison used by a conditional rule's predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Lt,
    Eq,
}

/// Bit order a data rule is emitted/read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    Msb,
    Lsb,
}

/// The `~data (op op_arg)?` prefix shared by data and conditional rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Operation {
    pub negate: bool,
    pub op: Option<Operator>,
    pub op_arg: i128,
}

/// Matches Python's `int.bit_length()`, including its magnitude-based
/// behavior for negative numbers (`(-5).bit_length() == 3`).
pub fn bit_length(value: i128) -> u32 {
    let magnitude = value.unsigned_abs();
    128 - magnitude.leading_zeros()
}

impl Operation {
    /// Evaluates the operation forwards: `negate` then `op`.
    pub fn apply(&self, data: i128) -> i128 {
        let data = if self.negate { !data } else { data };
        match self.op {
            Some(Operator::Add) => data + self.op_arg,
            Some(Operator::Sub) => data - self.op_arg,
            Some(Operator::Mul) => data * self.op_arg,
            Some(Operator::Div) => data / self.op_arg,
            Some(Operator::Shr) => data >> (self.op_arg as u32),
            Some(Operator::Shl) => data << (self.op_arg as u32),
            Some(Operator::And) => data & self.op_arg,
            Some(Operator::Or) => data | self.op_arg,
            Some(Operator::Xor) => data ^ self.op_arg,
            None => data,
        }
    }

    /// Inverts the operation: given the bits actually seen on the wire and
    /// how many bits were read, recovers the pre-operation value together
    /// with a mask of which bits of that value are actually known.
    pub fn invert(&self, data: i128, nbits: u32) -> (i128, i128) {
        let mut mask: i128 = (1i128 << nbits) - 1;
        let mut data = if self.negate { (data & mask) ^ mask } else { data };

        match self.op {
            Some(Operator::Add) => {
                data -= self.op_arg;
                mask |= (1i128 << bit_length(data)) - 1;
            }
            Some(Operator::Sub) => {
                data += self.op_arg;
                mask |= (1i128 << bit_length(data)) - 1;
            }
            Some(Operator::Mul) => {
                data /= self.op_arg;
                mask |= (1i128 << bit_length(data)) - 1;
            }
            Some(Operator::Div) => {
                data *= self.op_arg;
                mask |= (1i128 << bit_length(data)) - 1;
            }
            Some(Operator::Shr) => {
                data <<= self.op_arg as u32;
                mask <<= self.op_arg as u32;
            }
            Some(Operator::Shl) => {
                data >>= self.op_arg as u32;
                mask >>= self.op_arg as u32;
            }
            Some(Operator::And) => {
                mask |= self.op_arg;
            }
            Some(Operator::Or) => {
                mask |= !self.op_arg;
            }
            Some(Operator::Xor) => {
                data ^= self.op_arg;
            }
            None => {}
        }

        (data, mask)
    }
}

/// A `{data op nbits}` bitfield rule.
#[derive(Debug, Clone)]
pub struct DataRule {
    pub data: ValueOrArg,
    pub op: Operation,
    pub bit_order: BitOrder,
    pub nbits: ValueOrArg,
}

/// A `(data op ? consequent : alternate)` conditional rule.
#[derive(Debug, Clone)]
pub struct ConditionalRule {
    pub data: ValueOrArg,
    pub op: Operation,
    pub comparison: Comparison,
    pub threshold: i128,
    pub consequent: Vec<RuleDef>,
    pub alternate: Option<Vec<RuleDef>>,
}

impl ConditionalRule {
    /// Evaluates the predicate against the given argument vector.
    pub fn eval(&self, args: &[i128]) -> bool {
        let data = self.op.apply(self.data.get(args));
        match self.comparison {
            Comparison::Gt => data > self.threshold,
            Comparison::Lt => data < self.threshold,
            Comparison::Eq => data == self.threshold,
        }
    }
}

/// A single rule inside a pattern's pre/data/mid/post list.
#[derive(Debug, Clone)]
pub enum RuleDef {
    /// Reference to a named timing slot, by index into `TimingsDef::slots`.
    Timing(usize),
    Data(DataRule),
    Conditional(ConditionalRule),
}

/// `pre · (data · mid)^repeat · post`, as declared by a protocol's
/// `pattern` block.
#[derive(Debug, Clone, Default)]
pub struct PatternDef {
    pub pre: Vec<RuleDef>,
    pub data: Vec<RuleDef>,
    pub mid: Vec<RuleDef>,
    pub post: Vec<RuleDef>,
    pub repeat: Option<ValueOrArg>,
    pub repeat_send: Option<ValueOrArg>,
}

/// One named preset of carrier/unit/bit timings.
#[derive(Debug, Clone)]
pub struct TimingsDef {
    pub frequency: ValueOrArg,
    pub unit: ValueOrArg,
    pub one: Vec<ValueOrArg>,
    pub zero: Vec<ValueOrArg>,
    pub slot_names: Vec<String>,
    pub slots: Vec<Vec<ValueOrArg>>,
}

impl TimingsDef {
    /// Durations of a named slot, already scaled by `unit`.
    pub fn get_slot(&self, index: usize, args: &[i128]) -> Vec<i128> {
        match self.slots.get(index) {
            Some(slot) => slot.iter().map(|v| v.get(args) * self.unit.get(args)).collect(),
            None => Vec::new(),
        }
    }

    /// Durations for the one/zero bit pattern, already scaled by `unit`.
    pub fn get_bit(&self, value: i128, args: &[i128]) -> Vec<i128> {
        let signal = if value != 0 { &self.one } else { &self.zero };
        signal.iter().map(|v| v.get(args) * self.unit.get(args)).collect()
    }

    pub fn get_frequency(&self, args: &[i128]) -> i128 {
        self.frequency.get(args)
    }
}

/// Resolves a named argument to its 1-based index into the runtime argument
/// vector (index 0 is reserved for the implicit `_toggle` bit).
pub fn get_argn(name: &str, args: &[String]) -> Result<usize> {
    if name == crate::codec::TOGGLE_ARG {
        return Ok(0);
    }
    match args.iter().position(|a| a == name) {
        Some(idx) => Ok(idx + 1),
        None => Err(crate::error::RemoteProtoError::PatternParse {
            remainder: name.to_string(),
            message: format!("argument '{name}' not defined"),
        }),
    }
}

/// Resolves a named timing slot to its index into `TimingsDef::slots`.
pub fn check_timing(name: &str, timings: &[String]) -> Result<usize> {
    match timings.iter().position(|t| t == name) {
        Some(idx) => Ok(idx),
        None => Err(crate::error::RemoteProtoError::PatternParse {
            remainder: name.to_string(),
            message: format!("reference to undefined timings group '{name}'"),
        }),
    }
}
