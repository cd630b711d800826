//! Base protocol definition types, shared between codec-driven protocols
//! ([`crate::codec::CodecDef`]) and the four raw wire formats
//! ([`crate::raw`]).

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Schema for a single protocol argument.
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub name: String,
    pub desc: String,
    pub default: Option<i128>,
    pub example: Option<i128>,
    /// printf-style format spec, e.g. `"X"`, `"x"`, `"b"`, `"d"`. Defaults to `"X"`.
    pub print: String,
    pub min: i128,
    pub max: i128,
    pub values: Option<Vec<i128>>,
}

impl ArgDef {
    /// Full bit mask implied by `max`: `(1 << bit_length(max)) - 1`.
    pub fn mask(&self) -> i128 {
        if self.max <= 0 {
            return 0;
        }
        let bits = 128 - self.max.leading_zeros() as i128;
        (1i128 << bits) - 1
    }

    pub fn new(name: impl Into<String>, max: i128) -> Self {
        Self {
            name: name.into(),
            desc: String::new(),
            default: None,
            example: None,
            print: "X".to_string(),
            min: 0,
            max,
            values: None,
        }
    }
}

/// `{frequency, bursts}`: bursts alternate sign, positive = mark, negative = space.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalData {
    pub frequency: i128,
    pub bursts: Vec<i128>,
}

impl fmt::Display for SignalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frequency={}Hz bursts=[", self.frequency)?;
        for (i, b) in self.bursts.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{b}")?;
        }
        write!(f, "]")
    }
}

/// A single successful decode: the protocol, its reconstructed arguments,
/// and which bits of each argument were never pinned down.
///
/// Holds the protocol's name rather than a reference to it: `decode` is
/// called through `&self`, not `Arc<Self>`, so there is no owning handle to
/// share here. Callers that need the full `ProtocolDef` (e.g. to call
/// `to_command`) look it back up via [`crate::registry::ProtocolRegistry`].
#[derive(Debug, Clone)]
pub struct DecodeMatch {
    pub protocol: String,
    pub args: Vec<i128>,
    pub missing_bits: Vec<i128>,
    pub uniquematch: bool,
    pub toggle_bit: i128,
    pub tolerance: f64,
}

/// Protocol category, as declared in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Ir,
    Rf,
    IrRf,
    /// The four hard-coded raw wire formats aren't IR or RF themselves.
    Raw,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtocolKind::Ir => "IR",
            ProtocolKind::Rf => "RF",
            ProtocolKind::IrRf => "IR/RF",
            ProtocolKind::Raw => "raw",
        })
    }
}

/// Common behaviour for both codec-driven and raw-format protocols.
pub trait ProtocolDef: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> ProtocolKind;
    fn desc(&self) -> &str;
    fn note(&self) -> Option<&str> {
        None
    }
    fn link(&self) -> &[String] {
        &[]
    }
    fn args(&self) -> &[ArgDef];

    /// Help string with the signature to use to send a command, e.g.
    /// `"nec:<addr>:<cmd?=0>"`.
    fn get_signature(&self) -> String {
        let mut parts = vec![self.name().to_string()];
        for arg in self.args() {
            match arg.default {
                Some(d) => parts.push(format!("<{}?={}>", arg.name, d)),
                None => parts.push(format!("<{}>", arg.name)),
            }
        }
        parts.join(":")
    }

    /// Validates a string argument list and fills in defaults, producing
    /// the final integer argument vector.
    fn parse_args(&self, args: &[String]) -> Result<Vec<i128>>;

    /// Re-renders an argument vector as a command string.
    fn to_command(&self, args: &[i128]) -> String;

    /// Encodes arguments into a raw signal. Fails for the hard-coded raw
    /// formats when the argument vector describes an inconsistent or
    /// unsupported wire encoding (e.g. pronto's learned-code length check);
    /// a `CodecDef` never fails here since its pattern has already been
    /// validated at catalogue load time.
    fn encode(&self, args: &[i128]) -> Result<SignalData>;

    /// Decodes a signal into every protocol-compatible match (empty if none).
    fn decode(&self, signal: &SignalData, tolerance: f64) -> Vec<DecodeMatch>;
}

/// A parsed `name[:arg]*` command string, resolved against a protocol.
#[derive(Clone)]
pub struct RemoteCommand {
    pub name: String,
    pub args: Vec<i128>,
    pub command: String,
    pub protocol: Arc<dyn ProtocolDef>,
}

impl fmt::Debug for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCommand")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("command", &self.command)
            .finish()
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_matches_bit_length() {
        let arg = ArgDef::new("addr", 0xFF);
        assert_eq!(arg.mask(), 0xFF);
        let arg = ArgDef::new("addr", 0x100);
        assert_eq!(arg.mask(), 0x1FF);
    }

    #[test]
    fn signature_marks_defaults() {
        let mut arg = ArgDef::new("cmd", 0xFF);
        arg.default = Some(0);
        struct Dummy(Vec<ArgDef>);
        impl ProtocolDef for Dummy {
            fn name(&self) -> &str {
                "dummy"
            }
            fn kind(&self) -> ProtocolKind {
                ProtocolKind::Ir
            }
            fn desc(&self) -> &str {
                ""
            }
            fn args(&self) -> &[ArgDef] {
                &self.0
            }
            fn parse_args(&self, _args: &[String]) -> Result<Vec<i128>> {
                Ok(vec![])
            }
            fn to_command(&self, _args: &[i128]) -> String {
                String::new()
            }
            fn encode(&self, _args: &[i128]) -> Result<SignalData> {
                Ok(SignalData::default())
            }
            fn decode(&self, _signal: &SignalData, _tolerance: f64) -> Vec<DecodeMatch> {
                vec![]
            }
        }
        let d = Dummy(vec![arg]);
        assert_eq!(d.get_signature(), "dummy:<cmd?=0>");
    }
}
