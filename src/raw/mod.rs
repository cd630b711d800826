//! The four raw wire formats: self-contained `ProtocolDef` implementations
//! that do not go through the pattern/timings machinery at all. Each comes
//! from a dedicated module under `remoteprotocols/raw/` in the Python
//! source, and each has its own dedicated wire format credited there.

pub mod broadlink;
pub mod duration;
pub mod miio;
pub mod pronto;

use crate::protocol::ArgDef;

/// Every raw format shares the same two-argument shape: an opaque payload
/// (duration list / hex words / base64 blob) plus a trailing frequency
/// argument with a format-specific default.
fn data_and_frequency_args(name: &str, desc: &str, default_frequency: i128) -> Vec<ArgDef> {
    vec![
        ArgDef {
            name: name.to_string(),
            desc: desc.to_string(),
            default: None,
            example: None,
            print: "X".to_string(),
            min: 0,
            max: i128::MAX,
            values: None,
        },
        ArgDef {
            name: "frequency".to_string(),
            desc: "Frequency".to_string(),
            default: Some(default_frequency),
            example: None,
            print: "X".to_string(),
            min: 0,
            max: i128::MAX,
            values: None,
        },
    ]
}
