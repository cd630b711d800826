//! YAML catalogue schema and two-pass validation, turning a protocol's
//! declarative YAML definition into a [`crate::codec::CodecDef`].
//!
//! Grounded on the Python source's `codecs/schema1.py` (structural schema:
//! required/optional keys, scalar types) and `codecs/schema2.py`
//! (cross-referential pass: timing-slot names, argument-name resolution,
//! pattern parsing). Here both passes run as one function per protocol,
//! `build_protocol`, since `serde` already does most of schema1's job by
//! refusing to deserialize a structurally invalid document.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::codec::CodecDef;
use crate::error::{CatalogueIssue, RemoteProtoError, Result};
use crate::numeric::{alternating_signs, parse_integer};
use crate::pattern::{get_argn, parse_pattern, PatternDef, TimingsDef};
use crate::protocol::{ArgDef, ProtocolKind};
use crate::value::ValueOrArg;

/// A catalogue scalar as written in YAML: a native integer, or a string
/// that is either a numeric literal (hex/binary/mnemonic, see
/// [`crate::numeric::parse_integer`]) or the name of one of the protocol's
/// declared arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i128),
    Text(String),
}

impl RawScalar {
    /// Resolves this scalar as a plain literal (arg names are rejected).
    fn literal(&self) -> std::result::Result<i128, String> {
        match self {
            RawScalar::Int(v) => Ok(*v),
            RawScalar::Text(s) => parse_integer(s).map_err(|e| e.to_string()),
        }
    }

    /// Resolves this scalar as either a literal or an argument reference,
    /// trying a numeric parse before falling back to an argument-name
    /// lookup (so `"-4500"` stays a literal, never an arg miss).
    fn value_or_arg(&self, args: &[String]) -> std::result::Result<ValueOrArg, String> {
        match self {
            RawScalar::Int(v) => Ok(ValueOrArg::literal(*v)),
            RawScalar::Text(s) => {
                if let Ok(v) = parse_integer(s) {
                    return Ok(ValueOrArg::literal(v));
                }
                get_argn(s, args).map(ValueOrArg::arg).map_err(|e| e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawArgDef {
    name: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    default: Option<RawScalar>,
    #[serde(default)]
    example: Option<RawScalar>,
    #[serde(default = "default_print")]
    print: String,
    #[serde(default)]
    min: Option<RawScalar>,
    max: RawScalar,
    #[serde(default)]
    values: Option<Vec<RawScalar>>,
}

fn default_print() -> String {
    "X".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawPattern {
    /// A bare string is shorthand for `{data: <string>}`, no pre/mid/post.
    Shorthand(String),
    Full(RawPatternObj),
}

#[derive(Debug, Clone, Deserialize)]
struct RawPatternObj {
    #[serde(default)]
    pre: String,
    data: String,
    #[serde(default)]
    mid: String,
    #[serde(default)]
    post: String,
    #[serde(default)]
    repeat: Option<RawScalar>,
    #[serde(default)]
    repeat_send: Option<RawScalar>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTimingsDef {
    frequency: RawScalar,
    #[serde(default)]
    unit: Option<RawScalar>,
    one: Vec<RawScalar>,
    zero: Vec<RawScalar>,
    /// Every other key is a named timing slot. `BTreeMap` keeps the slot
    /// order deterministic (and thus identical across presets) regardless
    /// of how the YAML happened to order them.
    #[serde(flatten)]
    extra: BTreeMap<String, Vec<RawScalar>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTimingsInput {
    Many(Vec<RawTimingsDef>),
    One(RawTimingsDef),
}

#[derive(Debug, Clone, Deserialize)]
struct RawProtocolDef {
    #[serde(default)]
    desc: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    link: Vec<String>,
    #[serde(default)]
    note: Option<String>,
    pattern: RawPattern,
    #[serde(default)]
    args: Vec<RawArgDef>,
    timings: RawTimingsInput,
    #[serde(default)]
    preset: Option<RawScalar>,
}

/// Parses and validates a whole catalogue document, returning every
/// successfully-built protocol. `source` is the file name or other label
/// attached to any [`CatalogueIssue`]s raised against this document.
pub fn parse_catalogue(source: &str, text: &str) -> Result<Vec<(String, CodecDef)>> {
    let raw: BTreeMap<String, RawProtocolDef> =
        serde_yaml::from_str(text).map_err(|e| RemoteProtoError::Catalogue(vec![CatalogueIssue::new(source, e.to_string())]))?;

    let mut issues = Vec::new();
    let mut protocols = Vec::new();

    for (name, def) in raw {
        match build_protocol(&name, def) {
            Ok(codec) => protocols.push((name.clone(), codec)),
            Err(messages) => {
                for message in messages {
                    issues.push(CatalogueIssue::new(source, format!("{name}: {message}")));
                }
            }
        }
    }

    if !issues.is_empty() {
        tracing::warn!("{source}: {} protocol(s) failed catalogue validation", issues.len());
        return Err(RemoteProtoError::Catalogue(issues));
    }
    Ok(protocols)
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase()) && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Resolves one slot's duration list, collecting errors for any entry that
/// fails to resolve, and checking that the literal entries (skipping
/// argument references, whose sign is unknown until runtime) alternate.
fn build_slot(label: &str, values: &[RawScalar], arg_names: &[String], preset_idx: usize, errors: &mut Vec<String>) -> Vec<ValueOrArg> {
    let mut out = Vec::with_capacity(values.len());
    let mut literals = Vec::with_capacity(values.len());

    for v in values {
        match v.value_or_arg(arg_names) {
            Ok(voa) => {
                if let ValueOrArg::Literal(n) = voa {
                    literals.push(n);
                }
                out.push(voa);
            }
            Err(e) => errors.push(format!("timings preset #{preset_idx}: {label}: {e}")),
        }
    }

    if let Err(e) = alternating_signs(&literals) {
        errors.push(format!("timings preset #{preset_idx}: {label}: {e}"));
    }

    out
}

fn build_protocol(name: &str, def: RawProtocolDef) -> std::result::Result<CodecDef, Vec<String>> {
    let mut errors = Vec::new();

    if !valid_name(name) {
        errors.push("protocol name must start with a lowercase letter and contain only lowercase letters, digits, or underscores".to_string());
    }

    let kind = match def.kind.as_str() {
        "IR" => ProtocolKind::Ir,
        "RF" => ProtocolKind::Rf,
        "IR/RF" => ProtocolKind::IrRf,
        other => {
            errors.push(format!("unknown protocol type '{other}', expected IR, RF, or IR/RF"));
            ProtocolKind::Ir
        }
    };

    let mut args = Vec::with_capacity(def.args.len());
    let mut arg_names = Vec::with_capacity(def.args.len());

    for raw_arg in &def.args {
        if arg_names.contains(&raw_arg.name) {
            errors.push(format!("duplicate argument name '{}'", raw_arg.name));
        }
        arg_names.push(raw_arg.name.clone());

        let max = match raw_arg.max.literal() {
            Ok(v) => v,
            Err(e) => {
                errors.push(format!("arg '{}': invalid max: {e}", raw_arg.name));
                0
            }
        };
        let min = match &raw_arg.min {
            Some(raw) => match raw.literal() {
                Ok(v) => v,
                Err(e) => {
                    errors.push(format!("arg '{}': invalid min: {e}", raw_arg.name));
                    0
                }
            },
            None => 0,
        };
        let default = match &raw_arg.default {
            Some(raw) => match raw.literal() {
                Ok(v) => Some(v),
                Err(e) => {
                    errors.push(format!("arg '{}': invalid default: {e}", raw_arg.name));
                    None
                }
            },
            None => None,
        };
        let example = raw_arg.example.as_ref().and_then(|raw| raw.literal().ok());
        let values = raw_arg.values.as_ref().map(|list| {
            list.iter()
                .filter_map(|v| match v.literal() {
                    Ok(n) => Some(n),
                    Err(e) => {
                        errors.push(format!("arg '{}': invalid value: {e}", raw_arg.name));
                        None
                    }
                })
                .collect::<Vec<_>>()
        });

        if min > max {
            errors.push(format!("arg '{}': min {min} is greater than max {max}", raw_arg.name));
        }
        if let Some(d) = default {
            if d < min || d > max {
                errors.push(format!("arg '{}': default {d} is outside [{min}, {max}]", raw_arg.name));
            }
            if let Some(values) = &values {
                if !values.contains(&d) {
                    errors.push(format!("arg '{}': default {d} is not one of {values:?}", raw_arg.name));
                }
            }
        }

        args.push(ArgDef {
            name: raw_arg.name.clone(),
            desc: raw_arg.desc.clone(),
            default,
            example,
            print: raw_arg.print.clone(),
            min,
            max,
            values,
        });
    }

    let raw_timings = match def.timings {
        RawTimingsInput::Many(list) => list,
        RawTimingsInput::One(single) => vec![single],
    };
    if raw_timings.is_empty() {
        errors.push("at least one timings preset is required".to_string());
    }

    let slot_names: Vec<String> = raw_timings.first().map(|t| t.extra.keys().cloned().collect()).unwrap_or_default();

    let mut timings = Vec::with_capacity(raw_timings.len());
    for (preset_idx, raw) in raw_timings.iter().enumerate() {
        let these_names: Vec<String> = raw.extra.keys().cloned().collect();
        if these_names != slot_names {
            errors.push(format!(
                "timings preset #{preset_idx}: slot names {these_names:?} do not match the first preset's {slot_names:?}"
            ));
        }

        let frequency = match raw.frequency.value_or_arg(&arg_names) {
            Ok(v) => v,
            Err(e) => {
                errors.push(format!("timings preset #{preset_idx}: invalid frequency: {e}"));
                ValueOrArg::literal(0)
            }
        };
        let unit = match &raw.unit {
            Some(raw_unit) => match raw_unit.value_or_arg(&arg_names) {
                Ok(v) => v,
                Err(e) => {
                    errors.push(format!("timings preset #{preset_idx}: invalid unit: {e}"));
                    ValueOrArg::literal(1)
                }
            },
            None => ValueOrArg::literal(1),
        };

        let one = build_slot("one", &raw.one, &arg_names, preset_idx, &mut errors);
        let zero = build_slot("zero", &raw.zero, &arg_names, preset_idx, &mut errors);

        let slots = slot_names
            .iter()
            .map(|slot_name| {
                let values = raw.extra.get(slot_name).map(Vec::as_slice).unwrap_or(&[]);
                build_slot(slot_name, values, &arg_names, preset_idx, &mut errors)
            })
            .collect();

        timings.push(TimingsDef {
            frequency,
            unit,
            one,
            zero,
            slot_names: slot_names.clone(),
            slots,
        });
    }

    let pattern_obj = match def.pattern {
        RawPattern::Shorthand(data) => RawPatternObj {
            pre: String::new(),
            data,
            mid: String::new(),
            post: String::new(),
            repeat: None,
            repeat_send: None,
        },
        RawPattern::Full(obj) => obj,
    };

    let mut parse_field = |label: &str, field: &str| -> Vec<crate::pattern::RuleDef> {
        if field.trim().is_empty() {
            return Vec::new();
        }
        match parse_pattern(field, &slot_names, &arg_names) {
            Ok(rules) => rules,
            Err(e) => {
                errors.push(format!("pattern.{label}: {e}"));
                Vec::new()
            }
        }
    };

    let pre = parse_field("pre", &pattern_obj.pre);
    let data = parse_field("data", &pattern_obj.data);
    let mid = parse_field("mid", &pattern_obj.mid);
    let post = parse_field("post", &pattern_obj.post);
    drop(parse_field);

    if data.is_empty() && pattern_obj.data.trim().is_empty() {
        errors.push("pattern.data must not be empty".to_string());
    }

    let repeat = match &pattern_obj.repeat {
        Some(raw) => match raw.value_or_arg(&arg_names) {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(format!("pattern.repeat: {e}"));
                None
            }
        },
        None => None,
    };
    let repeat_send = match &pattern_obj.repeat_send {
        Some(raw) => match raw.value_or_arg(&arg_names) {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(format!("pattern.repeat_send: {e}"));
                None
            }
        },
        None => None,
    };

    let preset = match &def.preset {
        Some(raw) => match raw.value_or_arg(&arg_names) {
            Ok(v) => v,
            Err(e) => {
                errors.push(format!("preset: {e}"));
                ValueOrArg::literal(0)
            }
        },
        None => ValueOrArg::literal(0),
    };
    if let ValueOrArg::Literal(p) = preset {
        if p < 0 || p as usize >= timings.len().max(1) {
            errors.push(format!("preset {p} has no matching timings entry"));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CodecDef::new(
        name.to_string(),
        kind,
        def.desc,
        def.note,
        def.link,
        args,
        timings,
        preset,
        PatternDef {
            pre,
            data,
            mid,
            post,
            repeat,
            repeat_send,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolDef;

    const NEC_LIKE: &str = r#"
nec_test:
  desc: test protocol
  type: IR
  args:
    - name: address
      desc: address
      max: 0xFF
    - name: command
      desc: command
      max: 0xFF
  timings:
    frequency: 38000
    unit: 1
    header: [9000, -4500]
    one: [560, -1690]
    zero: [560, -560]
    footer: [560]
  pattern:
    pre: header
    data: "{address LSB 8}{~address LSB 8}{command LSB 8}{~command LSB 8}"
    post: footer
"#;

    #[test]
    fn loads_a_minimal_protocol() {
        let protocols = parse_catalogue("test.yaml", NEC_LIKE).unwrap();
        assert_eq!(protocols.len(), 1);
        let (name, codec) = &protocols[0];
        assert_eq!(name, "nec_test");
        let encoded = codec.encode(&[0x04, 0x08]).unwrap();
        assert!(encoded.bursts.len() > 4);
    }

    #[test]
    fn rejects_unknown_timing_reference() {
        let bad = NEC_LIKE.replace("post: footer", "post: nonexistent");
        let err = parse_catalogue("test.yaml", &bad).unwrap_err();
        assert!(matches!(err, RemoteProtoError::Catalogue(_)));
    }

    #[test]
    fn rejects_default_out_of_range() {
        let bad = NEC_LIKE.replace(
            "    - name: address\n      desc: address\n      max: 0xFF",
            "    - name: address\n      desc: address\n      max: 0xFF\n      default: 1000",
        );
        let err = parse_catalogue("test.yaml", &bad).unwrap_err();
        assert!(matches!(err, RemoteProtoError::Catalogue(_)));
    }

    #[test]
    fn shorthand_string_pattern_is_just_data() {
        let yaml = r#"
raw_bits:
  desc: bare pattern shorthand
  type: IR
  args:
    - name: value
      desc: value
      max: 0xFF
  timings:
    frequency: 0
    unit: 1
    one: [1, -1]
    zero: [1, -1]
  pattern: "{value MSB 8}"
"#;
        let protocols = parse_catalogue("test.yaml", yaml).unwrap();
        assert_eq!(protocols.len(), 1);
    }
}
