//! Integration tests exercising the builtin catalogue and the registry's
//! parse/encode/decode round trip end to end.

use remoteproto::{ProtocolDef, ProtocolRegistry};

fn registry() -> ProtocolRegistry {
    ProtocolRegistry::with_builtin().expect("builtin catalogue must load cleanly")
}

#[test]
fn nec_round_trips_and_is_a_unique_match() {
    let registry = registry();
    let matches = registry.convert("nec:0x04:0x08", 0.0, Some(&["nec".to_string()])).unwrap();
    let m = matches.iter().find(|m| m.args[0] == 4 && m.args[1] == 8).expect("nec:4:8 round trip");
    assert!(m.uniquematch);
}

#[test]
fn nec_encode_header_and_footer_shape() {
    let registry = registry();
    let parsed = registry.parse_command("nec:0x04:0x08").unwrap();
    let signal = parsed.protocol.encode(&parsed.args).unwrap();

    assert_eq!(&signal.bursts[..2], &[9000, -4500]);
    assert_eq!(*signal.bursts.last().unwrap(), 560);
    // header + footer + 32 data bits * 2 bursts/bit
    assert_eq!(signal.bursts.len(), 2 + 1 + 64);
}

#[test]
fn every_burst_run_alternates_sign() {
    let registry = registry();
    for command in ["nec:0x04:0x08", "rc5:0x01:0x02", "samsung36:0x1234:0x56", "sirc:0x01:0x02"] {
        let parsed = registry.parse_command(command).unwrap();
        let signal = parsed.protocol.encode(&parsed.args).unwrap();
        let mut last_sign = 0i128;
        for &b in &signal.bursts {
            if b == 0 {
                continue;
            }
            let sign = b.signum();
            assert_ne!(sign, last_sign, "{command}: non-alternating burst in {:?}", signal.bursts);
            last_sign = sign;
        }
    }
}

#[test]
fn samsung36_toggle_conditional_pins_on_decode() {
    // Scenario: the pattern's `pre` branches on `_toggle = 1`. Encoding with
    // toggle 0 must emit the `header` branch, and decoding that signal must
    // pin `_toggle` back to 0 via the `=` predicate inversion.
    let registry = registry();
    let parsed = registry.parse_command("samsung36:0x1234:0x56").unwrap();
    let signal = parsed.protocol.encode(&parsed.args).unwrap();

    let matches = registry.decode(&signal, 0.05, Some(&["samsung36".to_string()]));
    let m = matches.iter().find(|m| m.args == vec![0x1234, 0x56]).expect("samsung36 round trip");
    assert_eq!(m.toggle_bit, 0);
}

#[test]
fn sirc_repeat_send_exceeds_decode_repeat() {
    // The catalogue sends 3 physical repeats but only requires one to decode.
    let registry = registry();
    let parsed = registry.parse_command("sirc:0x01:0x02").unwrap();
    let signal = parsed.protocol.encode(&parsed.args).unwrap();

    // header + one data frame = 1 + 12 bits, repeated 3 times.
    let single_frame_bursts = 2 + 2 * 12;
    assert_eq!(signal.bursts.len(), single_frame_bursts * 3);

    let matches = registry.decode(&signal, 0.0, Some(&["sirc".to_string()]));
    assert!(matches.iter().any(|m| m.args == vec![1, 2]));
}

#[test]
fn to_command_is_idempotent_through_parse_command() {
    let registry = registry();
    for command in ["nec:0x04:0x08", "rc5:0x1F:0x00", "sirc:0x7F"] {
        let parsed = registry.parse_command(command).unwrap();
        let rendered = parsed.protocol.to_command(&parsed.args);
        let reparsed = registry.parse_command(&rendered).unwrap();
        assert_eq!(parsed.args, reparsed.args, "{command} -> {rendered}");
    }
}

#[test]
fn tolerance_widening_never_shrinks_the_match_set() {
    let registry = registry();
    let parsed = registry.parse_command("nec:0x04:0x08").unwrap();
    let signal = parsed.protocol.encode(&parsed.args).unwrap();

    let tight: Vec<_> = registry.decode(&signal, 0.01, Some(&["nec".to_string()])).into_iter().map(|m| m.args).collect();
    let loose: Vec<_> = registry.decode(&signal, 0.3, Some(&["nec".to_string()])).into_iter().map(|m| m.args).collect();

    for args in &tight {
        assert!(loose.contains(args));
    }
}

#[test]
fn nec_preset_is_recovered_on_decode() {
    let registry = registry();
    let parsed = registry.parse_command("nec:0x04:0x08:1").unwrap();
    let signal = parsed.protocol.encode(&parsed.args).unwrap();

    let matches = registry.decode(&signal, 0.0, Some(&["nec".to_string()]));
    assert!(matches.iter().any(|m| m.args == vec![4, 8, 1]));
}

#[test]
fn unknown_protocol_name_is_rejected() {
    let registry = registry();
    assert!(registry.parse_command("nonexistent:1:2").is_err());
}

#[test]
fn out_of_range_argument_is_rejected() {
    let registry = registry();
    assert!(registry.parse_command("nec:0x100").is_err());
}
