// Lowering of key-sequence expressions into the canonical event stream.

use rekey_core::{format_sequence, parse_key_sequence, KeyState};

fn lower(text: &str, is_input: bool) -> String {
    format_sequence(&parse_key_sequence(text, is_input).unwrap())
}

#[test]
fn test_input_lowering_table() {
    let cases = [
        ("A", "+A ~A"),
        ("A B", "+A ~A +B ~B"),
        ("(A B)", "*A *B +A +B ~A ~B"),
        ("A{B}", "+A +B ~B ~A"),
        ("A{B C}", "+A +B ~B +C ~C ~A"),
        ("A(B C)", "+A ~A *B *C +B +C ~B ~C"),
        ("A{(B C)}", "+A *B *C +B +C ~B ~C ~A"),
        ("(A B){C D}", "*A *B +A +B +C ~C +D ~D ~A ~B"),
        ("!A E", "!A +E ~E"),
    ];
    for (text, expected) in cases {
        assert_eq!(lower(text, true), expected, "input lowering of {:?}", text);
    }
}

#[test]
fn test_output_lowering_table() {
    let cases = [
        ("A", "+A -A"),
        ("A B", "+A -A +B -B"),
        ("(A B)", "+A +B -A -B"),
        ("A{B}", "+A +B -B -A"),
        ("A{B C}", "+A +B -B +C -C -A"),
        ("A(B C)", "+A -A +B +C -B -C"),
        ("A{(B C)}", "+A +B +C -C -B -A"),
        ("(A B){C D}", "+A +B +C -C +D -D -A -B"),
    ];
    for (text, expected) in cases {
        assert_eq!(lower(text, false), expected, "output lowering of {:?}", text);
    }
}

#[test]
fn test_lowering_is_total_over_valid_expressions() {
    let expressions = [
        "A",
        "Escape F10 NumpadEnter",
        "(ShiftLeft A)",
        "ControlLeft{Z}",
        "Meta{(ArrowLeft ArrowRight)}",
        "!ControlLeft !ShiftLeft Q",
        "A{B{C{D}}}",
        "(A B) (C D) E",
        "IntlBackslash{1 2 3}",
    ];
    for text in expressions {
        for is_input in [true, false] {
            let sequence = parse_key_sequence(text, is_input).unwrap();
            assert!(!sequence.is_empty(), "{:?} lowered to nothing", text);
        }
    }
}

#[test]
fn test_redundant_whitespace_is_canonicalized() {
    let pairs = [
        ("A  B", "A B"),
        ("  A   {  B  }  ", "A{B}"),
        ("( A B )", "(A B)"),
        ("(A\n B)", "(A B)"),
        ("A { B\nC }", "A{B C}"),
    ];
    for (noisy, canonical) in pairs {
        for is_input in [true, false] {
            assert_eq!(
                lower(noisy, is_input),
                lower(canonical, is_input),
                "whitespace variant {:?}",
                noisy
            );
        }
    }
}

#[test]
fn test_parser_never_emits_down_matched() {
    let expressions = ["A", "A B", "(A B)", "A{B C}", "(A B){C D}", "!A E", "A{(B C)}"];
    for text in expressions {
        for is_input in [true, false] {
            let sequence = parse_key_sequence(text, is_input).unwrap();
            assert!(
                sequence.iter().all(|e| e.state != KeyState::DownMatched),
                "DownMatched leaked from {:?}",
                text
            );
        }
    }
}

#[test]
fn test_invalid_expressions_are_rejected() {
    let expressions = [
        "Unknown",
        "(A",
        "A)",
        "{A",
        "A}",
        "A{B",
        "((A))",
        "A | B",
        "A >> B",
        "!",
        "$",
    ];
    for text in expressions {
        assert!(
            parse_key_sequence(text, true).is_err(),
            "{:?} should not lower",
            text
        );
    }
}
