//! Replacement letter codes.
//!
//! Some templates were consolidated into a single newer template. A rule that
//! still offers any of the superseded codes offers the replacement instead.

/// Replacement code → the codes it supersedes.
pub const LETTER_CODE_ALIASES: &[(&str, &[&str])] = &[
    ("BI01S47", &["BI01S48", "BI01S49"]),
    ("BI01V01", &["BI01V02", "BI01V03"]),
    ("BI01H01", &["BI01H02", "BI01H03", "BI01H04"]),
];

/// Replace superseded letter codes with their replacement.
///
/// The replacement takes the position of the first superseded code found,
/// unless it is already present. Applying this twice is the same as once,
/// provided no replacement code is itself superseded.
pub fn collapse_aliases(codes: &mut Vec<String>) {
    collapse_with(LETTER_CODE_ALIASES, codes);
}

pub fn collapse_with(aliases: &[(&str, &[&str])], codes: &mut Vec<String>) {
    for (replacement, superseded) in aliases {
        let Some(first) = codes
            .iter()
            .position(|c| superseded.contains(&c.as_str()))
        else {
            continue;
        };
        codes.retain(|c| !superseded.contains(&c.as_str()));
        if !codes.iter().any(|c| c == replacement) {
            codes.insert(first.min(codes.len()), replacement.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn superseded_codes_collapse_to_replacement() {
        let mut c = codes(&["BI01S02", "BI01S48", "BI01S49"]);
        collapse_aliases(&mut c);
        assert_eq!(c, codes(&["BI01S02", "BI01S47"]));
    }

    #[test]
    fn single_superseded_code_is_enough() {
        let mut c = codes(&["BI01S49", "BI01S02"]);
        collapse_aliases(&mut c);
        assert_eq!(c, codes(&["BI01S47", "BI01S02"]));
    }

    #[test]
    fn replacement_already_present_is_not_duplicated() {
        let mut c = codes(&["BI01S47", "BI01S48"]);
        collapse_aliases(&mut c);
        assert_eq!(c, codes(&["BI01S47"]));
    }

    #[test]
    fn unrelated_codes_are_untouched() {
        let mut c = codes(&["BI01G50", "BI01G02"]);
        collapse_aliases(&mut c);
        assert_eq!(c, codes(&["BI01G50", "BI01G02"]));
    }

    #[test]
    fn collapse_is_idempotent() {
        let inputs = [
            codes(&["BI01S48", "BI01S49", "BI01V03", "BI01H04", "BI01G02"]),
            codes(&["BI01H02", "BI01H01", "BI01V02"]),
            codes(&["BI01S47"]),
            codes(&[]),
        ];
        for input in inputs {
            let mut once = input.clone();
            collapse_aliases(&mut once);
            let mut twice = once.clone();
            collapse_aliases(&mut twice);
            assert_eq!(once, twice, "input {input:?}");
        }
    }

    #[test]
    fn replacement_codes_are_not_superseded() {
        for (replacement, _) in LETTER_CODE_ALIASES {
            assert!(
                !LETTER_CODE_ALIASES
                    .iter()
                    .any(|(_, superseded)| superseded.contains(replacement)),
                "{replacement} is both a replacement and superseded"
            );
        }
    }
}
