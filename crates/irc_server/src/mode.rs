//! MODE grammar (§4.11): grouped mode characters with per-class argument
//! arity, grounded on the reference ircd's `parse_mode`/`usermodes`/
//! `chanmodes` tuples.
//!
//! - `a` — list modes, parameter required on add and remove.
//! - `b` — parameter required on add and remove.
//! - `c` — parameter required on add only.
//! - `d` — never takes a parameter.

pub struct ModeClasses {
    pub a: &'static str,
    pub b: &'static str,
    pub c: &'static str,
    pub d: &'static str,
}

pub const USER_MODES: ModeClasses = ModeClasses {
    a: "",
    b: "",
    c: "",
    d: "iw",
};

pub const CHANNEL_MODES: ModeClasses = ModeClasses {
    a: "be",
    b: "o",
    c: "flj",
    d: "istmn",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub flag: char,
    pub arg: Option<String>,
}

/// Parses `flags` (e.g. `"+o-v"`) against `params`, consuming one
/// parameter per flag that needs it. A leading `+`/`-` toggles sign; the
/// initial sign is `+`. Returns `(additions, removals)` on success.
pub fn parse_mode(
    flags: &str,
    params: &[&str],
    classes: &ModeClasses,
) -> Result<(Vec<ModeChange>, Vec<ModeChange>), String> {
    let mut additions = Vec::new();
    let mut removals = Vec::new();
    let mut args = params.iter();
    let mut sign = '+';

    for c in flags.chars() {
        match c {
            '+' => sign = '+',
            '-' => sign = '-',
            c if classes.a.contains(c) || classes.b.contains(c) => {
                let arg = args.next().ok_or_else(|| {
                    format!(
                        "Not enough arguments to {} mode {c}",
                        if sign == '+' { "add" } else { "remove" }
                    )
                })?;
                push(&mut additions, &mut removals, sign, c, Some(arg.to_string()));
            }
            c if classes.c.contains(c) => {
                if sign == '+' {
                    let arg = args.next().ok_or_else(|| {
                        format!("Not enough arguments to add mode {c}")
                    })?;
                    additions.push(ModeChange {
                        flag: c,
                        arg: Some(arg.to_string()),
                    });
                } else {
                    removals.push(ModeChange { flag: c, arg: None });
                }
            }
            c if classes.d.contains(c) => {
                push(&mut additions, &mut removals, sign, c, None);
            }
            c => return Err(format!("{c} is unknown mode")),
        }
    }

    Ok((additions, removals))
}

fn push(
    additions: &mut Vec<ModeChange>,
    removals: &mut Vec<ModeChange>,
    sign: char,
    flag: char,
    arg: Option<String>,
) {
    let change = ModeChange { flag, arg };
    if sign == '+' {
        additions.push(change);
    } else {
        removals.push(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_mode_add_no_argument() {
        let (add, remove) = parse_mode("+i", &[], &USER_MODES).unwrap();
        assert_eq!(
            add,
            vec![ModeChange {
                flag: 'i',
                arg: None
            }]
        );
        assert!(remove.is_empty());
    }

    #[test]
    fn channel_mode_b_class_requires_argument_both_ways() {
        let (add, _) = parse_mode("+o", &["nick"], &CHANNEL_MODES).unwrap();
        assert_eq!(
            add,
            vec![ModeChange {
                flag: 'o',
                arg: Some("nick".to_string())
            }]
        );

        let err = parse_mode("+o", &[], &CHANNEL_MODES).unwrap_err();
        assert!(err.contains("Not enough arguments"));
    }

    #[test]
    fn c_class_only_requires_argument_on_add() {
        let (add, _) = parse_mode("+l", &["10"], &CHANNEL_MODES).unwrap();
        assert_eq!(
            add,
            vec![ModeChange {
                flag: 'l',
                arg: Some("10".to_string())
            }]
        );
        let (_, remove) = parse_mode("-l", &[], &CHANNEL_MODES).unwrap();
        assert_eq!(
            remove,
            vec![ModeChange {
                flag: 'l',
                arg: None
            }]
        );
    }

    #[test]
    fn unknown_flag_fails() {
        let err = parse_mode("+q", &[], &USER_MODES).unwrap_err();
        assert_eq!(err, "q is unknown mode");
    }

    #[test]
    fn sign_toggles_mid_string() {
        let (add, remove) = parse_mode("+i-w", &[], &USER_MODES).unwrap();
        assert_eq!(add, vec![ModeChange { flag: 'i', arg: None }]);
        assert_eq!(remove, vec![ModeChange { flag: 'w', arg: None }]);
    }
}
