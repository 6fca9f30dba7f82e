/// Map an Arabic-Indic (U+0660..U+0669) or extended Arabic-Indic
/// (U+06F0..U+06F9) digit to its ASCII counterpart.
fn ascii_digit(c: char) -> Option<char> {
    let offset = match c {
        '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
        '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
        '0'..='9' => return Some(c),
        _ => return None,
    };
    char::from_digit(offset, 10)
}

/// Clean a national-ID field: Arabic-Indic digits become ASCII digits and
/// every other character is dropped.
///
/// Idempotent: the output contains only `0-9`, which map to themselves.
pub fn normalize_national_id(raw: &str) -> String {
    raw.chars().filter_map(ascii_digit).collect()
}

/// Trim a name and collapse inner whitespace runs to a single space.
pub fn clean_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// National IDs are 14 digits. Only used for review hints, never to reject.
pub const NATIONAL_ID_LEN: usize = 14;

pub fn looks_like_national_id(id: &str) -> bool {
    id.len() == NATIONAL_ID_LEN && id.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arabic_indic_digits_become_ascii() {
        assert_eq!(normalize_national_id("٢٩٠١٢٠١١٢٣٤٥٦٧"), "29012011234567");
    }

    #[test]
    fn extended_arabic_indic_digits_become_ascii() {
        assert_eq!(normalize_national_id("۲۹۰۱"), "2901");
    }

    #[test]
    fn separators_and_letters_are_dropped() {
        assert_eq!(normalize_national_id("٢٩٠-١٢ ٠١/١"), "29012011");
        assert_eq!(normalize_national_id("ID: 290 120"), "290120");
        assert_eq!(normalize_national_id("لا يوجد"), "");
    }

    #[test]
    fn mixed_scripts_keep_order() {
        assert_eq!(normalize_national_id("2٩0١"), "2901");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            "٢٩٠١٢٠١١٢٣٤٥٦٧",
            "  ٣٠٠ - ٠٥ - ١٢  ",
            "abc123٤٥٦",
            "۱۲۳ ٤٥٦ 789",
            "٠١٢٣٤٥٦٧٨٩۰۱۲۳۴۵۶۷۸۹",
            "\u{200f}٢٩٠\u{200e}",
        ];
        for s in samples {
            let once = normalize_national_id(s);
            assert_eq!(normalize_national_id(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn digits_and_separators_yield_only_ascii_digits() {
        let samples = ["٠١٢٣٤٥٦٧٨٩", "٢٩٠ ١٢٠-١١/٢٣٤.٥٦٧", "٫٬٢٩،٣"];
        for s in samples {
            let out = normalize_national_id(s);
            assert!(out.bytes().all(|b| b.is_ascii_digit()), "{s:?} -> {out:?}");
        }
    }

    #[test]
    fn clean_name_trims_and_collapses() {
        assert_eq!(clean_name("  محمد   أحمد\tعلي "), "محمد أحمد علي");
        assert_eq!(clean_name("   "), "");
    }

    #[test]
    fn national_id_shape_hint() {
        assert!(looks_like_national_id("29012011234567"));
        assert!(!looks_like_national_id("2901201123456"));
        assert!(!looks_like_national_id("٢٩٠١٢٠١١٢٣٤٥٦٧"));
    }
}
