use regex::Regex;

/// Repair machine-generated chart text before parsing.
///
/// Upstream chart generators emit almost-valid `.chart` files with a known
/// set of defects: stray comments, doubled braces, sections joined on one
/// line, bare `B <bpm>` values instead of `tick = B <us-per-beat>`, and
/// events written as `E tick "name"`. Each fix is a plain text rewrite so a
/// bad input degrades to skipped lines in the parser instead of a hard error.
pub fn normalize_chart_text(input: &str) -> String {
    let mut text = input.to_string();

    // Strip // and # comments
    let line_comment = Regex::new(r"(?m)//[^\n]*").expect("valid regex");
    text = line_comment.replace_all(&text, "").into_owned();
    let hash_comment = Regex::new(r"(?m)^\s*#[^\n]*").expect("valid regex");
    text = hash_comment.replace_all(&text, "").into_owned();

    // Collapse doubled braces
    let open = Regex::new(r"\{\s*\{").expect("valid regex");
    text = open.replace_all(&text, "{").into_owned();
    let close = Regex::new(r"\}\s*\}").expect("valid regex");
    text = close.replace_all(&text, "}").into_owned();

    // Split sections joined on one line
    let joined = Regex::new(r"\}\s*\[").expect("valid regex");
    text = joined.replace_all(&text, "}\n[").into_owned();

    // Bare BPM value -> microseconds-per-beat entry at tick 0
    let bare_bpm = Regex::new(r"(?m)^\s*B\s+([0-9.]+)\s*$").expect("valid regex");
    text = bare_bpm
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            let bpm: f64 = caps[1].parse().unwrap_or(120.0);
            let us = (60_000_000.0 / bpm).round() as u64;
            format!("0 = B {us}")
        })
        .into_owned();

    // `E tick "name"` -> `tick = E "name"`
    let event = Regex::new(r#"E\s+(\d+)\s+"([^"]+)""#).expect("valid regex");
    text = event.replace_all(&text, r#"$1 = E "$2""#).into_owned();

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments() {
        let out = normalize_chart_text("768 = N 2 0 // continue pattern\n# fill\n960 = N 1 0");
        assert!(!out.contains("//"));
        assert!(!out.contains("fill"));
        assert!(out.contains("768 = N 2 0"));
        assert!(out.contains("960 = N 1 0"));
    }

    #[test]
    fn rewrites_bare_bpm_as_us_per_beat() {
        let out = normalize_chart_text("[SyncTrack]\n{\nB 120\n}");
        assert!(out.contains("0 = B 500000"));
    }

    #[test]
    fn rewrites_event_shorthand() {
        let out = normalize_chart_text("E 768 \"verse\"");
        assert_eq!(out.trim(), "768 = E \"verse\"");
    }

    #[test]
    fn splits_joined_sections_and_doubled_braces() {
        let out = normalize_chart_text("[Song]\n{{\nName = X\n}}[SyncTrack]\n{\n}");
        assert!(out.contains("}\n[SyncTrack]"));
        assert!(!out.contains("{{"));
    }
}
