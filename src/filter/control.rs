use std::sync::LazyLock;

use regex::Regex;

/// CSI sequence: ESC `[`, parameter bytes, intermediate bytes, one final byte
static CONTROL_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").expect("CSI pattern is valid")
});

/// Remove terminal control sequences (colors, cursor movement) from text
///
/// Removal repeats until no sequence is left, because cutting one sequence
/// out can join the text around it into a new one. The result is therefore
/// idempotent.
pub fn strip_control_sequences(text: &str) -> String {
    let mut current = text.to_string();
    while CONTROL_SEQUENCE.is_match(&current) {
        current = CONTROL_SEQUENCE.replace_all(&current, "").into_owned();
    }
    current
}
