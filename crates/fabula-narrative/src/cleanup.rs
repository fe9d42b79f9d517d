use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"</?[A-Za-z][^<>]*>").expect("valid tag regex");
    static ref MARKDOWN_HEADING: Regex =
        Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("valid heading regex");
    static ref LIST_LINE: Regex =
        Regex::new(r"(?m)^[ \t]*(?:\d{1,2}[ \t]*[.)]|[-*•])[ \t]+.*$").expect("valid list regex");
    static ref CHOICE_CLAUSE: Regex = Regex::new(
        r"(?i)\b(?:options?|choices?)(?:[ \t]+(?:[a-z]|\d{1,2}))?[ \t]*[:)][^.!?\n]*[.!?]*"
    )
    .expect("valid choice regex");
    static ref NEXT_PROMPT: Regex = Regex::new(
        r"(?i)\b(?:what (?:will|would|do|should|shall|can) you (?:do|choose)|what (?:happens|will happen|comes) next|what do you (?:want to do|decide)|which (?:path|option|choice) will you (?:take|choose)|the choice is yours|choose wisely)\b[^.!?\n]*[.!?]*"
    )
    .expect("valid prompt regex");
    static ref INLINE_SPACE: Regex = Regex::new(r"[ \t]+").expect("valid space regex");
    static ref SPACE_BEFORE_PUNCT: Regex =
        Regex::new(r"[ \t]+([.,!?;:])").expect("valid punctuation regex");
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").expect("valid newline regex");
}

/// Clean model prose for display.
///
/// Removes HTML-like tags, markdown headings, enumerated choices the model
/// was told not to write ("Option A: ...", "Choice: ...", numbered or bulleted
/// lines) and trailing reader prompts ("What will you do?"). Passes repeat
/// until the text stops changing, so `clean_narrative(clean_narrative(x)) ==
/// clean_narrative(x)`.
///
/// Every rule only deletes text or narrows whitespace, so the loop ends.
pub fn clean_narrative(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = HTML_TAG.replace_all(&text, "");
    let text = MARKDOWN_HEADING.replace_all(&text, "");
    let text = LIST_LINE.replace_all(&text, "");
    let text = CHOICE_CLAUSE.replace_all(&text, "");
    let text = NEXT_PROMPT.replace_all(&text, "");
    let text = text.replace("**", "");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let text = lines.join("\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}
