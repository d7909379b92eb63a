//! English-text heuristic used to filter non-English comments.
//!
//! The upstream corpus mixes languages, and the dialogue-act model was
//! trained on English chat, so non-English comments are dropped (and counted)
//! rather than mislabelled. Full language identification is out of proportion
//! here; the heuristic looks at the alphabetic content only, so code-heavy
//! comments full of symbols still pass.

/// Returns true when the text is plausibly English.
///
/// A comment with no alphabetic characters at all (pure code, links, or
/// punctuation) is accepted. Otherwise at least half of the alphabetic
/// characters must be ASCII letters.
#[must_use]
pub fn is_probably_english(text: &str) -> bool {
    let mut alphabetic: u32 = 0;
    let mut ascii_alphabetic: u32 = 0;

    for character in text.chars() {
        if character.is_alphabetic() {
            alphabetic += 1;
            if character.is_ascii_alphabetic() {
                ascii_alphabetic += 1;
            }
        }
    }

    if alphabetic == 0 {
        return true;
    }

    f64::from(ascii_alphabetic) >= f64::from(alphabetic) * 0.5
}
