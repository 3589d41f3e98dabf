const DELIMITER: &str = ". ";
const MAX_SENTENCES: usize = 5;

/// Keep the first five ". "-separated sentences.
///
/// Text with five or fewer sentences comes back untouched.
pub fn summarize(text: &str) -> String {
    let sentences: Vec<&str> = text.split(DELIMITER).collect();
    if sentences.len() <= MAX_SENTENCES {
        return text.to_string();
    }
    sentences[..MAX_SENTENCES].join(DELIMITER)
}
