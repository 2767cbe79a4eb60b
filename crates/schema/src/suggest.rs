//! Fuzzy matching and option-list formatting for validation messages.

/// Largest edit distance at which a suggestion is still offered.
pub const MAX_SUGGESTION_DISTANCE: usize = 3;
/// Option lists longer than this are truncated when displayed.
pub const OPTION_DISPLAY_LIMIT: usize = 10;

/// Returns the option closest to `input` by Levenshtein distance.
///
/// Comparison is case-insensitive. Ties go to the first option in iteration
/// order. Nothing is returned unless the best distance is at most
/// [`MAX_SUGGESTION_DISTANCE`].
///
/// ```
/// use gearbase_schema::suggest::nearest;
/// let options = ["synth", "effect", "sampler"];
/// assert_eq!(nearest("syntj", options), Some("synth"));
/// assert_eq!(nearest("completely-different", options), None);
/// ```
pub fn nearest<'a>(input: &str, options: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let input = input.to_lowercase();
    options
        .into_iter()
        .map(|option| (option, strsim::levenshtein(&input, &option.to_lowercase())))
        .min_by_key(|(_, distance)| *distance)
        .filter(|(_, distance)| *distance <= MAX_SUGGESTION_DISTANCE)
        .map(|(option, _)| option)
}

/// Formats options as a backticked, comma-separated list.
///
/// When there are more than `limit` options only the first `limit` are shown,
/// followed by `…(n total)`.
///
/// ```
/// use gearbase_schema::suggest::truncate_options;
/// assert_eq!(truncate_options(["a", "b"], 10), "`a`, `b`");
/// assert_eq!(truncate_options(["a", "b", "c"], 2), "`a`, `b`, …(3 total)");
/// ```
pub fn truncate_options<'a>(options: impl IntoIterator<Item = &'a str>, limit: usize) -> String {
    let options: Vec<&str> = options.into_iter().collect();
    let shown = options.iter().take(limit).map(|o| format!("`{o}`")).collect::<Vec<_>>().join(", ");
    match options.len() > limit {
        true => format!("{shown}, …({} total)", options.len()),
        false => shown,
    }
}
