/// Replace every character outside `[A-Za-z0-9]` with an underscore.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

/// Case-insensitive substring test used by the list search boxes.
#[must_use]
pub fn matches_search(haystacks: &[&str], term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    haystacks
        .iter()
        .any(|value| value.to_lowercase().contains(&needle))
}

/// Progress of a batch as a percentage, counting the item at `index` as done.
#[must_use]
pub fn progress_percent(index: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((index + 1) as f32 / total as f32) * 100.0
}

/// Substitute `{name}` placeholders in a translated template.
#[must_use]
pub fn fill_placeholders(template: &str, args: &[(String, String)]) -> String {
    let mut out = template.to_owned();
    for (name, value) in args {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
