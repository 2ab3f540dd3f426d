use crate::period::PeriodSpan;

pub const URL_SEP: char = '/';

/// Value used by selectors for "no selection".
pub const NONE_SENTINEL: &str = "-1";

/// `None` for empty or sentinel values.
pub fn selected_value(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty() && *value != NONE_SENTINEL)
}

/// Append path segments to a base URL, inserting a `/` only when the base lacks one.
pub fn join_url<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
    let mut url = base.to_string();
    for segment in segments {
        if !url.ends_with(URL_SEP) {
            url.push(URL_SEP);
        }
        url.push_str(segment.as_ref());
    }
    url
}

/// Replace the last `parts.len()` segments of a `/`-delimited path.
pub fn swap_last_parts<S: AsRef<str>>(path: &str, parts: &[S]) -> String {
    let mut segments: Vec<&str> = path.split(URL_SEP).collect();
    let keep = segments.len().saturating_sub(parts.len());
    segments.truncate(keep);
    segments.extend(parts.iter().map(|part| part.as_ref()));
    segments.join("/")
}

pub fn swap_last_part(path: &str, part: &str) -> String {
    swap_last_parts(path, &[part])
}

/// Deepest selected region among child then parent, else the root.
pub fn resolve_entity<'a>(child: Option<&'a str>, parent: Option<&'a str>, root: &'a str) -> &'a str {
    selected_value(child)
        .or_else(|| selected_value(parent))
        .unwrap_or(root)
}

/// `<base>/<span>_<entity>_indic<number>.png`, `None` when no period is selected.
pub fn png_map_path(
    base: &str,
    span: &PeriodSpan,
    entity_name: &str,
    indicator_number: &str,
) -> Option<String> {
    let period = span.slug()?;
    Some(join_url(
        base,
        &[format!("{period}_{entity_name}_indic{indicator_number}.png")],
    ))
}
