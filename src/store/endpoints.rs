// -----------------------------------------------------------------------------
// ----- Endpoint normalization ------------------------------------------------

/// Normalizes a raw endpoints field into an ordered endpoint list.
///
/// Registered connections carry endpoints either as a JSON-encoded array
/// (`["a:2379","b:2379"]`) or as a comma-separated string (`"a:2379, b:2379"`).
/// Both forms yield the same sequence: entries trimmed, empties dropped,
/// order preserved. An empty result means the connection is unusable; the
/// pool turns that into `ConnectionError::NoEndpoints`.
pub fn normalize(raw: &str) -> Vec<String> {
    if let Ok(parsed) = serde_json::from_str::<Vec<String>>(raw) {
        return cleaned(parsed.iter().map(String::as_str));
    }

    cleaned(raw.split(','))
}

fn cleaned<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    parts
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
