//! "Did you mean" hints for lookups that miss.

use strsim::jaro_winkler;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Jaro-Winkler score a candidate needs to be offered.
const MIN_SIMILARITY: f64 = 0.6;

/// Maximum number of candidates offered.
const MAX_SUGGESTIONS: usize = 3;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Rank entity names by similarity to `reference`, best first.
///
/// Comparison is case-insensitive so `Get_Weather` still finds `get_weather`.
pub fn find_similar<'a>(
    reference: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let needle = reference.to_lowercase();
    let mut ranked: Vec<(f64, &str)> = names
        .into_iter()
        .map(|name| (jaro_winkler(&needle, name), name))
        .filter(|(score, _)| *score >= MIN_SIMILARITY)
        .collect();

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.dedup_by(|a, b| a.1 == b.1);
    ranked.truncate(MAX_SUGGESTIONS);
    ranked.into_iter().map(|(_, name)| name.to_string()).collect()
}

/// Render candidates as a single hint line, or `None` when there are none.
pub fn format_suggestions(names: &[String]) -> Option<String> {
    match names {
        [] => None,
        [only] => Some(format!("Did you mean `{}`?", only)),
        many => {
            let quoted = many
                .iter()
                .map(|name| format!("`{}`", name))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("Did you mean one of: {}?", quoted))
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_similar_ranks_closest_first() {
        let names = ["get_weather", "get_forecast", "send_email", "weather_alerts"];

        let hits = find_similar("get_wether", names);
        assert_eq!(hits.first().map(String::as_str), Some("get_weather"));
        assert!(hits.len() <= MAX_SUGGESTIONS);

        assert!(find_similar("zzzzzz", names).is_empty());
    }

    #[test]
    fn test_find_similar_ignores_case() {
        let hits = find_similar("GET_WEATHER", ["get_weather"]);
        assert_eq!(hits, vec!["get_weather".to_string()]);
    }

    #[test]
    fn test_format_suggestions() {
        assert_eq!(format_suggestions(&[]), None);
        assert_eq!(
            format_suggestions(&["notes".to_string()]).as_deref(),
            Some("Did you mean `notes`?")
        );
        assert_eq!(
            format_suggestions(&["a".to_string(), "b".to_string()]).as_deref(),
            Some("Did you mean one of: `a`, `b`?")
        );
    }
}
