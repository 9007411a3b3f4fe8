//! Request parameters.
//!
//! Parameters are string key/value pairs kept in key order so requests are
//! reproducible in logs and tests.

use std::collections::BTreeMap;

/// Query or form parameters for one request
pub type Params = BTreeMap<String, String>;

/// Overlay `overrides` onto `defaults`; keys in `overrides` win
pub fn merge(mut defaults: Params, overrides: &Params) -> Params {
    for (key, value) in overrides {
        defaults.insert(key.clone(), value.clone());
    }
    defaults
}

/// Build parameters from `(key, value)` pairs
pub fn params<K, V, I>(pairs: I) -> Params
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_win() {
        let defaults = params([("count", "20"), ("cursor", "-1")]);
        let overrides = params([("cursor", "1234")]);

        let merged = merge(defaults, &overrides);
        assert_eq!(merged.get("count").map(String::as_str), Some("20"));
        assert_eq!(merged.get("cursor").map(String::as_str), Some("1234"));
    }

    #[test]
    fn test_merge_into_empty() {
        let merged = merge(Params::new(), &params([("q", "rust")]));
        assert_eq!(merged.len(), 1);
    }
}
