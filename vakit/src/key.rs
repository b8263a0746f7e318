use crate::domain::LookupRequest;
use std::fmt;

/// Canonical cache key for a lookup: `path?name=value&...`, with parameters sorted
/// by name then value and every path segment, name and value percent-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive<I, K, V>(path: &str, query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = query
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_string(), value.as_ref().to_string()))
            .collect();
        pairs.sort_unstable();

        let mut key = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        if !pairs.is_empty() {
            let query = pairs
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{}={}",
                        urlencoding::encode(name),
                        urlencoding::encode(value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            key.push('?');
            key.push_str(&query);
        }

        Self(key)
    }

    /// Key for a parsed lookup: its resource and the parameters it is identified by.
    /// Parameters the lookup does not read never reach the key.
    pub fn for_request(request: &LookupRequest) -> Self {
        Self::derive(request.resource(), request.params())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
