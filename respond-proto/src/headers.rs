use indexmap::IndexMap;

/// Header names always computed by the head composer.
///
/// Caller values for these names are never emitted.
pub const RESERVED_HEADERS: [&str; 5] =
    ["Connection", "Content-Length", "Date", "Keep-Alive", "Server"];

/// Error for a header value with malformed line folding.
#[derive(Debug)]
pub struct InvalidHeaderValue;

/// Error for a header name which is empty or contains forbidden bytes.
#[derive(Debug)]
pub struct InvalidHeaderName;

/// HTTP/1 headers of a response.
///
/// Names are case-sensitive keys. Emission follows insertion order.
#[derive(Clone, Debug, Default)]
pub struct Headers(IndexMap<String, String>);

impl Headers {
    /// Creates an empty collection.
    #[inline(always)]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Inserts a header after validating both name and value.
    ///
    /// If the name is already present, the value is replaced and the header
    /// keeps its original position.
    pub fn insert<K, V>(&mut self, name: K, value: V) -> Result<(), HeaderError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();

        if let Err(InvalidHeaderName) = Self::validate_name(&name) {
            return Err(HeaderError::Name(name));
        }

        if let Err(InvalidHeaderValue) = Self::validate_value(&value) {
            return Err(HeaderError::Value(name));
        }

        self.0.insert(name, value);
        Ok(())
    }

    /// Returns a reference to the value associated with the name.
    #[inline(always)]
    pub fn get<K>(&self, name: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.0.get(name.as_ref()).map(|s| s.as_str())
    }

    /// Returns the value of the first header matching `name` ignoring ASCII case.
    pub fn get_ignore_case<K>(&self, name: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name.as_ref()))
            .map(|(_, value)| value.as_str())
    }

    /// Removes a header, preserving the order of the others.
    pub fn remove<K>(&mut self, name: K) -> Option<String>
    where
        K: AsRef<str>,
    {
        self.0.shift_remove(name.as_ref())
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes every header.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Checks whether `name` is one of [`RESERVED_HEADERS`] (ignoring ASCII case).
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_HEADERS
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
    }

    /// Validates a header name.
    ///
    /// A name must be non-empty and made of visible ASCII bytes other than `:`.
    pub fn validate_name(name: &str) -> Result<(), InvalidHeaderName> {
        if name.is_empty() {
            return Err(InvalidHeaderName);
        }

        if name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
            Ok(())
        } else {
            Err(InvalidHeaderName)
        }
    }

    /// Validates the line folding of a header value.
    ///
    /// Multi-line values are accepted only when each line break is `\r\n`
    /// followed by a space or horizontal tab.
    pub fn validate_value(value: &str) -> Result<(), InvalidHeaderValue> {
        let bytes = value.as_bytes();

        for (index, &byte) in bytes.iter().enumerate() {
            match byte {
                b'\n' => {
                    if index == 0 || bytes[index - 1] != b'\r' {
                        return Err(InvalidHeaderValue);
                    }
                }
                b'\r' => {
                    if bytes.get(index + 1) != Some(&b'\n') {
                        return Err(InvalidHeaderValue);
                    }

                    if !matches!(bytes.get(index + 2), Some(b' ' | b'\t')) {
                        return Err(InvalidHeaderValue);
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Error when adding a header to a [`Headers`] collection.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum HeaderError {
    /// The header name is not a valid token.
    #[error("invalid header name '{0}'")]
    Name(String),

    /// The header value uses malformed line folding.
    #[error("invalid line folding in value of header '{0}'")]
    Value(String),
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: ToString,
    V: ToString,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
