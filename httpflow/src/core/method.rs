//! HTTP method tokens.

use std::fmt;
use std::str::FromStr;

/// HTTP verb of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
    /// Any other token. [`Method::custom`] and parsing uppercase it; the
    /// variant itself keeps whatever it is given.
    Custom(String),
}

impl Method {
    /// Builds a method from an arbitrary token.
    ///
    /// The token is trimmed and uppercased, so `"purge"` becomes
    /// `Custom("PURGE")` and `"get"` becomes [`Method::Get`].
    #[must_use]
    pub fn custom(token: &str) -> Self {
        let upper = token.trim().to_ascii_uppercase();
        match upper.as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            _ => Self::Custom(upper),
        }
    }

    /// Returns the wire token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Custom(token) => token,
        }
    }

    /// Returns true for methods a `safe` retry policy may repeat.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::custom(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_and_custom() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!(
            "purge".parse::<Method>().unwrap(),
            Method::Custom("PURGE".to_string())
        );
    }

    #[test]
    fn test_custom_constructor_normalizes() {
        assert_eq!(Method::custom(" purge "), Method::Custom("PURGE".to_string()));
        assert_eq!(Method::custom("delete"), Method::Delete);
        assert_eq!(Method::custom("mkcol").as_str(), "MKCOL");
    }

    #[test]
    fn test_safe_methods() {
        assert!(Method::Get.is_safe());
        assert!(Method::Head.is_safe());
        assert!(!Method::Post.is_safe());
        assert!(!Method::Custom("PURGE".into()).is_safe());
    }
}
