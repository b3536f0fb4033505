//! Namespaced cache keys
//!
//! Keys are prefixed by request shape so brand, model, year and detail
//! lookups never collide:
//!
//! | Request | Key |
//! |---------|-----|
//! | brands  | `marcas` |
//! | models  | `modelos:{brand}` |
//! | years   | `anos:{brand}:{model}` |
//! | detail  | `detalhes:{brand}:{model}:{year}` |

use std::fmt;

/// Key for one memoized upstream response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Brand list
    Brands,
    /// Model list for a brand
    Models {
        /// Brand code
        brand: String,
    },
    /// Year list for a model
    Years {
        /// Brand code
        brand: String,
        /// Model code
        model: String,
    },
    /// Price detail for a leaf
    Detail {
        /// Brand code
        brand: String,
        /// Model code
        model: String,
        /// Year code
        year: String,
    },
}

impl CacheKey {
    /// Model list key
    pub fn models(brand: impl Into<String>) -> Self {
        Self::Models { brand: brand.into() }
    }

    /// Year list key
    pub fn years(brand: impl Into<String>, model: impl Into<String>) -> Self {
        Self::Years {
            brand: brand.into(),
            model: model.into(),
        }
    }

    /// Detail key
    pub fn detail(
        brand: impl Into<String>,
        model: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self::Detail {
            brand: brand.into(),
            model: model.into(),
            year: year.into(),
        }
    }

    /// Namespace this key lives in
    pub fn namespace(&self) -> CacheNamespace {
        match self {
            Self::Brands => CacheNamespace::Brands,
            Self::Models { .. } => CacheNamespace::Models,
            Self::Years { .. } => CacheNamespace::Years,
            Self::Detail { .. } => CacheNamespace::Details,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brands => f.write_str(CacheNamespace::Brands.prefix()),
            Self::Models { brand } => write!(f, "{}:{brand}", CacheNamespace::Models.prefix()),
            Self::Years { brand, model } => {
                write!(f, "{}:{brand}:{model}", CacheNamespace::Years.prefix())
            }
            Self::Detail { brand, model, year } => {
                write!(f, "{}:{brand}:{model}:{year}", CacheNamespace::Details.prefix())
            }
        }
    }
}

/// Request shape a cache entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheNamespace {
    /// `marcas`
    Brands,
    /// `modelos:*`
    Models,
    /// `anos:*`
    Years,
    /// `detalhes:*`
    Details,
    /// Anything else found in a snapshot
    Unknown,
}

impl CacheNamespace {
    /// Key prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Brands => "marcas",
            Self::Models => "modelos",
            Self::Years => "anos",
            Self::Details => "detalhes",
            Self::Unknown => "",
        }
    }

    /// Classify a raw key read from disk
    pub fn of_raw(key: &str) -> Self {
        let prefix = key.split(':').next().unwrap_or_default();
        match prefix {
            "marcas" => Self::Brands,
            "modelos" => Self::Models,
            "anos" => Self::Years,
            "detalhes" => Self::Details,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            other => f.write_str(other.prefix()),
        }
    }
}
