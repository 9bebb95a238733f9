use std::collections::HashMap;
use std::fmt;

use http::Method;

use crate::error::ConfigurationError;

/// Authorization strength required by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Never looks at the token (registration, login).
    Open,
    /// Best-effort identity; token problems mean "anonymous", never an error.
    Soft,
    /// Valid token required; anything else is rejected before the handler runs.
    Strict,
}

impl Tier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Soft => "soft",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(method, path, tier)` entry of the static classification table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    pub tier: Tier,
}

impl RouteSpec {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, tier: Tier) -> Self {
        Self {
            method,
            path: path.into(),
            tier,
        }
    }

    #[must_use]
    pub fn open(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, Tier::Open)
    }

    #[must_use]
    pub fn soft(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, Tier::Soft)
    }

    #[must_use]
    pub fn strict(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, Tier::Strict)
    }
}

/// Tier matcher for a specific HTTP method.
#[derive(Clone)]
struct TierMatcher {
    matcher: matchit::Router<Tier>,
}

impl TierMatcher {
    fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
        }
    }

    fn insert(&mut self, path: &str, tier: Tier) -> Result<(), matchit::InsertError> {
        self.matcher.insert(path, tier)
    }

    fn find(&self, path: &str) -> Option<Tier> {
        self.matcher.at(path).ok().map(|m| *m.value)
    }
}

/// Convert legacy `:param` / `*rest` path syntax to `{param}` / `{*rest}`.
///
/// Patterns already in brace syntax are returned unchanged, so both styles can be
/// mixed in one table and still collide when they describe the same route.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len() + 2);
    let mut chars = path.chars().peekable();
    let mut in_braces = false;

    while let Some(ch) = chars.next() {
        match ch {
            '{' => in_braces = true,
            '}' => in_braces = false,
            _ => {}
        }
        if !in_braces && (ch == ':' || ch == '*') {
            result.push('{');
            if ch == '*' {
                result.push('*');
            }
            while matches!(chars.peek(), Some(c) if c.is_alphanumeric() || *c == '_') {
                if let Some(c) = chars.next() {
                    result.push(c);
                }
            }
            result.push('}');
        } else {
            result.push(ch);
        }
    }

    result
}

/// Immutable route → tier mapping, built once at startup.
#[derive(Clone)]
pub struct RouteClassifier {
    matchers: HashMap<Method, TierMatcher>,
    table: HashMap<(Method, String), Tier>,
}

impl fmt::Debug for RouteClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteClassifier")
            .field("routes", &self.table.len())
            .finish_non_exhaustive()
    }
}

impl RouteClassifier {
    /// Build the classifier from the static table.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::ConflictingTier`] if a route appears under two tiers
    /// - [`ConfigurationError::DuplicateRoute`] if a route appears twice under one tier
    /// - [`ConfigurationError::InvalidPattern`] if the matcher rejects a pattern
    pub fn new(specs: impl IntoIterator<Item = RouteSpec>) -> Result<Self, ConfigurationError> {
        let mut matchers: HashMap<Method, TierMatcher> = HashMap::new();
        let mut table: HashMap<(Method, String), Tier> = HashMap::new();

        for spec in specs {
            let path = normalize_path(&spec.path);
            let key = (spec.method.clone(), path.clone());

            if let Some(&existing) = table.get(&key) {
                return Err(if existing == spec.tier {
                    ConfigurationError::DuplicateRoute {
                        method: spec.method,
                        path,
                        tier: existing,
                    }
                } else {
                    ConfigurationError::ConflictingTier {
                        method: spec.method,
                        path,
                        first: existing,
                        second: spec.tier,
                    }
                });
            }

            matchers
                .entry(spec.method.clone())
                .or_insert_with(TierMatcher::new)
                .insert(&path, spec.tier)
                .map_err(|e| ConfigurationError::InvalidPattern {
                    method: spec.method.clone(),
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            table.insert(key, spec.tier);
        }

        Ok(Self { matchers, table })
    }

    /// Tier of the route matching a concrete request path.
    ///
    /// `HEAD` falls back to the `GET` entry, matching how axum dispatches it.
    #[must_use]
    pub fn tier_for(&self, method: &Method, path: &str) -> Option<Tier> {
        let tier = self.matchers.get(method).and_then(|m| m.find(path));
        if tier.is_none() && *method == Method::HEAD {
            return self.matchers.get(&Method::GET).and_then(|m| m.find(path));
        }
        tier
    }

    /// Tier registered for an exact route pattern.
    #[must_use]
    pub fn tier_of_pattern(&self, method: &Method, pattern: &str) -> Option<Tier> {
        self.table
            .get(&(method.clone(), normalize_path(pattern)))
            .copied()
    }

    /// All registered `(method, pattern, tier)` entries.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, Tier)> {
        self.table
            .iter()
            .map(|((method, path), tier)| (method, path.as_str(), *tier))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
