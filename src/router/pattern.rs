//! # Patrones de Ruta
//! src/router/pattern.rs
//!
//! Un patrón es literal (igualdad exacta de strings) o wildcard si contiene
//! `*`. Los wildcard se compilan una sola vez, al registrar la ruta, a una
//! regex anclada donde `*` es `.*` y todo lo demás se escapa.
//!
//! No hay parámetros estilo `:id`; un `:` en el patrón es un carácter más.

use regex::Regex;

#[derive(Debug, Clone)]
pub enum RoutePattern {
    Literal(String),
    Wildcard { source: String, regex: Regex },
}

impl RoutePattern {
    /// Construye el patrón para `pattern`
    ///
    /// ```
    /// use redunix_httpd::router::RoutePattern;
    ///
    /// let p = RoutePattern::new("/api/*");
    /// assert!(p.matches("/api/users"));
    /// assert!(!p.matches("/other"));
    /// ```
    pub fn new(pattern: &str) -> Self {
        if !pattern.contains('*') {
            return RoutePattern::Literal(pattern.to_string());
        }

        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        match Regex::new(&format!("^{}$", body)) {
            Ok(regex) => RoutePattern::Wildcard {
                source: pattern.to_string(),
                regex,
            },
            Err(e) => {
                tracing::warn!(pattern, error = %e, "wildcard pattern rejected, matching literally");
                RoutePattern::Literal(pattern.to_string())
            }
        }
    }

    /// El path completo debe coincidir con el patrón
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::Literal(literal) => literal == path,
            RoutePattern::Wildcard { source, regex } => source == path || regex.is_match(path),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, RoutePattern::Wildcard { .. })
    }

    /// Texto con el que se registró el patrón
    pub fn as_str(&self) -> &str {
        match self {
            RoutePattern::Literal(literal) => literal,
            RoutePattern::Wildcard { source, .. } => source,
        }
    }
}
