//! # Parsing de Requests HTTP/1.x
//! src/http/request.rs
//!
//! Parser HTTP escrito a mano, tolerante: nunca falla con pánico ni con
//! error hacia el llamador. Un request mal formado se marca como inválido
//! (`is_valid() == false`) y sigue por el camino de not-found.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /path?param1=value1&param2=value2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! User-Agent: curl/8.0.0\r\n
//! \r\n
//! body opcional
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD target VERSION` (exactamente 3 tokens)
//! 2. **Headers**: Pares `Name: Value` hasta la primera línea vacía
//! 3. **Empty Line**: separa headers del body
//! 4. **Body**: todo lo demás, sin el último `\n`
//!
//! Las líneas se separan por `\n` y se les quita un `\r` final, así que
//! también se aceptan requests con finales de línea `\n` a secas.

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

/// Métodos HTTP reconocidos
///
/// Cualquier otro token se parsea igual y queda como `UNKNOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
    #[default]
    UNKNOWN,
}

impl Method {
    /// Parsea un método HTTP (sin distinguir mayúsculas)
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_httpd::http::Method;
    ///
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("patch"), Method::PATCH);
    /// assert_eq!(Method::parse("BREW"), Method::UNKNOWN);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            _ => Method::UNKNOWN,
        }
    }

    /// Convierte el método a string (inversa de [`Method::parse`])
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::UNKNOWN => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Motivo por el que un request quedó marcado como inválido
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Buffer vacío
    #[error("Empty request")]
    EmptyRequest,

    /// La request line no tiene exactamente 3 tokens
    #[error("Invalid request line: {0:?}")]
    InvalidRequestLine(String),

    /// La versión no empieza con `HTTP/`
    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),
}

/// Request HTTP parseado
///
/// Inmutable una vez que entra al router: los handlers y middleware lo
/// reciben como `&Request`.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// Path decodificado, sin query string (ej: "/path with spaces")
    path: String,

    /// Versión tal como llegó (ej: "HTTP/1.1")
    version: String,

    /// Headers; el último valor gana y el nombre conserva sus mayúsculas
    headers: HashMap<String, String>,

    /// Query parameters decodificados (ej: {"page": "1"})
    query_params: HashMap<String, String>,

    /// Body crudo
    body: Vec<u8>,

    /// Falso a menos que hubiera una request line bien formada
    valid: bool,
}

impl Request {
    /// Parsea un request desde bytes
    ///
    /// Nunca falla: si la request line es inválida retorna un request con
    /// `is_valid() == false`. Usa [`Request::try_parse`] para conocer el
    /// motivo.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use redunix_httpd::http::Request;
    ///
    /// let raw = b"GET /search?q=test&page=1 HTTP/1.1\r\nHost: localhost\r\n\r\n";
    /// let request = Request::parse(raw);
    ///
    /// assert!(request.is_valid());
    /// assert_eq!(request.path(), "/search");
    /// assert_eq!(request.query_param("q"), Some("test"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Self {
        match Self::try_parse(buffer) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "request marked invalid");
                Self::invalid()
            }
        }
    }

    /// Request vacío marcado como inválido
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Parsea un request, reportando por qué no es válido
    pub fn try_parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        // 1. Request line
        let (first_line, mut pos) = next_line(buffer, 0).ok_or(ParseError::EmptyRequest)?;
        let (method, target, version) = Self::parse_request_line(&String::from_utf8_lossy(first_line))?;

        let (path, query_params) = Self::parse_target(&target);

        // 2. Headers hasta la primera línea vacía
        let mut headers = HashMap::new();
        let mut body_start = buffer.len();
        while let Some((line, next)) = next_line(buffer, pos) {
            pos = next;
            if line.is_empty() {
                body_start = next;
                break;
            }
            if let Some((name, value)) = Self::parse_header_line(&String::from_utf8_lossy(line)) {
                headers.insert(name, value);
            }
        }

        // 3. Body: resto del buffer, sin un único '\n' final
        let mut body = buffer[body_start.min(buffer.len())..].to_vec();
        if body.last() == Some(&b'\n') {
            body.pop();
        }

        Ok(Request {
            method,
            path,
            version,
            headers,
            query_params,
            body,
            valid: true,
        })
    }

    /// Formato: `METHOD target HTTP/x.y`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD TARGET VERSION
        let [method, target, version] = parts.as_slice() else {
            return Err(ParseError::InvalidRequestLine(line.to_string()));
        };

        if !version.starts_with("HTTP/") {
            return Err(ParseError::InvalidHttpVersion(version.to_string()));
        }

        Ok((Method::parse(method), target.to_string(), version.to_string()))
    }

    /// Separa el target en el primer `?` y decodifica ambas partes
    ///
    /// Ejemplo: "/search?q=rust&page=2"
    /// Retorna: ("/search", {"q": "rust", "page": "2"})
    fn parse_target(target: &str) -> (String, HashMap<String, String>) {
        match target.split_once('?') {
            Some((path, query)) => (url_decode(path), parse_query_string(query)),
            None => (url_decode(target), HashMap::new()),
        }
    }

    /// `Name: Value`, ambos lados sin espacios ni tabs en los extremos.
    /// Las líneas sin `:` se descartan.
    fn parse_header_line(line: &str) -> Option<(String, String)> {
        let (name, value) = line.split_once(':')?;
        let trim = |s: &str| s.trim_matches(|c| c == ' ' || c == '\t').to_string();
        Some((trim(name), trim(value)))
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el path decodificado
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `true` solo si hubo una request line bien formada
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header por nombre exacto (distingue mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Agrega o reemplaza un header
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Obtiene todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_httpd::http::Request;
    ///
    /// let request = Request::parse(b"GET /test?num=42&flag HTTP/1.1\r\n\r\n");
    ///
    /// assert_eq!(request.query_param("num"), Some("42"));
    /// assert_eq!(request.query_param("flag"), Some(""));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body como texto (UTF-8 con reemplazo)
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// `Content-Length` declarado; 0 si falta o no es un número
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// `Content-Type` declarado, si lo hay
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}

/// Retorna la línea que empieza en `start` (sin `\n` ni `\r` final) y la
/// posición donde empieza la siguiente.
fn next_line(buffer: &[u8], start: usize) -> Option<(&[u8], usize)> {
    if start >= buffer.len() {
        return None;
    }

    let rest = &buffer[start..];
    let (mut line, next) = match rest.iter().position(|&b| b == b'\n') {
        Some(nl) => (&rest[..nl], start + nl + 1),
        None => (rest, buffer.len()),
    };
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    Some((line, next))
}

/// Parsea una query string: separa por `&` y luego en el primer `=`
///
/// Un parámetro sin `=` queda con valor vacío; los segmentos vacíos
/// (`a=1&&b=2`) se ignoran.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for param in query.split('&').filter(|p| !p.is_empty()) {
        match param.split_once('=') {
            Some((key, value)) => {
                params.insert(url_decode(key), url_decode(value));
            }
            None => {
                params.insert(url_decode(param), String::new());
            }
        }
    }

    params
}

/// Decodifica `%XX` y `+`
///
/// Un escape solo se decodifica si quedan dos caracteres y ambos son
/// hexadecimales; si no, el `%` pasa literal. `+` siempre es espacio,
/// también en el path.
///
/// ```
/// use redunix_httpd::http::request::url_decode;
///
/// assert_eq!(url_decode("John%20Doe"), "John Doe");
/// assert_eq!(url_decode("a+b"), "a b");
/// assert_eq!(url_decode("100%"), "100%");
/// assert_eq!(url_decode("%zz"), "%zz");
/// ```
pub fn url_decode(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
