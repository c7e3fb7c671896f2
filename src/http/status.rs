//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Este módulo define los códigos de estado HTTP/1.1 que usa el servidor.
//! Los códigos se agrupan en 5 categorías:
//!
//! - **1xx**: Informacional (no se generan)
//! - **2xx**: Éxito (200, 201, 204)
//! - **3xx**: Redirección (no implementadas)
//! - **4xx**: Error del cliente (400, 401, 403, 404, 405)
//! - **5xx**: Error del servidor (500, 501, 503)
//!
//! Cualquier otro código se representa con [`StatusCode::Other`] y su
//! reason phrase es `"Unknown"`.

/// Códigos de estado HTTP que soporta el servidor
///
/// La igualdad y el hash van por el número, así que `Other(200)` es lo
/// mismo que `Ok`.
#[derive(Debug, Clone, Copy, Default)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    #[default]
    Ok,

    /// 201 Created - Se creó un recurso
    Created,

    /// 204 No Content - Petición exitosa sin contenido en el body
    NoContent,

    /// 400 Bad Request - Parámetros inválidos o malformados
    BadRequest,

    /// 401 Unauthorized - Falta autenticación
    Unauthorized,

    /// 403 Forbidden - Autenticado pero sin permiso
    Forbidden,

    /// 404 Not Found - Ruta o recurso no encontrado
    NotFound,

    /// 405 Method Not Allowed
    MethodNotAllowed,

    /// 500 Internal Server Error - Error interno del servidor
    InternalServerError,

    /// 501 Not Implemented
    NotImplemented,

    /// 503 Service Unavailable - Servidor sobrecargado o detenido
    ServiceUnavailable,

    /// Cualquier otro código numérico
    Other(u16),
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_httpd::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Other(418).as_u16(), 418);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::Other(code) => *code,
        }
    }

    /// Construye un código desde su valor numérico
    ///
    /// Los valores conocidos se mapean a su variante; el resto queda como
    /// `Other(code)`.
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            204 => StatusCode::NoContent,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            500 => StatusCode::InternalServerError,
            501 => StatusCode::NotImplemented,
            503 => StatusCode::ServiceUnavailable,
            other => StatusCode::Other(other),
        }
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_httpd::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// assert_eq!(StatusCode::Other(299).reason_phrase(), "Unknown");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::Other(code) => match StatusCode::from_u16(*code) {
                StatusCode::Other(_) => "Unknown",
                known => known.reason_phrase(),
            },
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// Cualquier código >= 400 es un error
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_httpd::http::StatusCode;
    /// assert!(StatusCode::BadRequest.is_error());
    /// assert!(!StatusCode::NoContent.is_error());
    /// ```
    pub fn is_error(&self) -> bool {
        self.as_u16() >= 400
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl PartialEq for StatusCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_u16() == other.as_u16()
    }
}

impl Eq for StatusCode {}

impl std::hash::Hash for StatusCode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_u16().hash(state);
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Ok.as_u16(), 200);
        assert_eq!(StatusCode::Created.as_u16(), 201);
        assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
        assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
    }

    #[test]
    fn test_from_u16_known_and_unknown() {
        for code in [200, 201, 204, 400, 401, 403, 404, 405, 500, 501, 503] {
            let status = StatusCode::from_u16(code);
            assert_eq!(status.as_u16(), code);
            assert_ne!(status.reason_phrase(), "Unknown");
        }

        assert_eq!(StatusCode::from_u16(418), StatusCode::Other(418));
        assert_eq!(StatusCode::from_u16(302).reason_phrase(), "Unknown");
    }

    #[test]
    fn test_reason_phrases() {
        assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
        assert_eq!(StatusCode::Unauthorized.reason_phrase(), "Unauthorized");
        assert_eq!(StatusCode::ServiceUnavailable.reason_phrase(), "Service Unavailable");
    }

    #[test]
    fn test_is_error_threshold() {
        assert!(!StatusCode::Other(399).is_error());
        assert!(StatusCode::Other(400).is_error());
        assert!(StatusCode::NotFound.is_error());
        assert!(StatusCode::InternalServerError.is_error());
        assert!(!StatusCode::Ok.is_error());
        assert!(!StatusCode::NoContent.is_error());
    }

    #[test]
    fn test_client_and_server_error() {
        assert!(StatusCode::Forbidden.is_client_error());
        assert!(!StatusCode::Forbidden.is_server_error());
        assert!(StatusCode::ServiceUnavailable.is_server_error());
        assert!(StatusCode::Created.is_success());
    }

    #[test]
    fn test_other_with_known_code_equals_named() {
        use std::collections::HashSet;

        assert_eq!(StatusCode::Other(200), StatusCode::Ok);
        assert_eq!(StatusCode::Other(404).reason_phrase(), "Not Found");
        assert_eq!(StatusCode::Other(503).to_string(), "503 Service Unavailable");
        assert_ne!(StatusCode::Other(418), StatusCode::Ok);

        let set: HashSet<StatusCode> = [StatusCode::Other(500), StatusCode::InternalServerError].into();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_default_is_ok() {
        assert_eq!(StatusCode::default(), StatusCode::Ok);
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
        assert_eq!(StatusCode::Other(299).to_string(), "299 Unknown");
    }
}
