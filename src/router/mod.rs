//! # Sistema de Routing
//! src/router/mod.rs
//!
//! El router decide qué código atiende cada request.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Middleware* → Static mounts → Rutas → Not found
//!                 │               │           │
//!                 └───────────────┴───────────┴──→ Error handler
//! ```
//!
//! - Los middleware corren en orden de registro; el primero que retorna
//!   [`Flow::Stop`] corta el pipeline y la respuesta se envía tal cual.
//! - Los mounts estáticos se revisan antes que las rutas (primer prefijo
//!   que coincide, en orden de registro).
//! - Una ruta coincide si su método es el del request **o** si la ruta es
//!   `OPTIONS` (las rutas OPTIONS aceptan cualquier método), y si el path
//!   coincide con el patrón.
//! - Cualquier error o pánico se atrapa acá una sola vez y va al error
//!   handler; nunca llega a la capa de conexión.
//!
//! Todo se registra antes de arrancar el servidor. Después el router vive
//! dentro de un `Arc` y solo se lee, así que no necesita locks.

pub mod pattern;
pub mod static_files;

pub use pattern::RoutePattern;
pub use static_files::StaticMount;

use crate::error::{HandlerError, HandlerResult};
use crate::http::{Method, Request, Response, StatusCode};
use crate::workers::pool::panic_message;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

/// Capacidad que transforma un request en mutaciones de la respuesta
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Request, response: &mut Response) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, request: &Request, response: &mut Response) -> HandlerResult {
        self(request, response)
    }
}

/// Decisión de un middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub trait Middleware: Send + Sync + 'static {
    fn call(&self, request: &Request, response: &mut Response) -> HandlerResult<Flow>;
}

impl<F> Middleware for F
where
    F: Fn(&Request, &mut Response) -> HandlerResult<Flow> + Send + Sync + 'static,
{
    fn call(&self, request: &Request, response: &mut Response) -> HandlerResult<Flow> {
        self(request, response)
    }
}

/// Recibe cualquier falla del pipeline y arma la respuesta de error
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle_error(&self, error: &HandlerError, request: &Request, response: &mut Response);
}

impl<F> ErrorHandler for F
where
    F: Fn(&HandlerError, &Request, &mut Response) + Send + Sync + 'static,
{
    fn handle_error(&self, error: &HandlerError, request: &Request, response: &mut Response) {
        self(error, request, response)
    }
}

/// Una entrada de la tabla de rutas
pub struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: Box<dyn Handler>,
}

impl Route {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn is_wildcard(&self) -> bool {
        self.pattern.is_wildcard()
    }

    fn accepts(&self, request: &Request) -> bool {
        (self.method == request.method() || self.method == Method::OPTIONS)
            && self.pattern.matches(request.path())
    }
}

/// Router con middleware, mounts estáticos y tabla de rutas
pub struct Router {
    middleware: Vec<Box<dyn Middleware>>,
    static_mounts: Vec<StaticMount>,
    routes: Vec<Route>,
    not_found: Box<dyn Handler>,
    on_error: Box<dyn ErrorHandler>,
}

impl Router {
    /// Crea un router vacío con los handlers por defecto
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
            static_mounts: Vec::new(),
            routes: Vec::new(),
            not_found: Box::new(default_not_found),
            on_error: Box::new(default_error_handler),
        }
    }

    // === Registro ===

    /// Registra una ruta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use redunix_httpd::router::Router;
    /// use redunix_httpd::http::{Method, Request, Response};
    ///
    /// let mut router = Router::new();
    /// router.route(Method::GET, "/hello", |_req: &Request, res: &mut Response| {
    ///     res.set_json_content(r#"{"message": "Hello"}"#);
    ///     Ok(())
    /// });
    ///
    /// let mut res = Response::default();
    /// router.dispatch(&Request::parse(b"GET /hello HTTP/1.1\r\n\r\n"), &mut res);
    /// assert_eq!(res.body(), br#"{"message": "Hello"}"#);
    /// ```
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: RoutePattern::new(pattern),
            handler: Box::new(handler),
        });
        self
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn head<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::HEAD, pattern, handler)
    }

    /// Las rutas OPTIONS coinciden con cualquier método
    pub fn options<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::OPTIONS, pattern, handler)
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Agrega un middleware al final de la cadena
    pub fn use_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Fn(&Request, &mut Response) -> HandlerResult<Flow> + Send + Sync + 'static,
    {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Sirve los archivos de `dir` bajo el prefijo `prefix`
    pub fn serve_static(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> &mut Self {
        self.static_mounts.push(StaticMount::new(prefix, dir));
        self
    }

    pub fn set_not_found_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.not_found = Box::new(handler);
        self
    }

    pub fn set_error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&HandlerError, &Request, &mut Response) + Send + Sync + 'static,
    {
        self.on_error = Box::new(handler);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn static_mounts(&self) -> &[StaticMount] {
        &self.static_mounts
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    // === Dispatch ===

    /// Atiende `request` escribiendo el resultado en `response`
    ///
    /// Nunca falla: errores y pánicos terminan en el error handler.
    pub fn dispatch(&self, request: &Request, response: &mut Response) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(request, response)));

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => HandlerError::Panicked(panic_message(payload.as_ref())),
        };

        let handled = panic::catch_unwind(AssertUnwindSafe(|| {
            self.on_error.handle_error(&error, request, response)
        }));

        if handled.is_err() {
            tracing::error!(path = request.path(), %error, "error handler panicked");
            default_error_handler(&error, request, response);
        }
    }

    fn run(&self, request: &Request, response: &mut Response) -> HandlerResult {
        // Un request inválido nunca llega a las rutas
        if !request.is_valid() {
            return self.not_found.handle(request, response);
        }

        for middleware in &self.middleware {
            if middleware.call(request, response)? == Flow::Stop {
                return Ok(());
            }
        }

        let path = request.path();

        if let Some(mount) = self.static_mounts.iter().find(|m| m.matches(path)) {
            mount.serve(path, response);
            return Ok(());
        }

        match self.routes.iter().find(|route| route.accepts(request)) {
            Some(route) => route.handler.handle(request, response),
            None => self.not_found.handle(request, response),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn default_not_found(request: &Request, response: &mut Response) -> HandlerResult {
    response.set_status(StatusCode::NotFound);
    response.set_text_content(&format!("404 Not Found: {}", request.path()));
    Ok(())
}

fn default_error_handler(error: &HandlerError, request: &Request, response: &mut Response) {
    tracing::error!(path = request.path(), %error, "error processing request");
    response.set_status(StatusCode::InternalServerError);
    response.set_text_content("Internal Server Error");
}
