//! Ordered, prefix-anchored routing with chained handlers.
//!
//! Routes are tried in registration order. A matching handler receives a
//! [`Next`] cursor; calling [`Next::run`] resumes the scan after that route,
//! which is how middleware chains are built. When the scan runs off the end
//! of the list the request is answered with 404. A handler that fails, by
//! returning `Err` or by panicking, is answered with 500 at its own step.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use regex::Regex;
use tracing::{debug, error, warn};

use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::status::StatusCode;

/// A route handler.
///
/// Returning `Err` or panicking is answered with an empty 500 by the router.
pub type Handler =
    dyn Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()> + Send + Sync;

/// Which request methods a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    All,
    Only(Method),
}

impl MethodFilter {
    pub fn admits(&self, method: Method) -> bool {
        match self {
            MethodFilter::All => true,
            MethodFilter::Only(only) => *only == method,
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        MethodFilter::Only(method)
    }
}

/// A compiled route path.
///
/// `:name` segments capture one non-empty path segment each. The pattern is
/// anchored at the start only, so `/:id` also matches `/42/extra`.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    params: Vec<String>,
}

impl RoutePattern {
    pub fn compile(path: &str) -> Self {
        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut params = Vec::new();

        let mut rest = path;
        while let Some(idx) = rest.find("/:") {
            pattern.push_str(&regex::escape(&rest[..idx]));
            let after = &rest[idx + 2..];
            let end = after.find('/').unwrap_or(after.len());
            params.push(after[..end].to_string());
            pattern.push_str("/([^/]+)");
            rest = &after[end..];
        }
        pattern.push_str(&regex::escape(rest));

        let regex = Regex::new(&pattern).expect("escaped route pattern should be valid");
        Self {
            source: path.to_string(),
            regex,
            params,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// Matches `path` and returns the captured parameters by name.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        let mut params = HashMap::with_capacity(self.params.len());
        for (i, name) in self.params.iter().enumerate() {
            if let Some(val) = captures.get(i + 1) {
                params.insert(name.clone(), val.as_str().to_string());
            }
        }
        Some(params)
    }
}

struct Route {
    method: MethodFilter,
    pattern: RoutePattern,
    handler: Box<Handler>,
}

/// The ordered handler list shared by every connection.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| (r.method, r.pattern.as_str())))
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Routes are never reordered or removed.
    pub fn route<F>(&mut self, path: &str, method: impl Into<MethodFilter>, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.routes.push(Route {
            method: method.into(),
            pattern: RoutePattern::compile(path),
            handler: Box::new(handler),
        });
        self
    }

    /// Registers a handler for every method.
    pub fn use_all<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.route(path, MethodFilter::All, handler)
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.route(path, Method::GET, handler)
    }

    pub fn head<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.route(path, Method::HEAD, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.route(path, Method::POST, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.route(path, Method::PUT, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response<'_>, &mut Next<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.route(path, Method::DELETE, handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the handler chain for one request, starting at the first route.
    pub fn dispatch(&self, req: &mut Request, res: &mut Response<'_>) {
        let mut next = Next {
            router: self,
            cursor: 0,
        };
        next.run(req, res);
    }

    fn resume(&self, next: &mut Next<'_>, req: &mut Request, res: &mut Response<'_>) {
        while let Some(route) = self.routes.get(next.cursor) {
            next.cursor += 1;

            if !route.method.admits(req.method) {
                continue;
            }
            let Some(params) = route.pattern.captures(&req.path) else {
                continue;
            };

            debug!(
                method = %req.method,
                path = %req.path,
                route = route.pattern.as_str(),
                "Route matched"
            );
            req.params = params;

            let outcome = catch_unwind(AssertUnwindSafe(|| (route.handler)(req, res, next)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        error = %e,
                        method = %req.method,
                        path = %req.path,
                        "Handler failed"
                    );
                    res.status(StatusCode::InternalServerError.as_u16()).end();
                }
                Err(panic) => {
                    error!(
                        panic_message = %panic_message(panic.as_ref()),
                        method = %req.method,
                        path = %req.path,
                        "Handler panicked"
                    );
                    res.status(StatusCode::InternalServerError.as_u16()).end();
                }
            }
            return;
        }

        debug!(method = %req.method, path = %req.path, "No route matched");
        res.status(StatusCode::NotFound.as_u16()).end();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

/// Cursor into the router's handler list for one in-flight request.
#[derive(Debug)]
pub struct Next<'r> {
    router: &'r Router,
    cursor: usize,
}

impl Next<'_> {
    /// Continues with the next route that matches after the current one.
    pub fn run(&mut self, req: &mut Request, res: &mut Response<'_>) {
        let router = self.router;
        router.resume(self, req, res);
    }

    /// Index of the next route to be tried.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
