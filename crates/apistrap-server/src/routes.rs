//! Route table used to group metrics by path template.
//!
//! Without grouping, every distinct id in `/users/:id` would become its own
//! series. The table is built once by the app builder and shared read-only;
//! resolution is a linear scan in registration order, which is fine for
//! tens to low hundreds of routes.

use axum::http::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    /// Matches one or more remaining segments; only valid last.
    CatchAll,
}

/// One compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    method: Option<Method>,
    template: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile `template`. Parameters may be written `:id` or `{id}`,
    /// wildcards `*rest` or `{*rest}`. `method = None` matches any method.
    pub fn new(method: Option<Method>, template: &str) -> Self {
        let segments = template
            .split('/')
            .skip(1)
            .map(|seg| {
                if seg.starts_with('*') || seg.starts_with("{*") {
                    Segment::CatchAll
                } else if seg.starts_with(':') || (seg.starts_with('{') && seg.ends_with('}')) {
                    Segment::Param
                } else {
                    Segment::Literal(seg.to_owned())
                }
            })
            .collect();
        Self {
            method,
            template: template.to_owned(),
            segments,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Full match of method and path.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        if let Some(m) = &self.method {
            if m != method {
                return false;
            }
        }
        if !path.starts_with('/') {
            return false;
        }
        let mut parts = path.split('/').skip(1);
        for seg in &self.segments {
            match seg {
                Segment::CatchAll => {
                    return parts.next().is_some_and(|p| !p.is_empty());
                }
                Segment::Param => match parts.next() {
                    Some(p) if !p.is_empty() => {}
                    _ => return false,
                },
                Segment::Literal(lit) => match parts.next() {
                    Some(p) if p == lit => {}
                    _ => return false,
                },
            }
        }
        parts.next().is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RoutePattern>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: Option<Method>, template: &str) {
        self.routes.push(RoutePattern::new(method, template));
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutePattern> {
        self.routes.iter()
    }

    /// Template of the first route matching `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.matches(method, path))
            .map(RoutePattern::template)
    }

    /// Template for metrics: the matched pattern, else the literal path.
    pub fn template_or_path<'a>(&'a self, method: &Method, path: &'a str) -> &'a str {
        self.resolve(method, path).unwrap_or(path)
    }
}
