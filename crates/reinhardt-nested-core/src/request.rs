//! Request context passed explicitly through the engine

use http::Method;
use serde_json::{Map, Value};

/// The parts of an inbound request the engine and its permissions look at
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::request::Request;
/// use http::Method;
///
/// let request = Request::new(Method::POST).with_user("alice");
/// assert!(request.is_authenticated);
/// assert!(!request.is_safe_method());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
	pub method: Method,
	pub user: Option<String>,
	pub is_authenticated: bool,
	pub is_admin: bool,
	pub extras: Map<String, Value>,
}

impl Request {
	/// Create an anonymous request
	pub fn new(method: Method) -> Self {
		Self {
			method,
			user: None,
			is_authenticated: false,
			is_admin: false,
			extras: Map::new(),
		}
	}

	/// Attach an authenticated user
	pub fn with_user(mut self, user: impl Into<String>) -> Self {
		self.user = Some(user.into());
		self.is_authenticated = true;
		self
	}

	/// Mark the user as an administrator
	pub fn with_admin(mut self) -> Self {
		self.is_admin = true;
		self
	}

	pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
		self.extras.insert(key.into(), value);
		self
	}

	pub fn extra(&self, key: &str) -> Option<&Value> {
		self.extras.get(key)
	}

	/// GET, HEAD and OPTIONS
	pub fn is_safe_method(&self) -> bool {
		matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
	}
}

impl Default for Request {
	fn default() -> Self {
		Self::new(Method::GET)
	}
}
