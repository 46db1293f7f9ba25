//! Request fixtures

use http::Method;
use reinhardt_nested_core::Request;
use rstest::fixture;

/// An anonymous request
pub fn anonymous(method: Method) -> Request {
	Request::new(method)
}

/// A request from an authenticated, non-admin user
pub fn authenticated(method: Method, user: &str) -> Request {
	Request::new(method).with_user(user)
}

/// A request from an administrator
pub fn admin(method: Method) -> Request {
	Request::new(method).with_user("admin").with_admin()
}

#[fixture]
pub fn create_request() -> Request {
	authenticated(Method::POST, "alice")
}

#[fixture]
pub fn update_request() -> Request {
	authenticated(Method::PUT, "alice")
}

#[fixture]
pub fn read_request() -> Request {
	anonymous(Method::GET)
}
