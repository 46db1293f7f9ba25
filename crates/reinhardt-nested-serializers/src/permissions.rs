//! Permission bridge
//!
//! Selects the permission list for a request (a per-method override, else
//! the default list) and evaluates it before any create or update.

use async_trait::async_trait;
use http::Method;
use reinhardt_nested_core::{Request, SerializerError, SerializerResult};
use std::collections::HashMap;
use std::sync::Arc;

/// What a permission is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct PermissionContext<'a> {
	pub request: &'a Request,
	/// Name of the serializer performing the write
	pub target: &'a str,
}

/// Permission check
///
/// # Examples
///
/// ```
/// use reinhardt_nested_serializers::permissions::{IsAuthenticated, Permission, PermissionContext};
/// use reinhardt_nested_core::Request;
/// use http::Method;
///
/// #[tokio::main]
/// async fn main() {
///     let request = Request::new(Method::POST).with_user("alice");
///     let context = PermissionContext { request: &request, target: "OrderSerializer" };
///     assert!(IsAuthenticated.has_permission(&context).await);
/// }
/// ```
#[async_trait]
pub trait Permission: Send + Sync {
	/// Name reported when the permission denies a request
	fn name(&self) -> &str {
		let full = std::any::type_name::<Self>();
		full.rsplit("::").next().unwrap_or(full)
	}

	async fn has_permission(&self, context: &PermissionContext<'_>) -> bool;
}

/// Allow any access
pub struct AllowAny;

#[async_trait]
impl Permission for AllowAny {
	async fn has_permission(&self, _context: &PermissionContext<'_>) -> bool {
		true
	}
}

/// Deny every request
pub struct DenyAll;

#[async_trait]
impl Permission for DenyAll {
	async fn has_permission(&self, _context: &PermissionContext<'_>) -> bool {
		false
	}
}

/// Require an authenticated user
pub struct IsAuthenticated;

#[async_trait]
impl Permission for IsAuthenticated {
	async fn has_permission(&self, context: &PermissionContext<'_>) -> bool {
		context.request.is_authenticated
	}
}

/// Require an authenticated administrator
pub struct IsAdminUser;

#[async_trait]
impl Permission for IsAdminUser {
	async fn has_permission(&self, context: &PermissionContext<'_>) -> bool {
		context.request.is_authenticated && context.request.is_admin
	}
}

/// Authenticated for writes, anyone for safe methods
pub struct IsAuthenticatedOrReadOnly;

#[async_trait]
impl Permission for IsAuthenticatedOrReadOnly {
	async fn has_permission(&self, context: &PermissionContext<'_>) -> bool {
		context.request.is_safe_method() || context.request.is_authenticated
	}
}

/// Permission lists of one serializer
#[derive(Clone, Default)]
pub struct PermissionPolicy {
	default: Option<Vec<Arc<dyn Permission>>>,
	by_method: HashMap<Method, Vec<Arc<dyn Permission>>>,
}

impl PermissionPolicy {
	/// A policy with no default list; it must get one before use
	pub fn new() -> Self {
		Self::default()
	}

	/// A policy whose default list is `AllowAny`
	pub fn allow_any() -> Self {
		Self::new().with_default(vec![Arc::new(AllowAny)])
	}

	pub fn with_default(mut self, permissions: Vec<Arc<dyn Permission>>) -> Self {
		self.default = Some(permissions);
		self
	}

	/// Override the list used for `method`
	pub fn with_method(mut self, method: Method, permissions: Vec<Arc<dyn Permission>>) -> Self {
		self.by_method.insert(method, permissions);
		self
	}

	pub fn has_default(&self) -> bool {
		self.default.is_some()
	}

	/// Fail unless a default list is declared
	pub fn ensure_default(&self, serializer: &str) -> SerializerResult<()> {
		if self.default.is_none() {
			return Err(SerializerError::configuration(
				"permission_classes",
				format!(
					"'{}' should include a default permission_classes list",
					serializer
				),
			));
		}
		Ok(())
	}

	/// The list that applies to `method`
	pub fn select(&self, method: &Method) -> &[Arc<dyn Permission>] {
		self.by_method
			.get(method)
			.or(self.default.as_ref())
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	/// Evaluate the selected list; the first denial aborts
	pub async fn check(&self, serializer: &str, request: &Request) -> SerializerResult<()> {
		self.ensure_default(serializer)?;
		let context = PermissionContext {
			request,
			target: serializer,
		};
		for permission in self.select(&request.method) {
			if !permission.has_permission(&context).await {
				tracing::warn!(
					serializer,
					permission = permission.name(),
					method = %request.method,
					"permission denied"
				);
				return Err(SerializerError::PermissionDenied {
					permission: permission.name().to_string(),
					method: request.method.to_string(),
					target: serializer.to_string(),
				});
			}
		}
		Ok(())
	}
}

impl std::fmt::Debug for PermissionPolicy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let names = |list: &[Arc<dyn Permission>]| {
			list.iter().map(|p| p.name().to_string()).collect::<Vec<_>>()
		};
		f.debug_struct("PermissionPolicy")
			.field("default", &self.default.as_deref().map(names))
			.field(
				"by_method",
				&self
					.by_method
					.iter()
					.map(|(m, list)| (m.as_str(), names(list)))
					.collect::<HashMap<_, _>>(),
			)
			.finish()
	}
}
