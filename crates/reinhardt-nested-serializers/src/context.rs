//! Serializer context
//!
//! The context travels explicitly through every call: it carries the
//! persistence collaborator, the optional request, the partial flag and
//! depth tracking for nested resolution.

use reinhardt_nested_core::settings::DEFAULT_MAX_DEPTH;
use reinhardt_nested_core::{ModelStore, Request, SerializerError, SerializerResult};
use std::sync::Arc;

/// Request-scoped state shared by a serializer and the related serializers
/// it drives
///
/// # Examples
///
/// ```ignore
/// let ctx = SerializerContext::new(store)
///     .with_request(Request::new(Method::POST))
///     .with_partial(false);
///
/// let child = ctx.child()?;
/// assert_eq!(child.depth(), 1);
/// ```
#[derive(Clone)]
pub struct SerializerContext {
	store: Arc<dyn ModelStore>,
	request: Option<Arc<Request>>,
	partial: bool,
	depth: usize,
	max_depth: usize,
}

impl SerializerContext {
	/// Create a root context without a request
	pub fn new(store: Arc<dyn ModelStore>) -> Self {
		Self {
			store,
			request: None,
			partial: false,
			depth: 0,
			max_depth: DEFAULT_MAX_DEPTH,
		}
	}

	pub fn with_request(mut self, request: Request) -> Self {
		self.request = Some(Arc::new(request));
		self
	}

	pub fn with_shared_request(mut self, request: Arc<Request>) -> Self {
		self.request = Some(request);
		self
	}

	pub fn with_partial(mut self, partial: bool) -> Self {
		self.partial = partial;
		self
	}

	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	pub fn store(&self) -> &dyn ModelStore {
		self.store.as_ref()
	}

	pub fn request(&self) -> Option<&Request> {
		self.request.as_deref()
	}

	/// The request, or `MissingRequest` naming the serializer that needed it
	pub fn require_request(&self, serializer: &str) -> SerializerResult<&Request> {
		self.request
			.as_deref()
			.ok_or_else(|| SerializerError::MissingRequest {
				serializer: serializer.to_string(),
			})
	}

	pub fn is_partial(&self) -> bool {
		self.partial
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	/// Context for a related serializer one level down
	///
	/// Fails with `DepthExceeded` once the depth would pass `max_depth`.
	pub fn child(&self) -> SerializerResult<Self> {
		if self.depth >= self.max_depth {
			return Err(SerializerError::DepthExceeded {
				max_depth: self.max_depth,
			});
		}
		Ok(Self {
			store: Arc::clone(&self.store),
			request: self.request.clone(),
			partial: self.partial,
			depth: self.depth + 1,
			max_depth: self.max_depth,
		})
	}
}

impl std::fmt::Debug for SerializerContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SerializerContext")
			.field("request", &self.request)
			.field("partial", &self.partial)
			.field("depth", &self.depth)
			.field("max_depth", &self.max_depth)
			.finish_non_exhaustive()
	}
}
