//! Instance gatekeeper
//!
//! An ordered chain of instance validators. Each one receives the output of
//! the previous one and may transform the instance or reject it; the first
//! rejection ends the chain.

use async_trait::async_trait;
use reinhardt_nested_core::{Instance, Request, SerializerError, SerializerResult};
use std::sync::Arc;

/// Why a validator refused an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
	pub reason: String,
}

impl Rejection {
	pub fn new(reason: impl Into<String>) -> Self {
		Self {
			reason: reason.into(),
		}
	}
}

/// A validator in the gatekeeper chain
#[async_trait]
pub trait InstanceValidator: Send + Sync {
	fn name(&self) -> &str {
		let full = std::any::type_name::<Self>();
		full.rsplit("::").next().unwrap_or(full)
	}

	async fn validate(&self, instance: Instance, request: &Request) -> Result<Instance, Rejection>;
}

/// The validator chain of one serializer
#[derive(Clone, Default)]
pub struct Gatekeeper {
	validators: Vec<Arc<dyn InstanceValidator>>,
}

impl Gatekeeper {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with<V: InstanceValidator + 'static>(mut self, validator: V) -> Self {
		self.validators.push(Arc::new(validator));
		self
	}

	pub fn len(&self) -> usize {
		self.validators.len()
	}

	pub fn is_empty(&self) -> bool {
		self.validators.is_empty()
	}

	/// Run the chain; on rejection returns the rejecting validator's name
	pub async fn run(
		&self,
		instance: Instance,
		request: &Request,
	) -> Result<Instance, (String, Rejection)> {
		let mut current = instance;
		for validator in &self.validators {
			current = validator
				.validate(current, request)
				.await
				.map_err(|rejection| (validator.name().to_string(), rejection))?;
		}
		Ok(current)
	}

	/// Run the chain for a write; a missing request or a rejection is fatal
	pub async fn check(
		&self,
		serializer: &str,
		instance: Instance,
		request: Option<&Request>,
	) -> SerializerResult<Instance> {
		let request = request.ok_or_else(|| SerializerError::MissingRequest {
			serializer: serializer.to_string(),
		})?;
		self.run(instance, request)
			.await
			.map_err(|(validator, rejection)| {
				tracing::warn!(
					serializer,
					validator = %validator,
					reason = %rejection.reason,
					"instance rejected"
				);
				SerializerError::Rejected {
					validator,
					reason: rejection.reason,
				}
			})
	}
}

impl std::fmt::Debug for Gatekeeper {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list()
			.entries(self.validators.iter().map(|v| v.name()))
			.finish()
	}
}
