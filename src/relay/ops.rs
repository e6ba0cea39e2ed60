//! Caller-facing guard layer composing the limiter with the forwarding loop.
//!
//! Every operation follows the same shape: record the attempt, consult the rate limiter
//! for the caller's key, and only then touch the network. The generic proxy additionally
//! checks the requested path against the allow-list before any URL is built.

// self
use crate::{
	_prelude::*,
	error::ValidationError,
	http::{RelayTransport, RequestMethod},
	limit::RateLimitDecision,
	obs::{self, OpSpan, RelayOp, RelayOutcome},
	relay::{CallerContext, FlowId, ForwardRequest, Relay, RunId},
};

impl<T> Relay<T>
where
	T: ?Sized + RelayTransport,
{
	/// Probes the upstream health endpoint.
	pub async fn health(&self, context: &CallerContext) -> Result<Value> {
		self.guarded(RelayOp::Health, context, ForwardRequest::new(RequestMethod::Get, "/api/health"))
			.await
	}

	/// Creates a flow from the provided definition.
	pub async fn create_flow(&self, context: &CallerContext, definition: Value) -> Result<Value> {
		let request =
			ForwardRequest::new(RequestMethod::Post, "/api/flows").with_body(definition);

		self.guarded(RelayOp::CreateFlow, context, request).await
	}

	/// Executes the identified flow with the provided input payload.
	pub async fn execute_flow(
		&self,
		context: &CallerContext,
		flow_id: &str,
		input: Value,
	) -> Result<Value> {
		let flow_id = FlowId::new(flow_id).map_err(ValidationError::from)?;
		let request =
			ForwardRequest::new(RequestMethod::Post, format!("/api/flows/{flow_id}/execute"))
				.with_body(input);

		self.guarded(RelayOp::ExecuteFlow, context, request).await
	}

	/// Fetches the status of the identified run.
	pub async fn run_status(&self, context: &CallerContext, run_id: &str) -> Result<Value> {
		let run_id = RunId::new(run_id).map_err(ValidationError::from)?;
		let request = ForwardRequest::new(RequestMethod::Get, format!("/api/runs/{run_id}"));

		self.guarded(RelayOp::RunStatus, context, request).await
	}

	/// Forwards an arbitrary request whose path matches the proxy allow-list.
	///
	/// The allow-list check happens before rate limiting and URL construction; a
	/// rejected path never consumes a token and never reaches the network.
	pub async fn proxy(&self, context: &CallerContext, request: ForwardRequest) -> Result<Value> {
		self.allow_list.ensure(&request.path).map_err(Error::from)?;

		self.guarded(RelayOp::Proxy, context, request).await
	}

	async fn guarded(
		&self,
		op: RelayOp,
		context: &CallerContext,
		request: ForwardRequest,
	) -> Result<Value> {
		let span = OpSpan::new(op, "guarded");

		obs::record_op_outcome(op, RelayOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let RateLimitDecision::Deny { retry_after } =
					self.limiter.check(&context.key, OffsetDateTime::now_utc())
				{
					return Err(Error::RateLimited { key: context.key.clone(), retry_after });
				}

				self.forward(op, context, request).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(op, RelayOutcome::Success),
			Err(Error::RateLimited { .. }) => obs::record_op_outcome(op, RelayOutcome::RateLimited),
			Err(_) => obs::record_op_outcome(op, RelayOutcome::Failure),
		}

		result
	}
}
