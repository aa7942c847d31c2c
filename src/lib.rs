//! # freeset-gateway
//!
//! Stateless HTTP gateway in front of third-party AI providers (text
//! generation, background and watermark removal, image generation, upscale
//! and unblur).
//!
//! Every request runs the same pipeline:
//!
//! 1. validate the input,
//! 2. short-circuit when the provider has no credentials,
//! 3. call the provider through a [`retry::RetryExecutor`] (5xx, connection
//!    failures and timeouts are retried with exponential backoff),
//! 4. pull the result out of the provider payload with a
//!    [`normalize::ResponseNormalizer`],
//! 5. answer with a [`types::NormalizedResult`] envelope, or degrade to
//!    placeholder data or an error per the provider's
//!    [`config::FallbackPolicy`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use freeset_gateway::prelude::*;
//!
//! # async fn run() -> Result<(), GatewayError> {
//! let gateway = Gateway::new(GatewayConfig::from_env()?)?;
//! let reply = gateway.generate_text(TextRequest::new("Hello")).await;
//! println!("{}", serde_json::to_string(&reply.result)?);
//!
//! let app = freeset_gateway::server::router(Arc::new(gateway));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod providers;
pub mod retry;
pub mod server;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use error::{GatewayError, Result};

pub mod prelude {
    pub use crate::config::{Degrade, FallbackPolicy, GatewayConfig, ProviderSettings};
    pub use crate::error::{GatewayError, Result};
    pub use crate::gateway::{Gateway, GatewayReply};
    pub use crate::normalize::{ExtractionRules, FieldPath, ResponseNormalizer};
    pub use crate::retry::{RetryExecutor, RetryPolicy};
    pub use crate::types::{
        ImageGenerationRequest, ImageUpload, NormalizedResult, ProviderKind, RawResponse,
        ResultSource, TextRequest,
    };
}
