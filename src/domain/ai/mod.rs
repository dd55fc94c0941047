//! AI module - backend registry, provider configuration, prompt framing and
//! stream item types.

mod errors;
mod fragment;
mod prompts;
mod provider_config;
pub mod registry;

pub use errors::AIError;
pub use fragment::{Fragment, StreamFailure, StreamFailureKind};
pub use prompts::{ConsultationType, PhaseContext, MAIN_SYSTEM_PROMPT};
pub use provider_config::{AIProviderConfig, ProviderSelection};
pub use registry::{ProviderDescriptor, ProviderMode, WireProtocol};
