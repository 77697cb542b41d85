//! Shared building blocks of the Flow client library: the interaction record, the builder
//! pipeline and every builder, typed Cadence arguments, configuration and the address and
//! template helpers.
pub mod address;
pub mod builders;
pub mod config;
pub mod interaction;
pub mod pipeline;
pub mod serialize;
pub mod template;
pub mod types;

pub use config::Config;
pub use interaction::{Authorization, Interaction, InteractionTag, Status};
pub use pipeline::{build, is_bad, is_ok, pipe, why, BoxedTransformer, Transformer};

/// Cadence argument types, under the short name used by Flow tooling.
pub use self::types as t;
