//! `dbfx` puts a typed-error surface over a database query engine client.
//!
//! Every model action gets an effect variant that returns
//! `Result<_, DbError>`, where [`DbError`] is one of ten closed causes:
//! - [`Effectful::find_many_effect`], [`Effectful::create_effect`], ...
//! - [`Effectful::find_first_effect`] / [`Effectful::find_unique_effect`],
//!   which report "no row" as `None`
//! - [`RawEffectful::execute_raw_effect`]
//!
//! [`EngineClient`] is an HTTP client for the engine itself and keeps its own
//! native API with [`EngineError`].

mod action;
mod adapter;
mod client;
mod codec;
mod error;
mod normalize;
mod options;
mod params;
mod value;
mod wire;

pub use action::Action;
pub use adapter::{Effectful, ModelDelegate, RawEffectful, RawExecutor};
pub use client::{EngineClient, ModelHandle, CLIENT_VERSION};
pub use error::EngineError;
pub use normalize::{Cause, DbError, ErrorCode, Failure, ParseErrorCodeError};
pub use options::ClientOptions;
pub use params::{Params, Sql};
pub use value::Value;

pub type Result<T> = std::result::Result<T, EngineError>;
