//! Effect entry points over a database client.
//!
//! [`Effectful`] wraps a [`ModelDelegate`] and exposes one `*_effect` method
//! per model action. Each returns a future of `Result<_, DbError>`: nothing
//! runs until it is awaited, and every failure the delegate reports comes
//! back normalized. The delegate's own API is left untouched.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::{Action, DbError, Failure, Sql};

/// Per-model database client the adapter calls into.
#[async_trait]
pub trait ModelDelegate: Send + Sync {
    type Error: Into<Failure> + Send;

    /// Runs `action` with the engine's JSON query document.
    async fn dispatch(&self, action: Action, args: JsonValue) -> Result<JsonValue, Self::Error>;
}

#[async_trait]
impl<T: ModelDelegate + ?Sized> ModelDelegate for Arc<T> {
    type Error = T::Error;

    async fn dispatch(&self, action: Action, args: JsonValue) -> Result<JsonValue, Self::Error> {
        (**self).dispatch(action, args).await
    }
}

/// Client-level raw statement execution.
#[async_trait]
pub trait RawExecutor: Send + Sync {
    type Error: Into<Failure> + Send;

    /// Runs `sql` and returns the number of affected rows.
    async fn execute_raw(&self, sql: Sql) -> Result<u64, Self::Error>;
}

#[async_trait]
impl<T: RawExecutor + ?Sized> RawExecutor for Arc<T> {
    type Error = T::Error;

    async fn execute_raw(&self, sql: Sql) -> Result<u64, Self::Error> {
        (**self).execute_raw(sql).await
    }
}

/// Effect-returning view over a [`ModelDelegate`].
#[derive(Clone, Debug)]
pub struct Effectful<D> {
    delegate: D,
}

impl<D: ModelDelegate> Effectful<D> {
    pub fn new(delegate: D) -> Self {
        Self { delegate }
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn into_inner(self) -> D {
        self.delegate
    }

    /// Runs `action` and normalizes any failure. The result is passed through
    /// unchanged.
    pub async fn run(&self, action: Action, args: JsonValue) -> Result<JsonValue, DbError> {
        self.delegate
            .dispatch(action, args)
            .await
            .map_err(|err| normalize(action, err))
    }

    /// `findFirst`, with "no row" as `None` instead of `null`.
    pub async fn find_first_effect(&self, args: JsonValue) -> Result<Option<JsonValue>, DbError> {
        self.run(Action::FindFirst, args).await.map(present)
    }

    /// `findUnique`, with "no row" as `None` instead of `null`.
    pub async fn find_unique_effect(&self, args: JsonValue) -> Result<Option<JsonValue>, DbError> {
        self.run(Action::FindUnique, args).await.map(present)
    }

    /// `findFirstOrThrow`. A missing row is the delegate's failure, which
    /// normalizes to [`ErrorCode::NotFound`](crate::ErrorCode::NotFound).
    pub async fn find_first_or_throw_effect(&self, args: JsonValue) -> Result<JsonValue, DbError> {
        self.run(Action::FindFirstOrThrow, args).await
    }

    /// `findUniqueOrThrow`; see [`Effectful::find_first_or_throw_effect`].
    pub async fn find_unique_or_throw_effect(
        &self,
        args: JsonValue,
    ) -> Result<JsonValue, DbError> {
        self.run(Action::FindUniqueOrThrow, args).await
    }
}

macro_rules! pass_through_effects {
    ($($method:ident => $action:ident),* $(,)?) => {
        impl<D: ModelDelegate> Effectful<D> {
            $(
                #[doc = concat!("Effect variant of `", stringify!($action), "`.")]
                pub async fn $method(&self, args: JsonValue) -> Result<JsonValue, DbError> {
                    self.run(Action::$action, args).await
                }
            )*
        }
    };
}

pass_through_effects! {
    find_many_effect => FindMany,
    create_effect => Create,
    create_many_effect => CreateMany,
    create_many_and_return_effect => CreateManyAndReturn,
    update_effect => Update,
    update_many_effect => UpdateMany,
    update_many_and_return_effect => UpdateManyAndReturn,
    upsert_effect => Upsert,
    delete_effect => Delete,
    delete_many_effect => DeleteMany,
    aggregate_effect => Aggregate,
    count_effect => Count,
    group_by_effect => GroupBy,
}

/// Effect-returning view over a [`RawExecutor`].
#[derive(Clone, Debug)]
pub struct RawEffectful<R> {
    executor: R,
}

impl<R: RawExecutor> RawEffectful<R> {
    pub fn new(executor: R) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &R {
        &self.executor
    }

    /// `executeRaw`, resolving to the affected-row count.
    pub async fn execute_raw_effect(&self, sql: impl Into<Sql>) -> Result<u64, DbError> {
        self.executor
            .execute_raw(sql.into())
            .await
            .map_err(|err| normalize("executeRaw", err))
    }
}

fn present(row: JsonValue) -> Option<JsonValue> {
    match row {
        JsonValue::Null => None,
        row => Some(row),
    }
}

fn normalize(operation: impl std::fmt::Display, err: impl Into<Failure>) -> DbError {
    let err = DbError::from_unknown(err);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        %operation,
        code = %err.code(),
        vendor_code = err.vendor_code(),
        "database call failed"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = operation;

    err
}
