use crate::Value;

/// SQL parameter container.
#[derive(Clone, Debug, PartialEq)]
pub enum Params {
    /// Positional values mapped to `?` / `$n` placeholders.
    Positional(Vec<Value>),
    /// Named values mapped to `:name` style placeholders.
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn named<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Self::Positional(values.into())
    }
}

/// Parameterized raw SQL fragment for `executeRaw`.
#[derive(Clone, Debug, PartialEq)]
pub struct Sql {
    /// SQL text.
    pub text: String,
    /// Values bound to the placeholders in `text`.
    pub params: Params,
}

impl Sql {
    pub fn new<P: Into<Params>>(text: impl Into<String>, params: P) -> Self {
        Self {
            text: text.into(),
            params: params.into(),
        }
    }
}

impl From<&str> for Sql {
    fn from(text: &str) -> Self {
        Self::new(text, ())
    }
}

impl From<String> for Sql {
    fn from(text: String) -> Self {
        Self::new(text, ())
    }
}
