use std::fmt;

use serde::Serialize;

/// Model-level engine actions the adapter knows about.
///
/// Raw and unsafe query variants are deliberately absent. Raw execution goes
/// through [`RawExecutor`](crate::RawExecutor) instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    FindMany,
    FindFirst,
    FindFirstOrThrow,
    FindUnique,
    FindUniqueOrThrow,
    Create,
    CreateMany,
    CreateManyAndReturn,
    Update,
    UpdateMany,
    UpdateManyAndReturn,
    Upsert,
    Delete,
    DeleteMany,
    Aggregate,
    Count,
    GroupBy,
}

impl Action {
    /// Actions whose effect variant passes the result through unchanged.
    pub const PASS_THROUGH: [Action; 13] = [
        Action::FindMany,
        Action::Create,
        Action::CreateMany,
        Action::CreateManyAndReturn,
        Action::Update,
        Action::UpdateMany,
        Action::UpdateManyAndReturn,
        Action::Upsert,
        Action::Delete,
        Action::DeleteMany,
        Action::Aggregate,
        Action::Count,
        Action::GroupBy,
    ];

    /// Single-row lookups with bespoke handling of absent rows.
    pub const LOOKUPS: [Action; 4] = [
        Action::FindFirst,
        Action::FindFirstOrThrow,
        Action::FindUnique,
        Action::FindUniqueOrThrow,
    ];

    /// Wire name sent to the engine.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::FindMany => "findMany",
            Action::FindFirst => "findFirst",
            Action::FindFirstOrThrow => "findFirstOrThrow",
            Action::FindUnique => "findUnique",
            Action::FindUniqueOrThrow => "findUniqueOrThrow",
            Action::Create => "create",
            Action::CreateMany => "createMany",
            Action::CreateManyAndReturn => "createManyAndReturn",
            Action::Update => "update",
            Action::UpdateMany => "updateMany",
            Action::UpdateManyAndReturn => "updateManyAndReturn",
            Action::Upsert => "upsert",
            Action::Delete => "delete",
            Action::DeleteMany => "deleteMany",
            Action::Aggregate => "aggregate",
            Action::Count => "count",
            Action::GroupBy => "groupBy",
        }
    }

    /// Name of the effect entry point for this action, e.g. `createEffect`.
    pub fn effect_name(self) -> &'static str {
        match self {
            Action::FindMany => "findManyEffect",
            Action::FindFirst => "findFirstEffect",
            Action::FindFirstOrThrow => "findFirstOrThrowEffect",
            Action::FindUnique => "findUniqueEffect",
            Action::FindUniqueOrThrow => "findUniqueOrThrowEffect",
            Action::Create => "createEffect",
            Action::CreateMany => "createManyEffect",
            Action::CreateManyAndReturn => "createManyAndReturnEffect",
            Action::Update => "updateEffect",
            Action::UpdateMany => "updateManyEffect",
            Action::UpdateManyAndReturn => "updateManyAndReturnEffect",
            Action::Upsert => "upsertEffect",
            Action::Delete => "deleteEffect",
            Action::DeleteMany => "deleteManyEffect",
            Action::Aggregate => "aggregateEffect",
            Action::Count => "countEffect",
            Action::GroupBy => "groupByEffect",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::Action;

    #[test]
    fn pass_through_and_lookups_partition_all_actions() {
        let pass: HashSet<_> = Action::PASS_THROUGH.into_iter().collect();
        let lookups: HashSet<_> = Action::LOOKUPS.into_iter().collect();
        assert_eq!(pass.len(), 13);
        assert_eq!(lookups.len(), 4);
        assert!(pass.is_disjoint(&lookups));
    }

    #[test]
    fn effect_name_appends_suffix() {
        for action in Action::PASS_THROUGH.into_iter().chain(Action::LOOKUPS) {
            assert_eq!(action.effect_name(), format!("{}Effect", action.as_str()));
        }
    }

    #[test]
    fn serializes_as_wire_name() {
        for action in Action::PASS_THROUGH.into_iter().chain(Action::LOOKUPS) {
            assert_eq!(
                serde_json::to_value(action).expect("must serialize"),
                serde_json::Value::String(action.as_str().to_owned())
            );
        }
    }
}
