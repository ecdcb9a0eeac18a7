//! Changes to namespaces, domains, functions, sequences and policies.

mod common;

use common::{plan, plan_err, plan_with_hints, snapshot, sql, tags, users};
use oxide_ddl_core::prelude::*;
use oxide_ddl_core::snapshot::{FunctionArg, FunctionSecurity, PolicyAs, PolicyFor, Volatility};

const PG: Dialect = Dialect::Postgres;

// =============================================================================
// Schemas and moves
// =============================================================================

fn audit_snapshot(schema: &str) -> Snapshot {
    let events = Table::new(schema, "events")
        .column(Column::new("id", "integer").primary_key().not_null())
        .column(Column::new("level", "level").type_schema(schema));
    snapshot(PG, [events])
        .with_schema(schema)
        .with_enum(Enum::new(schema, "level", ["info", "warn"]))
}

#[test]
fn schema_rename_carries_its_tables_and_enums() {
    let from = audit_snapshot("audit");
    let to = audit_snapshot("logs");

    let plan = plan_with_hints(&from, &to, &["audit->logs"]);
    assert_eq!(tags(&plan), vec!["rename_schema"]);
    assert_eq!(sql(&plan), vec!["ALTER SCHEMA \"audit\" RENAME TO \"logs\";"]);
    assert_eq!(
        plan.meta.schemas.get("\"audit\"").map(String::as_str),
        Some("\"logs\"")
    );
}

#[test]
fn unhinted_schema_change_rebuilds_everything() {
    let plan = plan(&audit_snapshot("audit"), &audit_snapshot("logs"));
    assert_eq!(
        tags(&plan),
        vec![
            "create_schema",
            "create_type_enum",
            "create_table",
            "drop_table",
            "drop_type_enum",
            "drop_schema",
        ]
    );
}

#[test]
fn enum_move_sets_the_schema() {
    let base = Snapshot::empty(PG).with_schema("audit");
    let from = base
        .clone()
        .with_enum(Enum::new("public", "mood", ["sad", "happy"]));
    let to = base.with_enum(Enum::new("audit", "mood", ["sad", "happy"]));

    let plan = plan_with_hints(&from, &to, &["public.mood->audit.mood"]);
    assert_eq!(tags(&plan), vec!["move_type_enum"]);
    assert_eq!(
        sql(&plan),
        vec!["ALTER TYPE \"public\".\"mood\" SET SCHEMA \"audit\";"]
    );
}

#[test]
fn table_move_sets_the_schema() {
    let from = snapshot(PG, [users(PG)]).with_schema("audit");
    let mut moved = users(PG);
    moved.schema = "audit".into();
    let to = snapshot(PG, [moved]).with_schema("audit");

    let plan = plan_with_hints(&from, &to, &["public.users->audit.users"]);
    assert_eq!(tags(&plan), vec!["alter_table_set_schema"]);
    assert_eq!(sql(&plan), vec!["ALTER TABLE \"users\" SET SCHEMA \"audit\";"]);
    assert_eq!(
        plan.meta.tables.get("\"public\".\"users\"").map(String::as_str),
        Some("\"audit\".\"users\"")
    );
}

// =============================================================================
// Domains
// =============================================================================

fn positive(base_type: &str) -> Domain {
    Domain {
        name: "positive".into(),
        schema: "public".into(),
        base_type: base_type.into(),
        not_null: false,
        default: None,
        checks: vec![Check {
            name: "positive_check".into(),
            value: "VALUE > 0".into(),
        }],
    }
}

#[test]
fn domain_changes_alter_in_place() {
    let from = Snapshot::empty(PG).with_domain(positive("integer"));
    let mut changed = positive("integer");
    changed.default = Some("1".into());
    changed.not_null = true;
    changed.checks[0].value = "VALUE >= 0".into();
    let to = Snapshot::empty(PG).with_domain(changed);

    let plan = plan(&from, &to);
    assert_eq!(tags(&plan), vec!["alter_domain"; 4]);
    assert_eq!(
        sql(&plan),
        vec![
            "ALTER DOMAIN \"public\".\"positive\" SET DEFAULT 1;",
            "ALTER DOMAIN \"public\".\"positive\" SET NOT NULL;",
            "ALTER DOMAIN \"public\".\"positive\" DROP CONSTRAINT \"positive_check\";",
            "ALTER DOMAIN \"public\".\"positive\" ADD CONSTRAINT \"positive_check\" CHECK (VALUE >= 0);",
        ]
    );
}

#[test]
fn domain_default_is_dropped() {
    let mut defaulted = positive("integer");
    defaulted.default = Some("1".into());
    let from = Snapshot::empty(PG).with_domain(defaulted);
    let to = Snapshot::empty(PG).with_domain(positive("integer"));
    assert_eq!(
        sql(&plan(&from, &to)),
        vec!["ALTER DOMAIN \"public\".\"positive\" DROP DEFAULT;"]
    );
}

#[test]
fn domain_base_type_change_is_rejected() {
    let from = Snapshot::empty(PG).with_domain(positive("integer"));
    let to = Snapshot::empty(PG).with_domain(positive("bigint"));

    let err = plan_err(&from, &to, &[]);
    assert!(matches!(err, Error::UnsupportedTransition { .. }), "{err}");
    assert_eq!(
        err.to_string(),
        "postgresql: changing the base type of domain public.positive from integer to bigint is not supported"
    );
}

// =============================================================================
// Functions
// =============================================================================

fn add_one(arg_type: &str, body: &str) -> Function {
    Function {
        name: "f".into(),
        schema: "public".into(),
        args: vec![FunctionArg {
            name: "a".into(),
            sql_type: arg_type.into(),
        }],
        returns: "integer".into(),
        language: "sql".into(),
        security: FunctionSecurity::Invoker,
        volatility: Volatility::Immutable,
        body: body.into(),
    }
}

#[test]
fn function_signature_change_drops_the_old_overload() {
    let from = Snapshot::empty(PG).with_function(add_one("integer", "SELECT a + 1"));
    let to = Snapshot::empty(PG).with_function(add_one("bigint", "SELECT a + 1"));

    let plan = plan(&from, &to);
    assert_eq!(tags(&plan), vec!["drop_function", "create_function"]);
    assert_eq!(
        sql(&plan),
        vec![
            "DROP FUNCTION \"public\".\"f\"(integer);",
            "CREATE FUNCTION \"public\".\"f\"(\"a\" bigint) RETURNS integer LANGUAGE sql IMMUTABLE SECURITY INVOKER AS $$SELECT a + 1$$;",
        ]
    );
}

#[test]
fn function_body_change_replaces_in_place() {
    let from = Snapshot::empty(PG).with_function(add_one("integer", "SELECT a + 1"));
    let to = Snapshot::empty(PG).with_function(add_one("integer", "SELECT a + 2"));

    let plan = plan(&from, &to);
    assert!(matches!(
        plan.statements.as_slice(),
        [Statement::CreateFunction(create)] if create.or_replace
    ));
    assert_eq!(
        sql(&plan),
        vec!["CREATE OR REPLACE FUNCTION \"public\".\"f\"(\"a\" integer) RETURNS integer LANGUAGE sql IMMUTABLE SECURITY INVOKER AS $$SELECT a + 2$$;"]
    );
}

#[test]
fn function_type_case_is_not_a_change() {
    let from = Snapshot::empty(PG).with_function(add_one("integer", "SELECT a + 1"));
    let to = Snapshot::empty(PG).with_function(add_one("INTEGER", " SELECT a + 1 "));
    assert!(plan(&from, &to).is_empty());
}

// =============================================================================
// Sequences
// =============================================================================

#[test]
fn sequence_change_restates_every_option() {
    let mut before = Sequence::new("public", "order_seq");
    before.increment = Some("1".into());
    let mut after = Sequence::new("public", "order_seq");
    after.increment = Some("5".into());
    after.min_value = Some("10".into());
    after.cycle = true;

    let plan = plan(
        &Snapshot::empty(PG).with_sequence(before),
        &Snapshot::empty(PG).with_sequence(after),
    );
    assert_eq!(tags(&plan), vec!["alter_sequence"]);
    assert_eq!(
        sql(&plan),
        vec!["ALTER SEQUENCE \"public\".\"order_seq\" INCREMENT BY 5 MINVALUE 10 NO MAXVALUE CACHE 1 CYCLE;"]
    );
}

#[test]
fn spelled_out_sequence_defaults_are_not_a_change() {
    let mut explicit = Sequence::new("public", "order_seq");
    explicit.increment = Some("1".into());
    explicit.cache = Some("1".into());
    let from = Snapshot::empty(PG).with_sequence(explicit);
    let to = Snapshot::empty(PG).with_sequence(Sequence::new("public", "order_seq"));
    assert!(plan(&from, &to).is_empty());
}

// =============================================================================
// Policies
// =============================================================================

fn policy(name: &str, kind: PolicyAs) -> Policy {
    Policy {
        name: name.into(),
        kind,
        command: PolicyFor::All,
        to: Vec::new(),
        using: Some("true".into()),
        with_check: None,
    }
}

fn guarded(policy: Policy, rls: bool) -> Snapshot {
    let mut table = users(PG).policy(policy);
    table.is_rls_enabled = rls;
    snapshot(PG, [table])
}

#[test]
fn hinted_policy_rename() {
    let from = guarded(policy("p1", PolicyAs::Permissive), true);
    let to = guarded(policy("p2", PolicyAs::Permissive), true);

    let plan = plan_with_hints(&from, &to, &["public.users.p1->public.users.p2"]);
    assert_eq!(tags(&plan), vec!["rename_policy"]);
    assert_eq!(
        sql(&plan),
        vec!["ALTER POLICY \"p1\" ON \"users\" RENAME TO \"p2\";"]
    );
}

#[test]
fn policy_kind_change_recreates_it() {
    let from = guarded(policy("p1", PolicyAs::Permissive), true);
    let to = guarded(policy("p1", PolicyAs::Restrictive), true);

    let plan = plan(&from, &to);
    assert_eq!(tags(&plan), vec!["drop_policy", "create_policy"]);
    assert_eq!(
        sql(&plan),
        vec![
            "DROP POLICY \"p1\" ON \"users\" CASCADE;",
            "CREATE POLICY \"p1\" ON \"users\" AS RESTRICTIVE FOR ALL TO public USING (true);",
        ]
    );
}

#[test]
fn renamed_policy_with_new_kind_is_recreated() {
    let from = guarded(policy("p1", PolicyAs::Permissive), true);
    let to = guarded(policy("p2", PolicyAs::Restrictive), true);

    let plan = plan_with_hints(&from, &to, &["public.users.p1->public.users.p2"]);
    assert_eq!(tags(&plan), vec!["drop_policy", "create_policy"]);
}

#[test]
fn policy_predicate_change_alters_it() {
    let from = guarded(policy("p1", PolicyAs::Permissive), true);
    let mut narrowed = policy("p1", PolicyAs::Permissive);
    narrowed.using = Some("age >= 18".into());
    let to = guarded(narrowed, true);

    assert_eq!(
        sql(&plan(&from, &to)),
        vec!["ALTER POLICY \"p1\" ON \"users\" TO public USING (age >= 18);"]
    );
}

#[test]
fn row_level_security_toggles() {
    let off = guarded(policy("p1", PolicyAs::Permissive), false);
    let on = guarded(policy("p1", PolicyAs::Permissive), true);

    let enable = plan(&off, &on);
    assert_eq!(tags(&enable), vec!["enable_rls"]);
    assert_eq!(
        sql(&enable),
        vec!["ALTER TABLE \"users\" ENABLE ROW LEVEL SECURITY;"]
    );

    let disable = plan(&on, &off);
    assert_eq!(
        sql(&disable),
        vec!["ALTER TABLE \"users\" DISABLE ROW LEVEL SECURITY;"]
    );
}
