//! Integration tests for check orchestration

use core_permission::{
    Authorizer, CheckError, CheckMode, Config, DenialCode, Granted, NotFoundReason, Object,
    PermissionAuthorizer, PermissionTree, Rule, Schema, UserProxy,
};

fn user(grants: &[&str]) -> UserProxy {
    UserProxy::new(Object::new("alice")).grant_all(grants.iter().copied())
}

fn strict(schema: &Schema, path: &str, user: &UserProxy) -> Result<Granted, CheckError> {
    schema.check_permission(path, user, &Object::none(), CheckMode::Strict)
}

// =============================================================================
// SINGLE PERMISSION
// =============================================================================

#[test]
fn test_granted_permission() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let users = tree.add_group(tree.root(), "users").unwrap();
    tree.add_permission(users, "change_password").unwrap();

    let granted = strict(&schema, "users.change_password", &user(&["users.change_password"]))
        .unwrap();
    assert_eq!(granted.paths(), vec!["users.change_password"]);
    assert_eq!(granted.len(), 1);
    assert!(granted.contains("users.change_password"));
}

#[test]
fn test_not_granted_permission() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let users = tree.add_group(tree.root(), "users").unwrap();
    let change = tree.add_permission(users, "change_password").unwrap();

    let err = strict(&schema, "users.change_password", &user(&[])).unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.code, DenialCode::PermissionNotGranted);
    assert_eq!(denied.permission, Some(change));
    assert!(denied.rule.is_none());
    assert!(err.to_string().starts_with("Permission denied (PermissionNotGranted)"));
}

#[test]
fn test_unknown_path_is_not_found() {
    let schema = Schema::new();
    assert!(matches!(
        strict(&schema, "nothing.here", &user(&["nothing.here"])),
        Err(CheckError::PermissionNotFound(NotFoundReason::UnknownSegment { .. }))
    ));
}

// =============================================================================
// CONTEXTS
// =============================================================================

fn context_schema() -> Schema {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let admin = tree.add_permission(tree.root(), "admin_panel").unwrap();
    tree.permission_mut(admin).add_context("staff");
    schema
}

#[test]
fn test_context_gate() {
    let schema = context_schema();

    let outside = user(&["admin_panel"]);
    let err = strict(&schema, "admin_panel", &outside).unwrap_err();
    assert_eq!(err.denial_code(), Some(DenialCode::NotInContext));

    let inside = user(&["admin_panel"]).in_context("staff");
    assert!(strict(&schema, "admin_panel", &inside).is_ok());
}

#[test]
fn test_context_gate_runs_before_grant_gate() {
    let schema = context_schema();
    let err = strict(&schema, "admin_panel", &user(&[])).unwrap_err();
    assert_eq!(err.denial_code(), Some(DenialCode::NotInContext));
}

// =============================================================================
// DEPENDENCIES
// =============================================================================

/// a depends on b, b depends on c
fn chain_schema() -> Schema {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let a = tree.add_permission(tree.root(), "a").unwrap();
    let b = tree.add_permission(tree.root(), "b").unwrap();
    tree.add_permission(tree.root(), "c").unwrap();
    tree.permission_mut(a).add_dependency("b").unwrap();
    tree.permission_mut(b).add_dependency("c").unwrap();
    schema
}

#[test]
fn test_dependency_chain_is_reported_in_order() {
    let schema = chain_schema();
    let granted = strict(&schema, "a", &user(&["a", "b", "c"])).unwrap();
    assert_eq!(granted.paths(), vec!["a", "b", "c"]);
}

#[test]
fn test_dependency_denial_is_attributed_to_dependency() {
    let schema = chain_schema();
    let err = strict(&schema, "a", &user(&["a", "b"])).unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.code, DenialCode::PermissionNotGranted);
    assert_eq!(denied.path, "c");
}

#[test]
fn test_wildcard_dependency_checks_every_match() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let reports = tree.add_group(tree.root(), "reports").unwrap();
    tree.add_permission(reports, "view").unwrap();
    tree.add_permission(reports, "export").unwrap();
    let admin = tree.add_permission(tree.root(), "admin").unwrap();
    tree.permission_mut(admin).add_dependency("reports.*").unwrap();

    let granted = strict(
        &schema,
        "admin",
        &user(&["admin", "reports.view", "reports.export"]),
    )
    .unwrap();
    assert_eq!(granted.paths(), vec!["admin", "reports.view", "reports.export"]);

    let err = strict(&schema, "admin", &user(&["admin", "reports.view"])).unwrap_err();
    assert_eq!(err.as_denied().unwrap().path, "reports.export");
}

#[test]
fn test_unresolvable_dependency_is_not_found() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let a = tree.add_permission(tree.root(), "a").unwrap();
    tree.permission_mut(a).add_dependency("missing").unwrap();

    assert!(matches!(
        strict(&schema, "a", &user(&["a"])),
        Err(CheckError::PermissionNotFound(_))
    ));
}

#[test]
fn test_dependencies_run_before_rules() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let a = tree.add_permission(tree.root(), "a").unwrap();
    tree.add_permission(tree.root(), "b").unwrap();
    let permission = tree.permission_mut(a);
    permission.add_dependency("b").unwrap();
    permission.add_rule(Rule::new("never", |_, _, _| false)).unwrap();

    let err = strict(&schema, "a", &user(&["a"])).unwrap_err();
    assert_eq!(err.denial_code(), Some(DenialCode::PermissionNotGranted));
    assert_eq!(err.as_denied().unwrap().path, "b");
}

// =============================================================================
// WILDCARD FAN-OUT
// =============================================================================

/// docs.{read, write, delete}; delete has a failing rule
fn fan_out_schema() -> Schema {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let docs = tree.add_group(tree.root(), "docs").unwrap();
    tree.add_permission(docs, "read").unwrap();
    tree.add_permission(docs, "write").unwrap();
    let delete = tree.add_permission(docs, "delete").unwrap();
    tree.permission_mut(delete)
        .add_rule(Rule::new("never", |_, _, _| false))
        .unwrap();
    tree.add_group(tree.root(), "empty").unwrap();
    schema
}

#[test]
fn test_fan_out_tolerates_ungranted_siblings() {
    let schema = fan_out_schema();
    let granted = strict(&schema, "docs.*", &user(&["docs.read"])).unwrap();
    assert_eq!(granted.paths(), vec!["docs.read"]);
}

#[test]
fn test_fan_out_all_ungranted_is_aggregate_denial() {
    let schema = fan_out_schema();
    let err = strict(&schema, "docs.*", &user(&[])).unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.code, DenialCode::PermissionNotGranted);
    // Attributed to the first match
    assert_eq!(denied.path, "docs.read");
    assert!(denied.message.contains("docs.read, docs.write, docs.delete"));
}

#[test]
fn test_fan_out_aborts_on_rule_failure() {
    let schema = fan_out_schema();
    let err = strict(&schema, "docs.*", &user(&["docs.read", "docs.delete"])).unwrap_err();
    assert_eq!(err.denial_code(), Some(DenialCode::RuleNotSatisfied));
    assert_eq!(err.as_denied().unwrap().path, "docs.delete");
}

#[test]
fn test_fan_out_aborts_on_ungranted_dependency() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let docs = tree.add_group(tree.root(), "docs").unwrap();
    let read = tree.add_permission(docs, "read").unwrap();
    tree.add_permission(docs, "write").unwrap();
    tree.add_permission(tree.root(), "login").unwrap();
    tree.permission_mut(read).add_dependency("login").unwrap();

    // docs.read is granted but its dependency is not: the fan-out stops there
    let err = strict(&schema, "docs.*", &user(&["docs.read", "docs.write"])).unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.code, DenialCode::PermissionNotGranted);
    assert_eq!(denied.path, "login");
}

#[test]
fn test_empty_fan_out_is_no_permissions_found() {
    let schema = fan_out_schema();
    assert!(matches!(
        strict(&schema, "empty.*", &user(&[])),
        Err(CheckError::NoPermissionsFound { path }) if path == "empty.*"
    ));
}

#[test]
fn test_single_match_wildcard_behaves_like_exact_check() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let solo = tree.add_group(tree.root(), "solo").unwrap();
    let only = tree.add_permission(solo, "only").unwrap();

    let err = strict(&schema, "solo.*", &user(&[])).unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.permission, Some(only));
    assert!(denied.message.contains("has not been granted"));
}

// =============================================================================
// UNSTRICT
// =============================================================================

#[test]
fn test_unstrict_checks_literal_grants() {
    let schema = Schema::new();
    let alice = user(&["reports.view"]);

    let granted = schema
        .check_permission("reports.view", &alice, &Object::none(), CheckMode::Unstrict)
        .unwrap();
    assert_eq!(granted.paths(), vec!["reports.view"]);
    assert!(granted.permission_ids().is_empty());

    let err = schema
        .check_permission("reports.export", &alice, &Object::none(), CheckMode::Unstrict)
        .unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.code, DenialCode::PermissionNotGranted);
    assert_eq!(denied.permission, None);
    assert!(denied.user.downcast_ref::<&str>().is_some());
}

#[test]
fn test_unstrict_rejects_wildcards() {
    let schema = Schema::new();
    assert!(matches!(
        schema.check_permission("reports.*", &user(&[]), &Object::none(), CheckMode::Unstrict),
        Err(CheckError::PermissionNotFound(NotFoundReason::WildcardNotAllowed { .. }))
    ));
}

// =============================================================================
// AUTHORIZER TRAIT
// =============================================================================

#[test]
fn test_authorizer_trait_objects() {
    let mut tree = PermissionTree::new();
    let users = tree.add_group(tree.root(), "users").unwrap();
    tree.add_permission(users, "edit").unwrap();
    let config = Config::new();

    let schema = Schema::new();
    schema.replace(tree.clone());
    let direct = PermissionAuthorizer::new(&tree, &config);

    let authorizers: [&dyn Authorizer; 2] = [&direct, &schema];
    for authorizer in authorizers {
        let alice = user(&["users.edit"]);
        assert_eq!(
            authorizer.authorize("users.edit", &alice, &Object::none()).unwrap(),
            vec!["users.edit"]
        );
        assert!(!authorizer
            .is_allowed("users.edit", &user(&[]), &Object::none())
            .unwrap());
        assert!(authorizer
            .is_allowed("users.nope", &alice, &Object::none())
            .is_err());
    }
}
