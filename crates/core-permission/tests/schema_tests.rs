//! Schema lifecycle: loading, reload, export, user adaptation

use core_permission::export::{self, NodeKind};
use core_permission::{
    CheckError, CheckMode, Config, DefinitionError, Object, PermissionTree, ProxyFactory,
    Schema, Subject, UserProxy,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// =============================================================================
// EXPORT
// =============================================================================

#[test]
fn test_export_round_trip_and_namespace_rekey() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let g = tree.add_group(tree.root(), "g").unwrap();
    tree.add_permission(g, "p").unwrap();

    let before = schema.export();
    assert_eq!(before.keys().collect::<Vec<_>>(), vec!["g", "g.p"]);
    assert_eq!(before["g"].kind, NodeKind::Group);
    assert_eq!(before["g"].parent, None);
    assert_eq!(before["g.p"].kind, NodeKind::Permission);
    assert_eq!(before["g.p"].parent.as_deref(), Some("g"));
    assert_eq!(before["g.p"].description.as_deref(), Some("g.p"));

    schema
        .configure(|config| {
            config.set_namespace("ns");
        })
        .unwrap();
    let after = schema.export();
    assert_eq!(after.keys().collect::<Vec<_>>(), vec!["ns:g", "ns:g.p"]);
    // Parents stay bare
    assert_eq!(after["ns:g.p"].parent.as_deref(), Some("g"));
}

#[test]
fn test_export_carries_group_names_and_descriptions() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let users = tree.add_group(tree.root(), "users").unwrap();
    tree.group_mut(users)
        .set_name("Users")
        .set_description("User management");
    let admin = tree.add_group(users, "admin").unwrap();
    let delete = tree.add_permission(admin, "delete").unwrap();
    tree.permission_mut(delete).set_description("Delete a user");

    let exported = schema.export();
    assert_eq!(exported["users"].name.as_deref(), Some("Users"));
    assert_eq!(exported["users"].description.as_deref(), Some("User management"));
    assert_eq!(exported["users.admin"].parent.as_deref(), Some("users"));
    assert_eq!(exported["users.admin.delete"].description.as_deref(), Some("Delete a user"));
    assert_eq!(exported["users.admin.delete"].parent.as_deref(), Some("users.admin"));
}

#[test]
fn test_export_toml_parses_back() {
    let mut schema = Schema::new();
    let tree = schema.tree_mut();
    let g = tree.add_group(tree.root(), "g").unwrap();
    tree.add_permission(g, "p").unwrap();

    let toml = schema.export_toml().unwrap();
    assert!(toml.contains("type = \"permission\""));
    let parsed = export::from_toml(&toml).unwrap();
    assert_eq!(parsed, schema.export());
}

#[test]
fn test_export_of_empty_schema_is_empty() {
    assert!(Schema::new().export().is_empty());
}

// =============================================================================
// LOADING
// =============================================================================

fn users_loader(tree: &mut PermissionTree) -> Result<(), DefinitionError> {
    let users = tree.add_group(tree.root(), "users")?;
    tree.add_permission(users, "edit")?;
    Ok(())
}

#[test]
fn test_reload_without_load_fails() {
    let schema = Schema::new();
    assert_eq!(schema.reload(), Err(DefinitionError::NotLoaded));
}

#[test]
fn test_load_publishes_tree() {
    let schema = Schema::new();
    schema.load(users_loader).unwrap();
    let alice = UserProxy::new(Object::new("alice")).grant("users.edit");
    assert!(schema
        .can("users.edit", &alice, &Object::none(), CheckMode::Strict)
        .unwrap());
}

#[test]
fn test_reload_rebuilds_and_swaps() {
    let extended = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&extended);

    let schema = Schema::new();
    schema
        .load(move |tree: &mut PermissionTree| -> Result<(), DefinitionError> {
            users_loader(tree)?;
            if flag.load(Ordering::SeqCst) {
                let reports = tree.add_group(tree.root(), "reports")?;
                tree.add_permission(reports, "view")?;
            }
            Ok(())
        })
        .unwrap();

    let snapshot = schema.tree();
    assert_eq!(snapshot.permission_count(), 1);

    extended.store(true, Ordering::SeqCst);
    schema.reload().unwrap();

    // Old snapshots are untouched, new checks see the new tree
    assert_eq!(snapshot.permission_count(), 1);
    assert_eq!(schema.tree().permission_count(), 2);
    assert!(!Arc::ptr_eq(&snapshot, &schema.tree()));
}

#[test]
fn test_failed_load_keeps_previous_tree() {
    let schema = Schema::new();
    schema.load(users_loader).unwrap();

    let result = schema.load(|tree: &mut PermissionTree| -> Result<(), DefinitionError> {
        tree.add_permission(tree.root(), "a")?;
        tree.add_permission(tree.root(), "a")?;
        Ok(())
    });
    assert!(matches!(result, Err(DefinitionError::DuplicateKey { .. })));
    assert_eq!(schema.tree().permission_count(), 1);

    // The first loader is still the one reload uses
    schema.reload().unwrap();
    assert!(schema.tree().find_permissions_from_path(schema.config(), "users.edit").is_ok());
}

#[test]
fn test_replace_publishes_caller_tree() {
    let schema = Schema::new();
    let mut tree = PermissionTree::new();
    tree.add_permission(tree.root(), "solo").unwrap();
    schema.replace(tree);
    assert_eq!(schema.tree().permission_count(), 1);
}

#[test]
fn test_tree_mut_does_not_disturb_snapshots() {
    let mut schema = Schema::new();
    let before = schema.tree();
    let tree = schema.tree_mut();
    tree.add_permission(tree.root(), "late").unwrap();
    assert_eq!(before.permission_count(), 0);
    assert_eq!(schema.tree().permission_count(), 1);
}

// =============================================================================
// USER ADAPTATION
// =============================================================================

struct Member {
    roles: Vec<&'static str>,
}

impl core_permission::ObjectType for Member {
    const TYPE_NAME: &'static str = "Member";
}

impl Subject for Member {
    fn granted_permissions(&self) -> Vec<String> {
        self.roles.iter().map(|r| format!("users.{r}")).collect()
    }
}

#[test]
fn test_check_user_wraps_with_default_proxy() {
    let schema = Schema::new();
    schema.load(users_loader).unwrap();

    // A raw user gets an empty proxy
    let raw = Object::new("alice");
    let err = schema
        .check_user("users.edit", &raw, &Object::none(), CheckMode::Strict)
        .unwrap_err();
    assert!(err.is_denied());
    assert!(err.as_denied().unwrap().user.same(&raw));

    // A proxy passed as the user is reused
    let proxy = Object::new(UserProxy::new(Object::new("alice")).grant("users.edit"));
    assert!(schema
        .can_user("users.edit", &proxy, &Object::none(), CheckMode::Strict)
        .unwrap());
}

#[test]
fn test_custom_proxy_factory() {
    let mut config = Config::new();
    config.set_user_proxy(ProxyFactory::new(|user| {
        match user.downcast_ref::<Member>() {
            Some(member) => UserProxy::for_subject(Member {
                roles: member.roles.clone(),
            }),
            None => UserProxy::new(user.clone()),
        }
    }));
    let schema = Schema::with_config(config).unwrap();
    schema.load(users_loader).unwrap();

    let editor = Object::new(Member { roles: vec!["edit"] });
    let viewer = Object::new(Member { roles: vec!["view"] });
    assert!(schema
        .can_user("users.edit", &editor, &Object::none(), CheckMode::Strict)
        .unwrap());
    assert!(!schema
        .can_user("users.edit", &viewer, &Object::none(), CheckMode::Strict)
        .unwrap());
}

#[test]
fn test_can_only_swallows_denials() {
    let schema = Schema::new();
    schema.load(users_loader).unwrap();
    let alice = UserProxy::new(Object::new("alice"));

    assert_eq!(
        schema
            .can("users.edit", &alice, &Object::none(), CheckMode::Strict)
            .ok(),
        Some(false)
    );
    assert!(matches!(
        schema.can("users.gone", &alice, &Object::none(), CheckMode::Strict),
        Err(CheckError::PermissionNotFound(_))
    ));
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_schema_from_toml_config() {
    let config = Config::from_toml(
        r#"
namespace = "app"
namespace_delimiter = "::"
log_target = "audit"
"#,
    )
    .unwrap();
    assert_eq!(config.log_target(), "audit");

    let schema = Schema::with_config(config).unwrap();
    schema.load(users_loader).unwrap();
    let alice = UserProxy::new(Object::new("alice")).grant("app::users.edit");
    assert!(schema
        .can("app::users.edit", &alice, &Object::none(), CheckMode::Strict)
        .unwrap());
}

#[test]
fn test_invalid_toml_config_is_rejected() {
    assert!(matches!(
        Config::from_toml("namespace_delimiter = \"\""),
        Err(DefinitionError::InvalidConfig(_))
    ));
    assert!(matches!(
        Config::from_toml("unknown = 1"),
        Err(DefinitionError::InvalidConfig(_))
    ));
}

#[test]
fn test_invalid_code_config_is_rejected() {
    let mut empty_delimiter = Config::new();
    empty_delimiter.set_namespace("app").set_namespace_delimiter("");
    assert!(matches!(
        Schema::with_config(empty_delimiter),
        Err(DefinitionError::InvalidConfig(_))
    ));

    let mut dotted_delimiter = Config::new();
    dotted_delimiter.set_namespace_delimiter(".");
    assert!(matches!(
        Schema::with_config(dotted_delimiter),
        Err(DefinitionError::InvalidConfig(_))
    ));

    let mut split_namespace = Config::new();
    split_namespace.set_namespace("a:b");
    assert!(matches!(
        Schema::with_config(split_namespace),
        Err(DefinitionError::InvalidConfig(_))
    ));
}

#[test]
fn test_rejected_configure_keeps_previous_config() {
    let mut schema = Schema::new();
    schema
        .configure(|config| {
            config.set_namespace("app");
        })
        .unwrap();
    schema.load(users_loader).unwrap();

    let result = schema.configure(|config| {
        config.set_namespace_delimiter("");
    });
    assert!(matches!(result, Err(DefinitionError::InvalidConfig(_))));
    assert_eq!(schema.config().namespace(), Some("app"));
    assert_eq!(schema.config().namespace_delimiter(), ":");

    let alice = UserProxy::new(Object::new("alice")).grant("app:users.edit");
    assert!(schema
        .can("app:users.edit", &alice, &Object::none(), CheckMode::Strict)
        .unwrap());
}
