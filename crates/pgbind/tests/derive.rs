use pgbind::{BindArgs, BindError, Binder, FieldCache, FromRow, Render, ToSql, named};

#[derive(BindArgs)]
pub struct Signup {
    pub user_name: String,
    #[pgbind(rename = "mail")]
    pub email: Option<String>,
    #[pgbind(skip)]
    pub draft: bool,
    internal: u32,
}

#[derive(BindArgs)]
#[pgbind(rename_all = "camelCase")]
pub struct TenantScoped {
    pub user_id: i64,
    #[pgbind(rename = "Tenant")]
    pub tenant_id: i64,
}

#[derive(BindArgs)]
pub struct Page<T: ToSql + Sync + Send + 'static> {
    pub value: T,
    pub limit: i64,
}

#[derive(BindArgs)]
pub struct NoArgs;

#[derive(BindArgs)]
pub struct Keyword {
    pub r#type: String,
}

#[derive(Debug, FromRow)]
#[allow(dead_code)]
struct UserRow {
    id: i64,
    #[pgbind(column = "user_name")]
    name: String,
    email: Option<String>,
}

fn signup() -> Signup {
    Signup {
        user_name: "alice".into(),
        email: Some("alice@example.com".into()),
        draft: true,
        internal: 9,
    }
}

fn shown(values: &[&(dyn ToSql + Sync)]) -> Vec<String> {
    values.iter().map(|v| format!("{v:?}")).collect()
}

#[test]
fn only_public_unskipped_fields_are_bindable() {
    assert_eq!(Signup::field_names(), &["user_name", "mail"]);

    let s = signup();
    assert!(s.draft);
    assert_eq!(s.internal, 9);
    assert_eq!(format!("{:?}", s.field_value(0).unwrap()), "\"alice\"");
    assert!(s.field_value(2).is_none());
}

#[test]
fn rename_all_applies_unless_renamed() {
    assert_eq!(TenantScoped::field_names(), &["userId", "Tenant"]);
}

#[test]
fn raw_identifiers_bind_without_prefix() {
    assert_eq!(Keyword::field_names(), &["type"]);
}

#[test]
fn unit_struct_has_no_fields() {
    assert!(NoArgs::field_names().is_empty());
    assert!(NoArgs.field_value(0).is_none());
}

#[test]
fn generic_struct_binds_its_fields() {
    let cache = FieldCache::new();
    let q = named("SELECT * FROM events WHERE kind = :value LIMIT :limit");
    let binder = Binder::<Page<String>>::new(&q.to_rendered().unwrap().placeholders, &cache)
        .unwrap();

    let page = Page {
        value: "login".to_string(),
        limit: 20,
    };
    assert_eq!(shown(&binder.to_args(&page).unwrap()), vec!["\"login\"", "20"]);
}

#[test]
fn derived_args_feed_placeholders_by_name() {
    let cache = FieldCache::new();
    let q = named("INSERT INTO users (email, user_name) VALUES (:mail, :user_name)");
    let binder =
        Binder::<Signup>::new(&q.to_rendered().unwrap().placeholders, &cache).unwrap();

    assert_eq!(binder.args(), &["mail", "user_name"]);
    assert_eq!(
        shown(&binder.to_args(&signup()).unwrap()),
        vec!["Some(\"alice@example.com\")", "\"alice\""]
    );
}

#[test]
fn skipped_and_private_fields_are_missing() {
    let cache = FieldCache::new();
    for name in ["draft", "internal", "email"] {
        let q = named(&format!("SELECT :{name}"));
        let err = Binder::<Signup>::new(&q.to_rendered().unwrap().placeholders, &cache)
            .unwrap_err();
        assert!(matches!(err, BindError::MissingArg { name: ref n } if n == name));
    }
}

#[test]
fn none_argument_is_nil() {
    let cache = FieldCache::new();
    let q = named("SELECT :user_name");
    let binder =
        Binder::<Option<Signup>>::new(&q.to_rendered().unwrap().placeholders, &cache).unwrap();

    assert!(matches!(
        binder.to_args(&None).unwrap_err(),
        BindError::NilArgument
    ));
    assert_eq!(shown(&binder.to_args(&Some(signup())).unwrap()), vec!["\"alice\""]);
}

#[test]
fn from_row_derive_implements_trait() {
    fn assert_from_row<T: FromRow>() {}
    assert_from_row::<UserRow>();
}

#[derive(BindArgs)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub at: chrono::DateTime<chrono::Utc>,
    pub details: serde_json::Value,
}

#[test]
fn driver_types_bind_through_derive() {
    let cache = FieldCache::new();
    let q = named("INSERT INTO audit (id, at, details) VALUES (:id, :at, :details)");
    let binder =
        Binder::<AuditEntry>::new(&q.to_rendered().unwrap().placeholders, &cache).unwrap();

    let entry = AuditEntry {
        id: uuid::Uuid::new_v4(),
        at: chrono::Utc::now(),
        details: serde_json::json!({ "action": "login" }),
    };
    let values = binder.to_args(&entry).unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(format!("{:?}", values[0]), format!("{:?}", entry.id));
    assert_eq!(format!("{:?}", values[2]), format!("{:?}", entry.details));
}
