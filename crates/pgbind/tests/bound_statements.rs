use futures_util::StreamExt;
use pgbind::{
    BindArgs, BindError, BindResult, FromRow, StmtConfig, named, prepare_bound,
    prepare_bound_query, prepare_bound_query_as, sql,
};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_postgres::{Client, NoTls};

#[derive(BindArgs)]
pub struct NewUser {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(BindArgs)]
pub struct ById {
    pub id: i64,
}

#[derive(BindArgs)]
pub struct MinId {
    pub min_id: i64,
}

#[derive(BindArgs)]
pub struct Sleep {
    pub secs: f64,
}

#[derive(Debug, PartialEq, FromRow)]
struct User {
    id: i64,
    name: String,
    email: Option<String>,
}

const CREATE_USERS: &str =
    "CREATE TEMP TABLE pgbind_users (id BIGINT PRIMARY KEY, name TEXT NOT NULL, email TEXT)";

async fn connect(test: &str) -> BindResult<Option<Client>> {
    let _ = dotenvy::dotenv();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };

    let (client, connection) = tokio_postgres::connect(&database_url, NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    Ok(Some(client))
}

fn user(id: i64, name: &str) -> NewUser {
    NewUser {
        id,
        name: name.to_string(),
        email: None,
    }
}

#[tokio::test]
async fn exec_and_fetch_by_name() -> BindResult<()> {
    let Some(client) = connect("exec_and_fetch_by_name").await? else {
        return Ok(());
    };
    client.batch_execute(CREATE_USERS).await?;

    let insert = prepare_bound::<NewUser, _, _>(
        &client,
        &named("INSERT INTO pgbind_users (email, name, id) VALUES (:email, :name, :id)"),
    )
    .await?;
    assert_eq!(insert.binder().args(), &["email", "name", "id"]);

    assert_eq!(insert.exec(&user(1, "alice")).await?, 1);
    let bob = NewUser {
        email: Some("bob@example.com".into()),
        ..user(2, "bob")
    };
    assert_eq!(insert.exec(&bob).await?, 1);

    let by_id = prepare_bound_query::<ById, User, _, _>(
        &client,
        &named("SELECT id, name, email FROM pgbind_users WHERE id = :id"),
    )
    .await?;

    assert_eq!(
        by_id.one(&ById { id: 2 }).await?,
        User {
            id: 2,
            name: "bob".into(),
            email: Some("bob@example.com".into()),
        }
    );
    assert!(by_id.opt(&ById { id: 99 }).await?.is_none());
    assert!(by_id.one(&ById { id: 99 }).await.unwrap_err().is_not_found());

    // Database errors pass through untouched.
    let err = insert.exec(&user(1, "again")).await.unwrap_err();
    assert!(matches!(err, BindError::Query(_)));
    Ok(())
}

#[tokio::test]
async fn all_and_cursor_follow_the_argument() -> BindResult<()> {
    let Some(client) = connect("all_and_cursor_follow_the_argument").await? else {
        return Ok(());
    };
    client.batch_execute(CREATE_USERS).await?;
    client
        .batch_execute("INSERT INTO pgbind_users (id, name) VALUES (1, 'a'), (2, 'b'), (3, 'c')")
        .await?;

    let query = named("SELECT id FROM pgbind_users WHERE id >= :min_id ORDER BY id");
    let ids = prepare_bound_query::<MinId, i64, _, _>(&client, &query).await?;
    assert_eq!(ids.all(&MinId { min_id: 2 }).await?, vec![2, 3]);
    assert!(ids.all(&MinId { min_id: 10 }).await?.is_empty());

    let mut stream = ids.cursor(&MinId { min_id: 1 }).await?;
    let mut streamed = Vec::new();
    while let Some(id) = stream.next().await {
        streamed.push(id?);
    }
    assert_eq!(streamed, vec![1, 2, 3]);

    let set = prepare_bound_query_as::<MinId, i64, BTreeSet<i64>, _, _>(&client, &query).await?;
    assert_eq!(set.all(&MinId { min_id: 3 }).await?, BTreeSet::from([3]));
    Ok(())
}

#[tokio::test]
async fn binding_errors_never_reach_the_server() -> BindResult<()> {
    let Some(client) = connect("binding_errors_never_reach_the_server").await? else {
        return Ok(());
    };

    // The table does not exist: reaching the server would be a Query error.
    let mut q = sql("DELETE FROM pgbind_missing_table WHERE id = ");
    q.push_arg("id").push(" AND name = ").push_bind("x");
    let err = prepare_bound::<ById, _, _>(&client, &q).await.unwrap_err();
    assert!(matches!(err, BindError::NamedArgRequired { .. }));

    let err = prepare_bound::<ById, _, _>(
        &client,
        &named("DELETE FROM pgbind_missing_table WHERE id = :id AND owner = :owner"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BindError::MissingArg { ref name } if name == "owner"));
    assert!(err.is_binding_error());
    Ok(())
}

#[tokio::test]
async fn close_rejects_later_use() -> BindResult<()> {
    let Some(client) = connect("close_rejects_later_use").await? else {
        return Ok(());
    };

    let mut stmt =
        prepare_bound_query::<ById, i64, _, _>(&client, &named("SELECT :id::bigint")).await?;
    assert_eq!(stmt.one(&ById { id: 5 }).await?, 5);

    stmt.close();
    stmt.close();
    assert!(stmt.is_closed());
    assert!(stmt.one(&ById { id: 5 }).await.unwrap_err().is_closed());
    Ok(())
}

#[tokio::test]
async fn in_tx_reprepares_on_the_transaction() -> BindResult<()> {
    let Some(reader) = connect("in_tx_reprepares_on_the_transaction").await? else {
        return Ok(());
    };
    let Some(mut writer) = connect("in_tx_reprepares_on_the_transaction").await? else {
        return Ok(());
    };
    reader.batch_execute(CREATE_USERS).await?;
    writer.batch_execute(CREATE_USERS).await?;

    let insert = prepare_bound::<NewUser, _, _>(
        &reader,
        &named("INSERT INTO pgbind_users (id, name) VALUES (:id, :name)"),
    )
    .await?
    .with_config(StmtConfig::new().tag("tests.insert_user"));

    // Rolled back on error.
    let result: BindResult<()> = pgbind::transaction!(&mut writer, tx, {
        let in_tx = insert.in_tx(&tx).await;
        assert_eq!(in_tx.config().tag.as_deref(), Some("tests.insert_user"));
        in_tx.exec(&user(1, "rolled back")).await?;
        Err(BindError::Other("abort".into()))
    });
    assert!(result.is_err());

    // Committed on success.
    pgbind::transaction!(&mut writer, tx, {
        insert.in_tx(&tx).await.exec(&user(2, "kept")).await?;
        Ok(())
    })?;

    let rows = writer
        .query("SELECT id FROM pgbind_users ORDER BY id", &[])
        .await?;
    let ids: Vec<i64> = rows.iter().map(|r| r.get(0)).collect();
    assert_eq!(ids, vec![2]);

    // The source statement is untouched and still runs on its own connection.
    assert!(!insert.is_closed());
    assert_eq!(insert.exec(&user(3, "reader")).await?, 1);
    Ok(())
}

#[tokio::test]
async fn failed_rebind_surfaces_on_use() -> BindResult<()> {
    let Some(reader) = connect("failed_rebind_surfaces_on_use").await? else {
        return Ok(());
    };
    let Some(mut elsewhere) = connect("failed_rebind_surfaces_on_use").await? else {
        return Ok(());
    };
    // Only the reader's session has the table.
    reader.batch_execute(CREATE_USERS).await?;

    let by_id = prepare_bound_query::<ById, User, _, _>(
        &reader,
        &named("SELECT id, name, email FROM pgbind_users WHERE id = :id"),
    )
    .await?;

    let tx = elsewhere.transaction().await?;
    let in_tx = by_id.in_tx(&tx).await;
    let err = in_tx.opt(&ById { id: 1 }).await.unwrap_err();
    assert!(err.to_string().contains("pgbind_users"), "{err}");
    match err {
        BindError::StatementUnavailable(cause) => match &*cause {
            BindError::Query(db) => {
                assert_eq!(db.code(), Some(&tokio_postgres::error::SqlState::UNDEFINED_TABLE))
            }
            other => panic!("unexpected cause: {other:?}"),
        },
        other => panic!("unexpected error: {other:?}"),
    }
    tx.rollback().await?;

    assert!(by_id.opt(&ById { id: 1 }).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn timeout_cancels_slow_statement() -> BindResult<()> {
    let Some(client) = connect("timeout_cancels_slow_statement").await? else {
        return Ok(());
    };

    let sleep = prepare_bound::<Sleep, _, _>(&client, &named("SELECT pg_sleep(:secs)"))
        .await?
        .with_config(StmtConfig::new().timeout(Duration::from_millis(100)));

    let err = sleep.exec(&Sleep { secs: 5.0 }).await.unwrap_err();
    assert!(err.is_timeout());
    Ok(())
}
