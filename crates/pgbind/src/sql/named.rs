use super::builder::Sql;
use regex::Regex;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Quoted spans and `::` casts match without a capture and are copied as is.
    RE.get_or_init(|| {
        Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|::|:([A-Za-z_][A-Za-z0-9_]*)"#)
            .expect("valid placeholder regex")
    })
}

/// Build an [`Sql`] from a template using `:name` placeholders.
///
/// Each `:name` becomes a named placeholder (see [`Sql::push_arg`]); repeated
/// names become separate slots. PostgreSQL casts such as `created_at::date`
/// are left untouched, as is anything inside `'...'` literals or `"..."`
/// identifiers (doubled quotes included). Dollar-quoted bodies and comments
/// are not recognised. Adjacent placeholders need no separator: `:a:b` is two
/// placeholders.
///
/// ```ignore
/// let q = pgbind::named("UPDATE users SET name = :name WHERE id = :id");
/// assert_eq!(q.to_sql(), "UPDATE users SET name = $1 WHERE id = $2");
/// ```
pub fn named(template: &str) -> Sql {
    let mut q = Sql::empty();
    let mut last = 0;

    for caps in placeholder_regex().captures_iter(template) {
        let Some(name) = caps.get(1) else {
            continue;
        };
        let whole = caps.get(0).map_or(name.start() - 1, |m| m.start());
        q.push(&template[last..whole]);
        q.push_arg(name.as_str());
        last = name.end();
    }

    q.push(&template[last..]);
    q
}
