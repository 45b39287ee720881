use micro_orm::{DatabaseValue, FluentQuery, OrderDirection, QueryOperator, Select};

#[test]
fn test_full_clause_order() {
    let query = Select::columns(&["u.role", "count(*) AS total"], "users")
        .join("teams t", "t.id", "u.team_id")
        .where_("u.active", QueryOperator::Equal, true)
        .group_by(&["u.role"])
        .having("count(*)", QueryOperator::GreaterThan, 5i64)
        .order_by("total", OrderDirection::Desc)
        .limit(10)
        .offset(20);

    assert_eq!(
        query.to_sql(),
        "SELECT u.role, count(*) AS total FROM users INNER JOIN teams t ON t.id = u.team_id \
         WHERE u.active = :p0 GROUP BY u.role HAVING count(*) > :p1 ORDER BY total DESC \
         LIMIT 10 OFFSET 20"
    );
    assert_eq!(
        query.bindings().pairs(),
        vec![
            (":p0", &DatabaseValue::Bool(true)),
            (":p1", &DatabaseValue::Int64(5)),
        ]
    );
}

#[test]
fn test_placeholders_are_unique_across_clauses() {
    let query = Select::from_table("orders")
        .where_("status", "=", "open")
        .and_where("total", ">=", 100i64)
        .or_where("priority", "=", true)
        .group_by(&["customer_id"])
        .having("sum(total)", ">", 1000i64)
        .and_having("count(*)", "<", 50i64);

    let placeholders: Vec<&str> = query.bindings().placeholders().collect();
    assert_eq!(placeholders, vec![":p0", ":p1", ":p2", ":p3", ":p4"]);
    assert!(query.to_sql().ends_with("HAVING sum(total) > :p3 AND count(*) < :p4"));
}

#[test]
fn test_branches_share_nothing() {
    let grouped = Select::from_table("orders")
        .where_("status", "=", "paid")
        .group_by(&["customer_id"]);

    let big = grouped.having("sum(total)", ">", 1000i64);
    let frequent = grouped.having("count(*)", ">", 10i64);

    assert_eq!(
        big.to_sql(),
        "SELECT * FROM orders WHERE status = :p0 GROUP BY customer_id HAVING sum(total) > :p1"
    );
    assert_eq!(
        frequent.to_sql(),
        "SELECT * FROM orders WHERE status = :p0 GROUP BY customer_id HAVING count(*) > :p1"
    );
    assert_eq!(big.bindings().get(":p1").map(|e| &e.value), Some(&DatabaseValue::Int64(1000)));
    assert_eq!(frequent.bindings().get(":p1").map(|e| &e.value), Some(&DatabaseValue::Int64(10)));

    // the ancestor is untouched
    assert_eq!(grouped.bindings().len(), 1);
    assert_eq!(
        grouped.to_sql(),
        "SELECT * FROM orders WHERE status = :p0 GROUP BY customer_id"
    );
}

#[test]
fn test_pagination_from_any_stage() {
    assert_eq!(
        Select::from_table("posts").paginate(20, 3).to_sql(),
        "SELECT * FROM posts LIMIT 20 OFFSET 40"
    );
    assert_eq!(
        Select::from_aliased("posts", "p")
            .order_by("p.created_at", OrderDirection::Desc)
            .paginate(20, 0)
            .to_sql(),
        "SELECT * FROM posts AS p ORDER BY p.created_at DESC LIMIT 20 OFFSET 0"
    );
}

#[test]
fn test_display_matches_sql() {
    let query = Select::from_table("users").left_join("profiles", "profiles.user_id", "users.id");
    assert_eq!(
        query.to_string(),
        "SELECT * FROM users LEFT JOIN profiles ON profiles.user_id = users.id"
    );
}

#[test]
fn test_named_pn_placeholder_does_not_collide() {
    let query = Select::from_table("users")
        .where_param("a", "=", "p0", 1i64)
        .and_where("b", "=", 2i64)
        .and_where("c", "=", 3i64);

    assert_eq!(
        query.to_sql(),
        "SELECT * FROM users WHERE a = :p0 AND b = :p1 AND c = :p2"
    );
    assert_eq!(
        query.bindings().pairs(),
        vec![
            (":p0", &DatabaseValue::Int64(1)),
            (":p1", &DatabaseValue::Int64(2)),
            (":p2", &DatabaseValue::Int64(3)),
        ]
    );
    assert!(query.validate().is_ok());
}

#[test]
fn test_named_placeholder_taking_a_used_pn_is_rejected() {
    let query = Select::from_table("users")
        .where_("a", "=", 1i64)
        .and_where_param("b", "=", ":p0", 2i64);

    assert_eq!(query.to_sql(), "SELECT * FROM users WHERE a = :p0 AND b = :p0");
    assert_eq!(query.bindings().len(), 1);
    assert!(query.validate().is_err());
}
