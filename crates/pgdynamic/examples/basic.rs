//! Basic usage example for pgdynamic
//!
//! Run with: cargo run --example basic -p pgdynamic
//!
//! Set PG_HOST, PG_PORT, PG_DATABASE, PG_USER and PG_PASSWORD in a .env file
//! or the environment.

use pgdynamic::{
    Condition, ConnectionConfig, DeleteQuery, Direction, Executor, Filter, InsertQuery, Join,
    Operator, Page, PgdError, SelectQuery, TableRef, TransactionHandle, UpdateQuery,
};

#[tokio::main]
async fn main() -> Result<(), PgdError> {
    // Load .env file
    dotenvy::dotenv().ok();

    let executor = Executor::new(ConnectionConfig::from_env()?);
    let session = executor.session().await?;

    // Setup
    session
        .client()
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS employees (
                id BIGINT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT,
                hired_at TIMESTAMP NOT NULL DEFAULT now()
            );
            CREATE TABLE IF NOT EXISTS salaries (
                emp_id BIGINT NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
                amount BIGINT NOT NULL
            );
            DELETE FROM employees;",
        )
        .await?;

    // Insert several rows, commit once.
    for (id, first, last, amount) in [
        (1_i64, "Harrison", "Ford", 900_i64),
        (2, "Carrie", "Fisher", 800),
        (3, "Mark", "Hamill", 850),
    ] {
        let employee = InsertQuery::new("employees")
            .set("id", id)
            .set("first_name", first)
            .set("last_name", last);
        pgdynamic::insert(&session, &employee, false).await?;

        let salary = InsertQuery::new("salaries").set("emp_id", id).set("amount", amount);
        pgdynamic::insert(&session, &salary, false).await?;
    }
    session.commit().await?;

    // select-one
    let one = executor
        .fetch_one(&SelectQuery::new("employees").filter(Condition::eq("id", 1)))
        .await?;
    println!("select-one: {}", serde_json::to_string(&one).unwrap_or_default());

    // select-many with a join, ordering and a page
    let page = executor
        .fetch_all(
            &SelectQuery::new(TableRef::new("employees").alias("emp"))
                .columns(&["emp.id", "emp.first_name", "sal.amount"])
                .join(Join::inner("salaries", "sal", "emp.id = sal.emp_id"))
                .filter(Condition::new("sal.amount", Operator::GreaterEqual, 800))
                .order_by("sal.amount", Direction::Desc)
                .page(Page::of(2, 1)?),
        )
        .await?;
    println!("select-many: {}", serde_json::to_string(&page).unwrap_or_default());

    // count with an array-bound IN
    let count = executor
        .count(&SelectQuery::new("employees").filter(Condition::in_list("id", [1, 3])))
        .await?;
    println!("count: {}", serde_json::to_string(&count).unwrap_or_default());

    // update + delete in one commit
    pgdynamic::update(
        &session,
        &UpdateQuery::new("employees")
            .set("last_name", "Solo")
            .filter(Filter::new(Condition::eq("id", 1))),
        false,
    )
    .await?;
    pgdynamic::delete(&session, &DeleteQuery::new("employees").filter(Condition::eq("id", 2)), true)
        .await?;

    session.close().await;
    Ok(())
}
