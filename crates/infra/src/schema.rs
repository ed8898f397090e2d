//! Schema bootstrap for the Postgres backend.
//!
//! Idempotent `CREATE TABLE IF NOT EXISTS` statements, applied at startup.
//! The `requests` and `offices` tables are owned by the upstream system;
//! they are created here as well so a fresh dev database works end to end.

use sqlx::PgPool;

/// Create all tables and constraints if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS stock_levels (
            item_id UUID NOT NULL,
            office_id UUID NOT NULL,
            quantity BIGINT NOT NULL CHECK (quantity >= 0),
            reorder_threshold BIGINT,
            PRIMARY KEY (item_id, office_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            issue_id UUID PRIMARY KEY,
            request_id UUID NOT NULL UNIQUE,
            issued_by UUID NOT NULL,
            issued_at TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS issue_lines (
            issue_id UUID NOT NULL REFERENCES issues (issue_id) ON DELETE CASCADE,
            line_no INT NOT NULL,
            item_id UUID NOT NULL,
            quantity BIGINT NOT NULL CHECK (quantity > 0),
            PRIMARY KEY (issue_id, line_no)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS returns (
            return_id UUID PRIMARY KEY,
            issue_id UUID NOT NULL REFERENCES issues (issue_id),
            returned_by UUID NOT NULL,
            returned_at TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS return_lines (
            return_id UUID NOT NULL REFERENCES returns (return_id) ON DELETE CASCADE,
            line_no INT NOT NULL,
            item_id UUID NOT NULL,
            quantity BIGINT NOT NULL CHECK (quantity > 0),
            PRIMARY KEY (return_id, line_no)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS requests (
            request_id UUID PRIMARY KEY,
            status TEXT NOT NULL,
            office_name TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS offices (
            office_id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            location TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
            actor_id UUID,
            action TEXT NOT NULL,
            payload JSONB NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_returns_issue_id ON returns (issue_id)",
        "CREATE INDEX IF NOT EXISTS idx_audit_logs_action ON audit_logs (action, recorded_at)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
