// SQL schema definitions for the value tables.
//
// Both tables belong to an externally owned `indicator` table. On PostgreSQL
// the cascade foreign key is attached by `PostgresManager::init_tables` when
// that table exists; the local SQLite schema has no indicator table at all.
//
// `timestamp` and `values` are keywords, so they are always quoted.

pub const CREATE_RAW_VALUES_TABLE_PG: &str = r#"
CREATE TABLE IF NOT EXISTS indicatorvalue (
    "timestamp" TIMESTAMPTZ NOT NULL,
    value NUMERIC NOT NULL,
    indicator_id INTEGER NOT NULL,
    CONSTRAINT indicatorvalue_timestamp_indicator_id_pkey PRIMARY KEY ("timestamp", indicator_id)
)
"#;

pub const CREATE_COMPACT_VALUES_TABLE_PG: &str = r#"
CREATE TABLE IF NOT EXISTS indicatorvaluecompact (
    timebucket TIMESTAMPTZ NOT NULL,
    "values" TEXT NOT NULL,
    indicator_id INTEGER NOT NULL,
    CONSTRAINT indicatorvaluecompact_timebucket_indicator_id_pkey PRIMARY KEY (timebucket, indicator_id)
)
"#;

pub const CREATE_INDICES_PG: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS ix_indicatorvalue_indicator_id ON indicatorvalue(indicator_id)",
    "CREATE INDEX IF NOT EXISTS ix_indicatorvaluecompact_timebucket ON indicatorvaluecompact(timebucket)",
    "CREATE INDEX IF NOT EXISTS ix_indicatorvaluecompact_indicator_id ON indicatorvaluecompact(indicator_id)",
];

pub const INDICATOR_TABLE_EXISTS_PG: &str = "SELECT to_regclass('indicator') IS NOT NULL";

pub const ADD_CASCADE_FOREIGN_KEYS_PG: &[&str] = &[
    "ALTER TABLE indicatorvalue
        ADD CONSTRAINT indicatorvalue_indicator_id_fkey
        FOREIGN KEY (indicator_id) REFERENCES indicator(id) ON DELETE CASCADE",
    "ALTER TABLE indicatorvaluecompact
        ADD CONSTRAINT indicatorvaluecompact_indicator_id_fkey
        FOREIGN KEY (indicator_id) REFERENCES indicator(id) ON DELETE CASCADE",
];

pub const UPSERT_RAW_VALUE_PG: &str = r#"
INSERT INTO indicatorvalue ("timestamp", value, indicator_id)
VALUES ($1, $2, $3)
ON CONFLICT ON CONSTRAINT indicatorvalue_timestamp_indicator_id_pkey
DO UPDATE SET value = EXCLUDED.value
"#;

// The append happens inside the conflict clause, so concurrent writers to
// the same row are serialized by the row lock and no segment is lost.
pub const INSERT_OR_APPEND_COMPACT_PG: &str = r#"
INSERT INTO indicatorvaluecompact (timebucket, "values", indicator_id)
VALUES ($1, $2, $3)
ON CONFLICT ON CONSTRAINT indicatorvaluecompact_timebucket_indicator_id_pkey
DO UPDATE SET "values" = indicatorvaluecompact."values" || EXCLUDED."values"
"#;

pub const SELECT_COMPACT_BUCKET_PG: &str = r#"
SELECT timebucket, "values", indicator_id
FROM indicatorvaluecompact
WHERE timebucket = $1 AND indicator_id = $2
"#;

pub const SELECT_RAW_VALUE_PG: &str = r#"
SELECT "timestamp", value, indicator_id
FROM indicatorvalue
WHERE "timestamp" = $1 AND indicator_id = $2
"#;

// SQLite keeps timestamps as RFC 3339 text and decimals as text so that no
// precision is lost to REAL affinity.

pub const CREATE_RAW_VALUES_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS indicatorvalue (
    "timestamp" TEXT NOT NULL,
    value TEXT NOT NULL,
    indicator_id INTEGER NOT NULL,
    PRIMARY KEY ("timestamp", indicator_id)
)
"#;

pub const CREATE_COMPACT_VALUES_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS indicatorvaluecompact (
    timebucket TEXT NOT NULL,
    "values" TEXT NOT NULL,
    indicator_id INTEGER NOT NULL,
    PRIMARY KEY (timebucket, indicator_id)
)
"#;

pub const CREATE_INDICES_SQLITE: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS ix_indicatorvalue_indicator_id ON indicatorvalue(indicator_id)",
    "CREATE INDEX IF NOT EXISTS ix_indicatorvaluecompact_indicator_id ON indicatorvaluecompact(indicator_id)",
];

pub const UPSERT_RAW_VALUE_SQLITE: &str = r#"
INSERT INTO indicatorvalue ("timestamp", value, indicator_id)
VALUES (?1, ?2, ?3)
ON CONFLICT ("timestamp", indicator_id)
DO UPDATE SET value = excluded.value
"#;

pub const INSERT_OR_APPEND_COMPACT_SQLITE: &str = r#"
INSERT INTO indicatorvaluecompact (timebucket, "values", indicator_id)
VALUES (?1, ?2, ?3)
ON CONFLICT (timebucket, indicator_id)
DO UPDATE SET "values" = indicatorvaluecompact."values" || excluded."values"
"#;

pub const SELECT_COMPACT_BUCKET_SQLITE: &str = r#"
SELECT timebucket, "values", indicator_id
FROM indicatorvaluecompact
WHERE timebucket = ?1 AND indicator_id = ?2
"#;

pub const SELECT_RAW_VALUE_SQLITE: &str = r#"
SELECT "timestamp", value, indicator_id
FROM indicatorvalue
WHERE "timestamp" = ?1 AND indicator_id = ?2
"#;
