use sqlx::PgPool;

/// Entry point for read queries against the alert store.
///
/// Queries are expressed as `kanau::processor::Processor<Query>`
/// implementations on this type, one per query struct.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
