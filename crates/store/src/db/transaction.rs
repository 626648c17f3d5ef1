pub struct Transaction<'conn> {
    inner: rusqlite::Transaction<'conn>,
}

impl<'conn> Transaction<'conn> {
    pub(super) fn new(inner: rusqlite::Transaction<'conn>) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn commit(self) -> rusqlite::Result<()> {
        self.inner.commit()
    }

    #[inline]
    pub fn prepare_cached(&self, sql: &str) -> rusqlite::Result<rusqlite::CachedStatement<'_>> {
        self.inner.prepare_cached(sql)
    }

    #[inline]
    pub fn last_insert_rowid(&self) -> i64 {
        self.inner.last_insert_rowid()
    }
}
