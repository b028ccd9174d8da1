//! Generic repository over one record type
//!
//! Every public operation owns its boundary logging:
//! - `log_op_start!` at entry
//! - `log_op_end!` with `duration_ms` on success
//! - `log_op_error!` with the error kind on failure

use std::sync::Arc;
use std::time::Instant;

use dalkit_core::errors::{not_implemented, DalError, DalErrorKind};
use dalkit_core::{
    log_op_end, log_op_error, log_op_start, mapper_for, Mapper, Record, Statement, TableBinding,
    Value,
};
use tracing::debug;
use uuid::Uuid;

use super::query::{check_paging, page_slice, Page, QuerySpec, RepositoryQuery};
use crate::errors::Result;
use crate::uow::{RowCursor, UnitOfWork};

/// Records of type `T` mapped lazily from a live cursor
///
/// Single pass; only valid inside the closure it was handed to.
pub struct Records<'a, 'stmt, T> {
    cursor: &'a mut RowCursor<'stmt>,
    mapper: &'a Mapper<T>,
}

impl<T: Record> Iterator for Records<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor
            .next()
            .map(|row| row.and_then(|row| self.mapper.map_row(&row)))
    }
}

/// Entity-shaped SQL for `T`, executed through a session
pub struct Repository<'s, T: Record> {
    session: &'s UnitOfWork<'s>,
    mapper: Arc<Mapper<T>>,
    table: TableBinding,
}

impl<'s, T: Record> Repository<'s, T> {
    /// Repository for `T` on `session`
    ///
    /// Tables without an explicit schema take the session's default schema.
    ///
    /// # Errors
    /// `Mapping` if the binding table of `T` is invalid.
    pub fn new(session: &'s UnitOfWork<'s>) -> Result<Self> {
        let mapper = mapper_for::<T>()?;
        let table = T::table().or_schema(session.default_schema());
        Ok(Self {
            session,
            mapper,
            table,
        })
    }

    pub fn session(&self) -> &'s UnitOfWork<'s> {
        self.session
    }

    pub fn table(&self) -> &TableBinding {
        &self.table
    }

    pub fn mapper(&self) -> &Mapper<T> {
        &self.mapper
    }

    /// Whether a row with `id` exists
    ///
    /// # Errors
    /// `QueryFailed` when the count query fails.
    pub fn exists_by_id(&self, id: Uuid) -> Result<bool> {
        self.observe("exists_by_id", Some(id), || self.exists_inner(id))
    }

    /// The record with `id`, or `None`
    ///
    /// # Errors
    /// `QueryFailed` when the query fails, `Mapping` when the row cannot be
    /// mapped.
    pub fn get_by_id(&self, id: Uuid) -> Result<Option<T>> {
        self.observe("get_by_id", Some(id), || {
            self.scan(Statement::select_by_id(&self.table, id), |records| {
                records.next().transpose()
            })
        })
    }

    /// Stream every record of the table through `f`
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan, plus whatever `f` returns.
    pub fn scan_all<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Records<'_, '_, T>) -> Result<R>,
    {
        self.observe("scan_all", None, || {
            self.scan(Statement::select_all(&self.table), f)
        })
    }

    /// Every record of the table
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan.
    pub fn get_all(&self) -> Result<Vec<T>> {
        self.observe("get_all", None, || {
            self.scan(Statement::select_all(&self.table), |records| {
                records.collect()
            })
        })
    }

    /// Records matching `predicate`, filtered in memory
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan.
    pub fn get_all_where(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        self.observe("get_all_where", None, || self.filtered(predicate))
    }

    /// Same as [`Repository::get_all_where`]
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        self.observe("find", None, || self.filtered(predicate))
    }

    /// Whether any record matches; stops reading at the first match
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan.
    pub fn any(&self, predicate: impl Fn(&T) -> bool) -> Result<bool> {
        self.observe("any", None, || {
            self.scan(Statement::select_all(&self.table), |records| {
                for record in records {
                    if predicate(&record?) {
                        return Ok(true);
                    }
                }
                Ok(false)
            })
        })
    }

    /// First matching record
    ///
    /// # Errors
    /// `NotFound` when nothing matches.
    pub fn first(&self, predicate: impl Fn(&T) -> bool) -> Result<T> {
        self.observe("first", None, || {
            self.first_inner(predicate)?
                .ok_or_else(|| self.not_found("first"))
        })
    }

    /// First matching record, or `None`
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan.
    pub fn first_or_default(&self, predicate: impl Fn(&T) -> bool) -> Result<Option<T>> {
        self.observe("first_or_default", None, || self.first_inner(predicate))
    }

    /// Last matching record in table order
    ///
    /// # Errors
    /// `NotFound` when nothing matches.
    pub fn last(&self, predicate: impl Fn(&T) -> bool) -> Result<T> {
        self.observe("last", None, || {
            let found = self.scan(Statement::select_all(&self.table), |records| {
                let mut last = None;
                for record in records {
                    let record = record?;
                    if predicate(&record) {
                        last = Some(record);
                    }
                }
                Ok(last)
            })?;
            found.ok_or_else(|| self.not_found("last"))
        })
    }

    /// Row count of the table
    ///
    /// # Errors
    /// `QueryFailed` when the count query fails.
    pub fn count_all(&self) -> Result<i64> {
        self.observe("count_all", None, || self.count_all_inner())
    }

    /// Insert `entity` with every persisted field
    ///
    /// # Errors
    /// `InsertFailed` on an engine error or when no row is inserted.
    pub fn insert(&self, entity: &T) -> Result<()> {
        self.observe("insert", Some(entity.id()), || self.insert_inner(entity))
    }

    /// Overwrite the row of `entity` with its persisted fields
    ///
    /// # Errors
    /// `UpdateFailed` on an engine error or when no row matches the id.
    pub fn update(&self, entity: &T) -> Result<()> {
        self.observe("update", Some(entity.id()), || self.update_inner(entity))
    }

    /// Delete the row of `entity`; deleting an absent row is not an error
    ///
    /// # Errors
    /// `DeleteFailed` on an engine error.
    pub fn delete(&self, entity: &T) -> Result<()> {
        self.observe("delete", Some(entity.id()), || {
            let affected = self
                .session
                .command_for(Statement::delete(&self.table, entity.id()))?
                .execute()
                .map_err(rekind(DalErrorKind::DeleteFailed))?;
            debug!(entity = %self.mapper.entity_name(), affected, "delete executed");
            Ok(())
        })
    }

    /// Update when a row with the id exists, insert otherwise
    ///
    /// The existence check and the write are separate statements, so a
    /// concurrent writer can slip in between.
    ///
    /// # Errors
    /// The errors of [`Repository::update`] or [`Repository::insert`].
    pub fn add_or_update(&self, entity: &T) -> Result<()> {
        self.observe("add_or_update", Some(entity.id()), || {
            if self.exists_inner(entity.id())? {
                self.update_inner(entity)
            } else {
                self.insert_inner(entity)
            }
        })
    }

    /// Records passing `spec`, ordered and paged as it asks
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan, `InvalidInput` for bad paging.
    pub fn get(&self, spec: &QuerySpec<'_, T>) -> Result<Vec<T>> {
        self.observe("get", None, || {
            let items = self.matching_sorted(spec)?;
            match spec.paging() {
                Some((page, page_size)) => page_slice(items, page, page_size),
                None => Ok(items),
            }
        })
    }

    /// One page of the records passing `spec`, plus the unpaged total
    ///
    /// Paging already set on `spec` is ignored in favour of the arguments.
    ///
    /// # Errors
    /// `InvalidInput` when `page` or `page_size` is zero, otherwise as
    /// [`Repository::get`].
    pub fn get_page(&self, spec: &QuerySpec<'_, T>, page: usize, page_size: usize) -> Result<Page<T>> {
        self.observe("get_page", None, || {
            check_paging(page, page_size)?;
            let total_count = self.count_inner(spec)?;
            let items = page_slice(self.matching_sorted(spec)?, page, page_size)?;
            Ok(Page {
                items,
                total_count,
                page,
                page_size,
            })
        })
    }

    /// Number of records passing `spec`, ignoring paging
    ///
    /// Without filters this is a `SELECT COUNT(*)`.
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan.
    pub fn count(&self, spec: &QuerySpec<'_, T>) -> Result<usize> {
        self.observe("count", None, || self.count_inner(spec))
    }

    /// Map the rows of caller-written SQL into records
    ///
    /// Dotted column aliases such as `[Supplier.Name]` reach nested fields.
    ///
    /// # Errors
    /// `QueryFailed` when the SQL fails, `Mapping` when a row does not fit `T`.
    pub fn query_sql(&self, sql: &str, params: &[(&str, Value)]) -> Result<Vec<T>> {
        self.observe("query_sql", None, || {
            self.scan(raw_statement(sql, params), |records| records.collect())
        })
    }

    /// Run caller-written SQL that returns no rows
    ///
    /// # Errors
    /// `QueryFailed` when the SQL fails.
    pub fn execute_sql(&self, sql: &str, params: &[(&str, Value)]) -> Result<usize> {
        self.observe("execute_sql", None, || {
            self.session.command_for(raw_statement(sql, params))?.execute()
        })
    }

    /// Change tracking is not part of the repository
    ///
    /// # Errors
    /// Always `NotImplemented`.
    pub fn attach(&self, entity: &T) -> Result<()> {
        self.observe("attach", Some(entity.id()), || {
            Err(not_implemented("attach", "change tracking is not supported"))
        })
    }

    /// Change tracking is not part of the repository
    ///
    /// # Errors
    /// Always `NotImplemented`.
    pub fn detach(&self, entity: &T) -> Result<()> {
        self.observe("detach", Some(entity.id()), || {
            Err(not_implemented("detach", "change tracking is not supported"))
        })
    }

    /// Start a fluent query
    pub fn query(&self) -> RepositoryQuery<'_, T> {
        RepositoryQuery::new(self)
    }

    fn exists_inner(&self, id: Uuid) -> Result<bool> {
        let count = self
            .session
            .command_for(Statement::exists_by_id(&self.table, id))?
            .query_count()?;
        Ok(count > 0)
    }

    fn count_all_inner(&self) -> Result<i64> {
        self.session
            .command_for(Statement::count_all(&self.table))?
            .query_count()
    }

    fn insert_inner(&self, entity: &T) -> Result<()> {
        let values = self.mapper.persisted_values(entity)?;
        let affected = self
            .session
            .command_for(Statement::insert(&self.table, values))?
            .execute()
            .map_err(rekind(DalErrorKind::InsertFailed))?;
        if affected == 0 {
            return Err(DalError::new(DalErrorKind::InsertFailed).with_message("no row was inserted"));
        }
        Ok(())
    }

    fn update_inner(&self, entity: &T) -> Result<()> {
        let values = self.mapper.persisted_values(entity)?;
        let statement = Statement::update(&self.table, entity.id(), values).ok_or_else(|| {
            DalError::new(DalErrorKind::UpdateFailed).with_message("record has no columns besides Id")
        })?;
        let affected = self
            .session
            .command_for(statement)?
            .execute()
            .map_err(rekind(DalErrorKind::UpdateFailed))?;
        if affected == 0 {
            return Err(DalError::new(DalErrorKind::UpdateFailed).with_message("no row matches the id"));
        }
        Ok(())
    }

    fn filtered(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        self.scan(Statement::select_all(&self.table), |records| {
            let mut kept = Vec::new();
            for record in records {
                let record = record?;
                if predicate(&record) {
                    kept.push(record);
                }
            }
            Ok(kept)
        })
    }

    fn first_inner(&self, predicate: impl Fn(&T) -> bool) -> Result<Option<T>> {
        self.scan(Statement::select_all(&self.table), |records| {
            for record in records {
                let record = record?;
                if predicate(&record) {
                    return Ok(Some(record));
                }
            }
            Ok(None)
        })
    }

    fn matching_sorted(&self, spec: &QuerySpec<'_, T>) -> Result<Vec<T>> {
        for hint in spec.includes() {
            debug!(
                session_id = %self.session.session_id(),
                entity = %self.mapper.entity_name(),
                include = %hint,
                "include hint recorded; related records are not loaded"
            );
        }
        let mut items = self.filtered(|record| spec.matches(record))?;
        spec.sort(&mut items);
        Ok(items)
    }

    fn count_inner(&self, spec: &QuerySpec<'_, T>) -> Result<usize> {
        if !spec.has_filters() {
            let count = self.count_all_inner()?;
            return Ok(usize::try_from(count).unwrap_or(0));
        }
        self.scan(Statement::select_all(&self.table), |records| {
            let mut count = 0;
            for record in records {
                if spec.matches(&record?) {
                    count += 1;
                }
            }
            Ok(count)
        })
    }

    fn scan<R, F>(&self, statement: Statement, f: F) -> Result<R>
    where
        F: FnOnce(&mut Records<'_, '_, T>) -> Result<R>,
    {
        let mapper: &Mapper<T> = &self.mapper;
        self.session.command_for(statement)?.query_rows(|cursor| {
            let mut records = Records { cursor, mapper };
            f(&mut records)
        })
    }

    fn not_found(&self, op: &str) -> DalError {
        DalError::new(DalErrorKind::NotFound)
            .with_op(op.to_string())
            .with_message("no record matches the predicate")
    }

    fn observe<R>(&self, op: &'static str, record_id: Option<Uuid>, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let session_id = self.session.session_id();
        let entity = self.mapper.entity_name();
        log_op_start!(op, session_id = session_id.as_str(), entity = entity);
        let start = Instant::now();

        let result = f().map_err(|e| {
            let mut e = e
                .with_op(op)
                .with_entity(entity.to_string())
                .with_session_id(session_id.clone());
            if let Some(id) = record_id {
                e = e.with_record_id(id.to_string());
            }
            log_op_error!(
                op,
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                session_id = session_id.as_str(),
                entity = entity
            );
            e
        })?;

        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            session_id = session_id.as_str(),
            entity = entity
        );
        Ok(result)
    }
}

/// Report engine failures of a write under the write's own kind
fn rekind(kind: DalErrorKind) -> impl FnOnce(DalError) -> DalError {
    move |err| {
        if err.kind() == DalErrorKind::QueryFailed {
            err.rekind(kind)
        } else {
            err
        }
    }
}

fn raw_statement(sql: &str, params: &[(&str, Value)]) -> Statement {
    params
        .iter()
        .fold(Statement::new(sql), |stmt, (name, value)| {
            stmt.bind(name, value.clone())
        })
}
