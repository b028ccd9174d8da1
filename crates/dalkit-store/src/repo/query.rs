//! Fluent query composition over a repository
//!
//! Filters, ordering and paging run client-side over the streamed rows of the
//! record's table. Include hints are recorded and logged but do not change
//! the SQL.

use std::cmp::Ordering;

use dalkit_core::errors::invalid_input;
use dalkit_core::Record;

use super::repository::Repository;
use crate::errors::Result;

type Predicate<'q, T> = Box<dyn Fn(&T) -> bool + 'q>;
type Comparator<'q, T> = Box<dyn Fn(&T, &T) -> Ordering + 'q>;

/// Accumulated query intent: filters, one ordering, include hints, paging
pub struct QuerySpec<'q, T> {
    filters: Vec<Predicate<'q, T>>,
    order: Option<Comparator<'q, T>>,
    includes: Vec<String>,
    paging: Option<(usize, usize)>,
}

impl<T> Default for QuerySpec<'_, T> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order: None,
            includes: Vec::new(),
            paging: None,
        }
    }
}

impl<'q, T> QuerySpec<'q, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter; all filters must hold
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + 'q) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Set the ordering, replacing any earlier one
    pub fn order_by(mut self, compare: impl Fn(&T, &T) -> Ordering + 'q) -> Self {
        self.order = Some(Box::new(compare));
        self
    }

    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    /// 1-based page number and page size
    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.paging = Some((page, page_size));
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn paging(&self) -> Option<(usize, usize)> {
        self.paging
    }

    /// Whether `record` passes every filter
    pub fn matches(&self, record: &T) -> bool {
        self.filters.iter().all(|f| f(record))
    }

    /// Stable sort by the configured ordering, if any
    pub fn sort(&self, items: &mut [T]) {
        if let Some(compare) = &self.order {
            items.sort_by(|a, b| compare(a, b));
        }
    }
}

/// Reject page numbers and sizes of zero
///
/// # Errors
/// `InvalidInput` when `page` or `page_size` is zero.
pub fn check_paging(page: usize, page_size: usize) -> Result<()> {
    if page == 0 {
        return Err(invalid_input("page", "page numbers start at 1"));
    }
    if page_size == 0 {
        return Err(invalid_input("page", "page size must be at least 1"));
    }
    Ok(())
}

/// Take one page out of an ordered result
///
/// # Errors
/// `InvalidInput` when `page` or `page_size` is zero.
pub fn page_slice<T>(items: Vec<T>, page: usize, page_size: usize) -> Result<Vec<T>> {
    check_paging(page, page_size)?;
    let skip = (page - 1).saturating_mul(page_size);
    Ok(items.into_iter().skip(skip).take(page_size).collect())
}

/// One page of results plus the unpaged match count
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    /// Number of pages needed for `total_count` items
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Builder started by [`Repository::query`]
pub struct RepositoryQuery<'q, T: Record> {
    repo: &'q Repository<'q, T>,
    spec: QuerySpec<'q, T>,
}

impl<'q, T: Record> RepositoryQuery<'q, T> {
    pub(crate) fn new(repo: &'q Repository<'q, T>) -> Self {
        Self {
            repo,
            spec: QuerySpec::new(),
        }
    }

    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + 'q) -> Self {
        self.spec = self.spec.filter(predicate);
        self
    }

    /// Add a filter only when `condition` holds
    pub fn filter_if(self, condition: bool, predicate: impl Fn(&T) -> bool + 'q) -> Self {
        if condition {
            self.filter(predicate)
        } else {
            self
        }
    }

    pub fn order_by(mut self, compare: impl Fn(&T, &T) -> Ordering + 'q) -> Self {
        self.spec = self.spec.order_by(compare);
        self
    }

    /// Ascending by a derived key
    pub fn order_by_key<K: Ord>(self, key: impl Fn(&T) -> K + 'q) -> Self {
        self.order_by(move |a, b| key(a).cmp(&key(b)))
    }

    /// Descending by a derived key
    pub fn order_by_desc_key<K: Ord>(self, key: impl Fn(&T) -> K + 'q) -> Self {
        self.order_by(move |a, b| key(b).cmp(&key(a)))
    }

    /// Name a related property to load; recorded for diagnostics only
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.spec = self.spec.include(path);
        self
    }

    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.spec = self.spec.page(page, page_size);
        self
    }

    pub fn spec(&self) -> &QuerySpec<'q, T> {
        &self.spec
    }

    /// Run the query
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan, `InvalidInput` for bad paging.
    pub fn get(&self) -> Result<Vec<T>> {
        self.repo.get(&self.spec)
    }

    /// Run the query for one page and report the unpaged total
    ///
    /// # Errors
    /// Same as [`RepositoryQuery::get`].
    pub fn get_page(&self, page: usize, page_size: usize) -> Result<Page<T>> {
        self.repo.get_page(&self.spec, page, page_size)
    }

    /// Number of matching records, ignoring paging
    ///
    /// # Errors
    /// `QueryFailed` or `Mapping` from the scan.
    pub fn count(&self) -> Result<usize> {
        self.repo.count(&self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dalkit_core::errors::DalErrorKind;

    #[test]
    fn test_page_slice_is_one_based() {
        let items: Vec<u32> = (1..=25).collect();

        assert_eq!(page_slice(items.clone(), 1, 10).unwrap(), (1..=10).collect::<Vec<_>>());
        assert_eq!(page_slice(items.clone(), 3, 10).unwrap(), (21..=25).collect::<Vec<_>>());
        assert!(page_slice(items, 4, 10).unwrap().is_empty());
    }

    #[test]
    fn test_page_slice_rejects_zero() {
        let err = page_slice(vec![1], 0, 10).unwrap_err();
        assert_eq!(err.kind(), DalErrorKind::InvalidInput);

        let err = page_slice(vec![1], 1, 0).unwrap_err();
        assert_eq!(err.kind(), DalErrorKind::InvalidInput);
    }

    #[test]
    fn test_spec_filters_are_conjunctive() {
        let spec = QuerySpec::new().filter(|n: &i32| *n > 2).filter(|n: &i32| n % 2 == 0);

        assert!(spec.matches(&4));
        assert!(!spec.matches(&3));
        assert!(!spec.matches(&2));
    }

    #[test]
    fn test_sort_is_stable() {
        let spec = QuerySpec::new().order_by(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));
        let mut items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];

        spec.sort(&mut items);

        assert_eq!(items, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_total_pages() {
        let page = Page {
            items: Vec::<u8>::new(),
            total_count: 25,
            page: 2,
            page_size: 10,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
    }
}
