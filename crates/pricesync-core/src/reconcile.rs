//! Insert-or-update of daily records against a persisted store.
//!
//! Every call runs inside one unit of work: either all writes become visible
//! together or none of them do.

use serde::Serialize;
use thiserror::Error;

use pricesync_warehouse::{DailyBatch, Warehouse, WarehouseError};

use crate::domain::{volume_to_sql, DailyRecord, Symbol, TradingDate};
use crate::ValidationError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error("invalid record: {0}")]
    InvalidRow(#[from] ValidationError),
    #[error("{0}")]
    Backend(String),
}

/// Storage operations available inside one unit of work.
///
/// Lookups observe writes made earlier in the same unit. Dropping a unit
/// without calling [`UnitOfWork::commit`] discards its writes.
pub trait UnitOfWork {
    fn find_by_key(
        &mut self,
        symbol: &Symbol,
        date: TradingDate,
    ) -> Result<Option<DailyRecord>, StoreError>;

    fn insert(&mut self, record: &DailyRecord) -> Result<(), StoreError>;

    fn update_fields(
        &mut self,
        existing: &DailyRecord,
        open_price: f64,
        close_price: f64,
        volume: u64,
    ) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>;
}

/// A handle that can open units of work.
pub trait DailyStore {
    type Unit<'a>: UnitOfWork
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Unit<'_>, StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub inserted: usize,
    pub updated: usize,
}

/// Insert records whose `(symbol, date)` is new and overwrite price and
/// volume of those already stored. Nothing is ever deleted.
///
/// Duplicate keys within `records` resolve in input order, so the last one
/// wins.
pub fn reconcile<S>(store: &S, records: &[DailyRecord]) -> Result<ReconciliationResult, StoreError>
where
    S: DailyStore + ?Sized,
{
    let mut unit = store.begin()?;
    let mut result = ReconciliationResult::default();

    for record in records {
        match unit.find_by_key(&record.symbol, record.date)? {
            Some(existing) => {
                unit.update_fields(
                    &existing,
                    record.open_price,
                    record.close_price,
                    record.volume,
                )?;
                result.updated += 1;
            }
            None => {
                unit.insert(record)?;
                result.inserted += 1;
            }
        }
    }

    unit.commit()?;
    Ok(result)
}

impl UnitOfWork for DailyBatch {
    fn find_by_key(
        &mut self,
        symbol: &Symbol,
        date: TradingDate,
    ) -> Result<Option<DailyRecord>, StoreError> {
        self.find(symbol.as_str(), &date.to_string())?
            .map(DailyRecord::try_from)
            .transpose()
            .map_err(StoreError::from)
    }

    fn insert(&mut self, record: &DailyRecord) -> Result<(), StoreError> {
        DailyBatch::insert(self, &record.to_row()?)?;
        Ok(())
    }

    fn update_fields(
        &mut self,
        existing: &DailyRecord,
        open_price: f64,
        close_price: f64,
        volume: u64,
    ) -> Result<(), StoreError> {
        self.update_prices(
            existing.symbol.as_str(),
            &existing.date.to_string(),
            open_price,
            close_price,
            volume_to_sql(volume)?,
        )?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        DailyBatch::commit(self)?;
        Ok(())
    }
}

impl DailyStore for Warehouse {
    type Unit<'a> = DailyBatch;

    fn begin(&self) -> Result<DailyBatch, StoreError> {
        Ok(self.begin_daily_batch()?)
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use pricesync_warehouse::{DailyFilter, WarehouseConfig};

    fn record(date: &str, open_price: f64, close_price: f64, volume: u64) -> DailyRecord {
        DailyRecord::new(
            Symbol::parse("IBM").expect("symbol"),
            TradingDate::parse(date).expect("date"),
            open_price,
            close_price,
            volume,
        )
        .expect("record")
    }

    #[test]
    fn partitions_input_into_inserts_and_updates() {
        let d2 = record("2024-03-02", 2.0, 2.0, 2);
        let store = MemoryStore::with_records(&[record("2024-03-01", 1.0, 1.0, 1), d2.clone()]);

        let result = reconcile(
            &store,
            &[record("2024-03-01", 10.0, 11.0, 12), record("2024-03-03", 3.0, 3.0, 3)],
        )
        .expect("reconcile");

        assert_eq!(result, ReconciliationResult { inserted: 1, updated: 1 });
        let stored = store.snapshot();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0], record("2024-03-01", 10.0, 11.0, 12));
        assert_eq!(stored[1], d2);
    }

    #[test]
    fn second_run_updates_everything_and_changes_nothing() {
        let store = MemoryStore::default();
        let batch = [record("2024-03-01", 1.0, 1.0, 1), record("2024-03-02", 2.0, 2.0, 2)];

        let first = reconcile(&store, &batch).expect("first run");
        let after_first = store.snapshot();
        let second = reconcile(&store, &batch).expect("second run");

        assert_eq!(first, ReconciliationResult { inserted: 2, updated: 0 });
        assert_eq!(second, ReconciliationResult { inserted: 0, updated: 2 });
        assert_eq!(store.snapshot(), after_first);
    }

    #[test]
    fn duplicate_keys_in_one_call_resolve_last_write_wins() {
        let store = MemoryStore::default();

        let result = reconcile(
            &store,
            &[record("2024-03-01", 1.0, 1.0, 1), record("2024-03-01", 9.0, 9.0, 9)],
        )
        .expect("reconcile");

        assert_eq!(result, ReconciliationResult { inserted: 1, updated: 1 });
        assert_eq!(store.snapshot(), [record("2024-03-01", 9.0, 9.0, 9)]);
    }

    #[test]
    fn failed_write_discards_the_whole_unit() {
        let store = MemoryStore::failing_on_write(1);

        let error = reconcile(
            &store,
            &[record("2024-03-01", 1.0, 1.0, 1), record("2024-03-02", 2.0, 2.0, 2)],
        )
        .expect_err("second write fails");

        assert!(matches!(error, StoreError::Backend(_)));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn reconciles_against_the_warehouse() {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse");

        let first = reconcile(&warehouse, &[record("2024-03-01", 1.0, 1.0, 1)]).expect("first");
        let second = reconcile(
            &warehouse,
            &[record("2024-03-01", 5.0, 6.0, 7), record("2024-03-04", 4.0, 4.0, 4)],
        )
        .expect("second");

        assert_eq!(first, ReconciliationResult { inserted: 1, updated: 0 });
        assert_eq!(second, ReconciliationResult { inserted: 1, updated: 1 });

        let page = warehouse
            .query_daily(&DailyFilter::default(), 10, 0)
            .expect("query");
        assert_eq!(page.total, 2);
        assert_eq!(page.rows[0].open_price, 5.0);
        assert_eq!(page.rows[0].volume, 7);
    }
}
