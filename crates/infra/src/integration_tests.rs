//! Integration tests for the allocation pipeline over the in-memory backend.
//!
//! Tests: AllocationService → UnitOfWork → BatchRepository → InMemoryBatchStore
//!
//! Verifies:
//! - The four allocation outcomes end to end
//! - Successful calls commit, failed calls leave the store untouched
//! - Unit-of-work scoping (rollback on drop, read-your-writes, version checks)

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use allocation_inventory::{Batch, OrderLine};

    use crate::allocation_service::{AllocationError, AllocationService};
    use crate::repository::{BatchFilter, BatchRepository, InMemoryBatchStore, RepositoryError};
    use crate::unit_of_work::{InMemoryUnitOfWorkFactory, UnitOfWork, UnitOfWorkFactory};

    fn setup() -> (AllocationService<InMemoryUnitOfWorkFactory>, Arc<InMemoryBatchStore>) {
        let store = InMemoryBatchStore::arc();
        let service = AllocationService::new(InMemoryUnitOfWorkFactory::new(store.clone()));
        (service, store)
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    async fn committed_batch(store: &Arc<InMemoryBatchStore>, reference: &str) -> Batch {
        let mut uow = InMemoryUnitOfWorkFactory::new(store.clone()).begin().await.unwrap();
        uow.batches().find_by_id(reference).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn allocate_without_batches_reports_no_batches_available() {
        let (service, store) = setup();

        let err = service.allocate("o1", "SKU1", 10).await.unwrap_err();

        assert_eq!(err, AllocationError::NoBatchesAvailable);
        assert_eq!(err.to_string(), "No batches available");
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn allocate_unknown_sku_reports_invalid_sku() {
        let (service, _store) = setup();
        service.add_batch("b1", "SKU-A", 100, None).await.unwrap();

        let err = service.allocate("o1", "SKU-B", 5).await.unwrap_err();

        assert_eq!(err, AllocationError::InvalidSku("SKU-B".to_string()));
        assert_eq!(err.to_string(), "Invalid SKU: SKU-B");
    }

    #[tokio::test]
    async fn allocate_more_than_available_reports_out_of_stock() {
        let (service, store) = setup();
        service.add_batch("b1", "SKU-A", 9, None).await.unwrap();

        let err = service.allocate("o1", "SKU-A", 10).await.unwrap_err();

        assert_eq!(err, AllocationError::OutOfStock);
        assert_eq!(err.to_string(), "Out of stock");
        assert_eq!(committed_batch(&store, "b1").await.available_quantity(), 9);
    }

    #[tokio::test]
    async fn allocate_prefers_earlier_batch() {
        let (service, store) = setup();
        service.add_batch("early", "SKU-A", 100, date(2011, 1, 1)).await.unwrap();
        service.add_batch("late", "SKU-A", 100, date(2011, 1, 2)).await.unwrap();

        let reference = service.allocate("o1", "SKU-A", 3).await.unwrap();

        assert_eq!(reference, "early");
        assert_eq!(committed_batch(&store, "early").await.available_quantity(), 97);
        assert_eq!(committed_batch(&store, "late").await.available_quantity(), 100);
    }

    #[tokio::test]
    async fn successful_allocation_commits_exactly_once() {
        let (service, store) = setup();
        service.add_batch("b1", "LAMP", 20, None).await.unwrap();
        let before = store.commit_count();

        service.allocate("o1", "LAMP", 2).await.unwrap();

        assert_eq!(store.commit_count(), before + 1);
        let batch = committed_batch(&store, "b1").await;
        assert!(batch.is_allocated(&OrderLine::new("o1", "LAMP", 2).unwrap()));
        assert_eq!(batch.version(), 1);
    }

    #[tokio::test]
    async fn failed_allocations_leave_store_unchanged() {
        let (service, store) = setup();
        service.add_batch("b1", "LAMP", 5, None).await.unwrap();
        let before_commits = store.commit_count();
        let before = store.committed().unwrap();

        assert!(service.allocate("o1", "CHAIR", 1).await.is_err());
        assert!(service.allocate("o1", "LAMP", 6).await.is_err());
        assert!(matches!(
            service.allocate("", "LAMP", 1).await,
            Err(AllocationError::Validation(_))
        ));

        assert_eq!(store.commit_count(), before_commits);
        let after = store.committed().unwrap();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].available_quantity(), before[0].available_quantity());
        assert_eq!(after[0].version(), before[0].version());
    }

    #[tokio::test]
    async fn allocating_same_line_twice_deducts_once() {
        let (service, store) = setup();
        service.add_batch("b1", "DESK", 10, None).await.unwrap();

        assert_eq!(service.allocate("o1", "DESK", 4).await.unwrap(), "b1");
        assert_eq!(service.allocate("o1", "DESK", 4).await.unwrap(), "b1");

        assert_eq!(committed_batch(&store, "b1").await.available_quantity(), 6);
    }

    #[tokio::test]
    async fn reallocating_held_line_keeps_holder_when_it_is_full() {
        let (service, store) = setup();
        service.add_batch("b1", "DESK", 10, None).await.unwrap();
        service.add_batch("b2", "DESK", 100, None).await.unwrap();
        service.allocate("o1", "DESK", 4).await.unwrap();
        service.allocate("o2", "DESK", 5).await.unwrap();

        assert_eq!(service.allocate("o1", "DESK", 4).await.unwrap(), "b1");

        assert_eq!(committed_batch(&store, "b1").await.available_quantity(), 1);
        let spare = committed_batch(&store, "b2").await;
        assert_eq!(spare.available_quantity(), 100);
        assert_eq!(spare.version(), 0);
    }

    #[tokio::test]
    async fn reallocating_held_line_ignores_newer_preferred_batch() {
        let (service, store) = setup();
        service.add_batch("shipment", "DESK", 10, date(2030, 1, 1)).await.unwrap();
        assert_eq!(service.allocate("o1", "DESK", 3).await.unwrap(), "shipment");
        service.add_batch("warehouse", "DESK", 10, None).await.unwrap();

        assert_eq!(service.allocate("o1", "DESK", 3).await.unwrap(), "shipment");

        assert_eq!(committed_batch(&store, "shipment").await.available_quantity(), 7);
        assert_eq!(committed_batch(&store, "warehouse").await.available_quantity(), 10);
    }

    #[tokio::test]
    async fn add_batch_rejects_duplicate_reference() {
        let (service, store) = setup();
        service.add_batch("b1", "LAMP", 10, None).await.unwrap();

        let err = service.add_batch("b1", "CHAIR", 5, None).await.unwrap_err();

        assert!(matches!(err, AllocationError::Storage(RepositoryError::Duplicate(_))));
        assert!(!err.is_domain_failure());
        assert_eq!(store.commit_count(), 1);
        assert_eq!(committed_batch(&store, "b1").await.sku(), "LAMP");
    }

    #[tokio::test]
    async fn add_batch_rejects_invalid_input() {
        let (service, store) = setup();

        let err = service.add_batch("b1", "LAMP", 0, None).await.unwrap_err();

        assert!(matches!(err, AllocationError::Validation(_)));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn list_batches_returns_committed_state_sorted() {
        let (service, store) = setup();
        service.add_batch("b2", "LAMP", 10, None).await.unwrap();
        service.add_batch("b1", "LAMP", 10, date(2024, 1, 1)).await.unwrap();
        let commits = store.commit_count();

        let batches = service.list_batches().await.unwrap();

        let references: Vec<&str> = batches.iter().map(Batch::reference).collect();
        assert_eq!(references, vec!["b1", "b2"]);
        assert_eq!(store.commit_count(), commits);
    }

    #[tokio::test]
    async fn dropping_unit_of_work_rolls_back() {
        let store = InMemoryBatchStore::arc();
        let factory = InMemoryUnitOfWorkFactory::new(store.clone());

        {
            let mut uow = factory.begin().await.unwrap();
            uow.batches()
                .save(Batch::new("b1", "LAMP", 10, None).unwrap())
                .await
                .unwrap();
        }

        let mut uow = factory.begin().await.unwrap();
        assert_eq!(uow.batches().find_by_id("b1").await.unwrap(), None);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn explicit_rollback_discards_staged_writes() {
        let store = InMemoryBatchStore::arc();
        let factory = InMemoryUnitOfWorkFactory::new(store.clone());

        let mut uow = factory.begin().await.unwrap();
        uow.batches()
            .save(Batch::new("b1", "LAMP", 10, None).unwrap())
            .await
            .unwrap();
        uow.rollback().await.unwrap();

        assert!(store.committed().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_see_own_staged_writes_only() {
        let store = InMemoryBatchStore::arc();
        let factory = InMemoryUnitOfWorkFactory::new(store.clone());

        let mut writer = factory.begin().await.unwrap();
        writer
            .batches()
            .save(Batch::new("b1", "LAMP", 10, None).unwrap())
            .await
            .unwrap();

        let found = writer.batches().find_by(&BatchFilter::sku("LAMP")).await.unwrap();
        assert_eq!(found.reference(), "b1");

        let mut reader = factory.begin().await.unwrap();
        assert!(reader.batches().find_all().await.unwrap().is_empty());

        writer.commit().await.unwrap();
        assert_eq!(reader.batches().find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_by_requires_exactly_one_match() {
        let (service, store) = setup();
        service.add_batch("b1", "LAMP", 10, None).await.unwrap();
        service.add_batch("b2", "LAMP", 10, None).await.unwrap();

        let mut uow = InMemoryUnitOfWorkFactory::new(store).begin().await.unwrap();

        assert!(matches!(
            uow.batches().find_by(&BatchFilter::sku("LAMP")).await,
            Err(RepositoryError::MultipleResults { count: 2, .. })
        ));
        assert!(matches!(
            uow.batches().find_by(&BatchFilter::sku("CHAIR")).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stale_update_is_rejected_at_commit() {
        let (service, store) = setup();
        service.add_batch("b1", "LAMP", 10, None).await.unwrap();
        let factory = InMemoryUnitOfWorkFactory::new(store.clone());

        let mut first = factory.begin().await.unwrap();
        let mut second = factory.begin().await.unwrap();

        let mut a = first.batches().find_by_id("b1").await.unwrap().unwrap();
        let mut b = second.batches().find_by_id("b1").await.unwrap().unwrap();
        a.allocate(OrderLine::new("o1", "LAMP", 6).unwrap());
        b.allocate(OrderLine::new("o2", "LAMP", 6).unwrap());

        first.batches().update(&a).await.unwrap();
        second.batches().update(&b).await.unwrap();

        first.commit().await.unwrap();
        assert_eq!(
            second.commit().await,
            Err(RepositoryError::Concurrency(
                "batch b1: conflict: expected version 0, found 1".to_string()
            ))
        );

        assert_eq!(committed_batch(&store, "b1").await.available_quantity(), 4);
    }

    #[tokio::test]
    async fn update_with_stale_version_fails_immediately() {
        let (service, store) = setup();
        service.add_batch("b1", "LAMP", 10, None).await.unwrap();
        let stale = committed_batch(&store, "b1").await;
        service.allocate("o1", "LAMP", 1).await.unwrap();

        let mut uow = InMemoryUnitOfWorkFactory::new(store).begin().await.unwrap();
        assert_eq!(
            uow.batches().update(&stale).await,
            Err(RepositoryError::Concurrency(
                "batch b1: conflict: expected version 0, found 1".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn update_of_unknown_batch_is_not_found() {
        let store = InMemoryBatchStore::arc();
        let mut uow = InMemoryUnitOfWorkFactory::new(store).begin().await.unwrap();

        let ghost = Batch::new("ghost", "LAMP", 10, None).unwrap();
        assert_eq!(
            uow.batches().update(&ghost).await,
            Err(RepositoryError::NotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn shared_factory_through_arc() {
        let store = InMemoryBatchStore::arc();
        let factory = Arc::new(InMemoryUnitOfWorkFactory::new(store.clone()));
        let service = AllocationService::new(factory);

        service.add_batch("b1", "LAMP", 10, None).await.unwrap();
        assert_eq!(service.allocate("o1", "LAMP", 1).await.unwrap(), "b1");
        assert_eq!(store.commit_count(), 2);
    }
}
