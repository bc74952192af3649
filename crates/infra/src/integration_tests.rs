//! Integration tests across registry, engines and ledger.
//!
//! Tests: CreateUnit -> Accept -> transitions / Reassign -> ActivityLedger
//!
//! Verifies:
//! - Bin occupancy always equals the sum of its units' slots
//! - Failures (scan, legality, ledger) leave units, bins and ledger unchanged
//! - Concurrent operators never overfill a bin

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use chrono::{DateTime, Duration, Utc};

    use solewms_core::{Actor, ExpectedVersion, UnitId};
    use solewms_events::Subscription;
    use solewms_warehouse::{
        ActivityAction, ActivityEntry, ActivityFilter, AllocationReason, Bin, BinCode, NewActivity,
        NewInventoryUnit, ReassignmentRecord, SizeClass, SwapPolicy, UnitAction, UnitState, WarehouseError,
        WarehouseResult,
    };

    use crate::activity_ledger::{ActivityLedger, ActivityPage, InMemoryActivityLedger, Pagination};
    use crate::allocation_engine::AllocationEngine;
    use crate::bin_admin::BinAdmin;
    use crate::bin_registry::BinRegistry;
    use crate::clock::ManualClock;
    use crate::lifecycle::LifecycleTracker;
    use crate::reassignment_engine::ReassignmentEngine;
    use crate::unit_store::UnitStore;

    /// Ledger that can be switched into failure mode.
    #[derive(Debug, Default)]
    struct FlakyLedger {
        inner: InMemoryActivityLedger,
        failing: AtomicBool,
    }

    impl FlakyLedger {
        fn fail(&self, on: bool) {
            self.failing.store(on, Ordering::SeqCst);
        }

        fn check(&self) -> WarehouseResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(WarehouseError::Ledger("disk full".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl ActivityLedger for FlakyLedger {
        fn append(&self, entries: Vec<NewActivity>) -> WarehouseResult<Vec<ActivityEntry>> {
            self.check()?;
            self.inner.append(entries)
        }

        fn append_reassignment(
            &self,
            record: ReassignmentRecord,
            entry: NewActivity,
        ) -> WarehouseResult<ActivityEntry> {
            self.check()?;
            self.inner.append_reassignment(record, entry)
        }

        fn query(&self, filter: &ActivityFilter, pagination: Pagination) -> WarehouseResult<ActivityPage> {
            self.inner.query(filter, pagination)
        }

        fn reassignments(&self, unit_id: Option<&UnitId>) -> WarehouseResult<Vec<ReassignmentRecord>> {
            self.inner.reassignments(unit_id)
        }

        fn subscribe(&self) -> Subscription<ActivityEntry> {
            self.inner.subscribe()
        }
    }

    struct Harness {
        registry: Arc<BinRegistry>,
        units: Arc<UnitStore>,
        ledger: Arc<FlakyLedger>,
        clock: Arc<ManualClock>,
        tracker: LifecycleTracker,
        reassigner: ReassignmentEngine,
        admin: BinAdmin,
    }

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn code(s: &str) -> BinCode {
        BinCode::new(s).unwrap()
    }

    fn id(s: &str) -> UnitId {
        UnitId::new(s).unwrap()
    }

    fn operator() -> Actor {
        Actor::new("Ayesha (Receiving)").unwrap()
    }

    fn setup_with(policy: SwapPolicy) -> Harness {
        let registry = Arc::new(BinRegistry::new());
        let units = Arc::new(UnitStore::new());
        let ledger = Arc::new(FlakyLedger::default());
        let clock = Arc::new(ManualClock::new(test_time()));

        let tracker = LifecycleTracker::new(
            units.clone(),
            registry.clone(),
            AllocationEngine::new(registry.clone(), 3),
            ledger.clone(),
            clock.clone(),
            code("STG-00-01"),
        );
        let reassigner = ReassignmentEngine::new(units.clone(), registry.clone(), ledger.clone(), clock.clone(), policy);
        let admin = BinAdmin::new(registry.clone(), ledger.clone(), clock.clone());

        for (c, size, cap) in [
            ("A-01-01", SizeClass::M, 50),
            ("A-01-02", SizeClass::M, 30),
            ("A-01-05", SizeClass::M, 20),
            ("B-02-01", SizeClass::L, 40),
        ] {
            admin.register_bin(code(c), size, cap, &Actor::system()).unwrap();
        }
        admin.register(Bin::staging(code("STG-00-01"), 100).unwrap(), &Actor::system()).unwrap();

        Harness {
            registry,
            units,
            ledger,
            clock,
            tracker,
            reassigner,
            admin,
        }
    }

    fn setup() -> Harness {
        setup_with(SwapPolicy::default())
    }

    impl Harness {
        fn create(&self, unit_id: &str, size: SizeClass, qty: u32) -> UnitId {
            self.tracker
                .register(
                    NewInventoryUnit {
                        unit_id: id(unit_id),
                        sku: format!("SKU-{unit_id}"),
                        product_name: "Air Jordan 1 Mid".to_string(),
                        size_class: size,
                        quantity: qty,
                        source_ref: "PO-2026-0042".to_string(),
                    },
                    UnitState::Arrived,
                    &operator(),
                )
                .unwrap();
            id(unit_id)
        }

        fn stored(&self, unit_id: &str, size: SizeClass, qty: u32) -> UnitId {
            let uid = self.create(unit_id, size, qty);
            self.tracker.accept(&uid, &operator(), ExpectedVersion::Any).unwrap();
            uid
        }

        fn step(&self, unit_id: &UnitId, action: UnitAction) -> WarehouseResult<UnitState> {
            self.clock.advance(Duration::seconds(1));
            self.tracker
                .transition(unit_id, action, &operator(), ExpectedVersion::Any)
                .map(|u| u.state())
        }

        fn occupied(&self, c: &str) -> u32 {
            self.registry.get(&code(c)).unwrap().occupied()
        }

        fn entries(&self) -> u64 {
            self.ledger
                .query(&ActivityFilter::default(), Pagination::new(1, 0))
                .unwrap()
                .total
        }

        /// Every bin's occupancy equals the sum of the slots its units hold.
        fn assert_slot_accounting(&self) {
            let units = self.units.list().unwrap();
            for bin in self.registry.list().unwrap() {
                let slots: u32 = units
                    .iter()
                    .filter_map(|u| u.assignment())
                    .filter(|a| &a.bin_code == bin.code())
                    .map(|a| a.slot_qty)
                    .sum();
                assert_eq!(bin.occupied(), slots, "bin {}", bin.code());
                assert!(bin.occupied() <= bin.capacity());
            }
        }
    }

    #[test]
    fn accept_fit_stores_and_records_activity() {
        let h = setup();
        let uid = h.create("BP-001", SizeClass::M, 40);
        let decision = h.tracker.accept(&uid, &operator(), ExpectedVersion::Any).unwrap();

        assert_eq!(decision.reason, AllocationReason::Fit);
        assert_eq!(decision.chosen_bin_code, Some(code("A-01-01")));
        assert_eq!(h.occupied("A-01-01"), 40);

        let unit = h.units.get(&uid).unwrap();
        assert_eq!(unit.state(), UnitState::Stored);
        assert_eq!(unit.current_bin_code(), Some(&code("A-01-01")));

        let page = h
            .ledger
            .query(
                &ActivityFilter {
                    unit_id: Some(uid.clone()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .unwrap();
        let mut actions: Vec<ActivityAction> = page.entries.iter().map(|e| e.action).collect();
        actions.reverse();
        assert_eq!(
            actions,
            vec![
                ActivityAction::Arrived,
                ActivityAction::Allocated,
                ActivityAction::Accepted,
                ActivityAction::Stored,
            ]
        );
        h.assert_slot_accounting();
    }

    #[test]
    fn partial_fit_flags_and_pick_releases_only_the_slot() {
        let h = setup();
        let uid = h.create("BP-001", SizeClass::M, 55);
        let decision = h.tracker.accept(&uid, &operator(), ExpectedVersion::Any).unwrap();
        assert_eq!(decision.reason, AllocationReason::PartialFit);
        assert_eq!(decision.overflow_qty, 5);

        let unit = h.units.get(&uid).unwrap();
        assert_eq!(unit.state(), UnitState::Flagged);
        assert_eq!(h.occupied("A-01-01"), 50);

        h.step(&uid, UnitAction::Locate).unwrap();
        h.step(&uid, UnitAction::ConfirmPick { scanned: "SKU-BP-001".into() }).unwrap();
        assert_eq!(h.occupied("A-01-01"), 0);
        h.assert_slot_accounting();
    }

    #[test]
    fn no_fit_then_overflow_assignment_to_staging() {
        let h = setup();
        let uid = h.create("BP-009", SizeClass::XL, 12);
        let decision = h.tracker.accept(&uid, &operator(), ExpectedVersion::Any).unwrap();
        assert_eq!(decision.reason, AllocationReason::NoFit);
        assert_eq!(decision.chosen_bin_code, None);
        assert_eq!(h.units.get(&uid).unwrap().state(), UnitState::Flagged);

        let unit = h.tracker.assign_overflow(&uid, &operator(), ExpectedVersion::Any).unwrap();
        assert_eq!(unit.state(), UnitState::Stored);
        assert_eq!(h.occupied("STG-00-01"), 12);

        // Staging is not a second-chance allocation target.
        assert!(h.tracker.assign_overflow(&uid, &operator(), ExpectedVersion::Any).is_err());
        h.assert_slot_accounting();
    }

    #[test]
    fn archived_or_maintenance_staging_refuses_overflow() {
        let h = setup();
        let uid = h.create("BP-009", SizeClass::XL, 12);
        h.tracker.accept(&uid, &operator(), ExpectedVersion::Any).unwrap();
        let flagged = h.units.get(&uid).unwrap();

        assert!(h.admin.archive(&code("STG-00-01"), &Actor::system()).unwrap());
        let entries = h.entries();
        let err = h
            .tracker
            .assign_overflow(&uid, &operator(), ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, WarehouseError::BinUnavailable { .. }));
        assert_eq!(h.occupied("STG-00-01"), 0);
        assert_eq!(h.units.get(&uid).unwrap(), flagged);
        assert_eq!(h.entries(), entries);

        assert!(h.admin.restore(&code("STG-00-01"), &Actor::system()).unwrap());
        assert!(h.admin.set_maintenance(&code("STG-00-01"), true, &Actor::system()).unwrap());
        assert!(matches!(
            h.tracker.assign_overflow(&uid, &operator(), ExpectedVersion::Any),
            Err(WarehouseError::BinUnavailable { .. })
        ));

        assert!(h.admin.set_maintenance(&code("STG-00-01"), false, &Actor::system()).unwrap());
        let staged = h.tracker.assign_overflow(&uid, &operator(), ExpectedVersion::Any).unwrap();
        assert_eq!(staged.state(), UnitState::Stored);
        assert_eq!(h.occupied("STG-00-01"), 12);
        h.assert_slot_accounting();
    }

    #[test]
    fn full_walkthrough_to_completed() {
        let h = setup();
        let uid = h.stored("BP-001", SizeClass::M, 10);
        for action in [
            UnitAction::Locate,
            UnitAction::ConfirmPick { scanned: "sku-bp-001".into() },
            UnitAction::HandOff,
            UnitAction::ConfirmReceipt { scanned: "BP-001".into() },
            UnitAction::StartProcessing,
            UnitAction::ConfirmComplete { scanned: "SKU-BP-001".into() },
        ] {
            h.step(&uid, action).unwrap();
        }
        let unit = h.units.get(&uid).unwrap();
        assert_eq!(unit.state(), UnitState::Completed);
        assert_eq!(unit.current_bin_code(), None);
        assert!(unit.state_history().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        h.assert_slot_accounting();
    }

    #[test]
    fn scan_mismatch_leaves_everything_unchanged() {
        let h = setup();
        let uid = h.stored("BP-001", SizeClass::M, 10);
        let before_entries = h.entries();

        let err = h
            .step(&uid, UnitAction::ConfirmPick { scanned: "WRONG-SKU".into() })
            .unwrap_err();
        assert!(matches!(err, WarehouseError::ScanMismatch { .. }));
        assert_eq!(h.units.get(&uid).unwrap().state(), UnitState::Stored);
        assert_eq!(h.occupied("A-01-01"), 10);
        assert_eq!(h.entries(), before_entries);

        assert_eq!(
            h.step(&uid, UnitAction::ConfirmPick { scanned: "SKU-BP-001".into() }).unwrap(),
            UnitState::Picked
        );
    }

    #[test]
    fn repeated_scan_is_idempotent() {
        let h = setup();
        let uid = h.stored("BP-001", SizeClass::M, 10);
        h.step(&uid, UnitAction::ConfirmPick { scanned: "BP-001".into() }).unwrap();
        let entries = h.entries();
        assert_eq!(
            h.step(&uid, UnitAction::ConfirmPick { scanned: "BP-001".into() }).unwrap(),
            UnitState::Picked
        );
        assert_eq!(h.entries(), entries);
        assert_eq!(h.occupied("A-01-01"), 0);
    }

    #[test]
    fn illegal_skip_is_rejected() {
        let h = setup();
        let uid = h.create("BP-001", SizeClass::M, 10);
        let err = h.step(&uid, UnitAction::HandOff).unwrap_err();
        assert!(matches!(
            err,
            WarehouseError::IllegalTransition { from: UnitState::Arrived, .. }
        ));
    }

    #[test]
    fn ledger_failure_during_accept_releases_the_reservation() {
        let h = setup();
        let uid = h.create("BP-001", SizeClass::M, 40);
        h.ledger.fail(true);

        let err = h.tracker.accept(&uid, &operator(), ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, WarehouseError::Ledger(_)));
        assert_eq!(h.occupied("A-01-01"), 0);
        assert_eq!(h.units.get(&uid).unwrap().state(), UnitState::Arrived);

        h.ledger.fail(false);
        h.tracker.accept(&uid, &operator(), ExpectedVersion::Any).unwrap();
        assert_eq!(h.occupied("A-01-01"), 40);
    }

    #[test]
    fn ledger_failure_during_pick_keeps_the_bin_occupied() {
        let h = setup();
        let uid = h.stored("BP-001", SizeClass::M, 10);
        h.ledger.fail(true);
        assert!(h.step(&uid, UnitAction::ConfirmPick { scanned: "BP-001".into() }).is_err());
        assert_eq!(h.occupied("A-01-01"), 10);
        assert_eq!(h.units.get(&uid).unwrap().state(), UnitState::Stored);
    }

    #[test]
    fn stale_expected_version_is_a_concurrent_modification() {
        let h = setup();
        let uid = h.stored("BP-001", SizeClass::M, 10);
        let version = solewms_core::AggregateRoot::version(&h.units.get(&uid).unwrap());

        let err = h
            .tracker
            .transition(&uid, UnitAction::Locate, &operator(), ExpectedVersion::Exact(version - 1))
            .unwrap_err();
        assert!(err.is_retryable());

        h.tracker
            .transition(&uid, UnitAction::Locate, &operator(), ExpectedVersion::Exact(version))
            .unwrap();
    }

    #[test]
    fn reassign_swaps_bins_and_conserves_occupancy() {
        let h = setup();
        let a = h.stored("BP-001", SizeClass::M, 40);
        // A-01-01 now has 10 free; A-01-02 (30) is roomiest for the next unit.
        let b = h.stored("BP-002", SizeClass::M, 25);
        assert_eq!(h.units.get(&b).unwrap().current_bin_code(), Some(&code("A-01-02")));
        let entries = h.entries();

        let record = h.reassigner.reassign(&a, &b, "FIFO rotation", &operator()).unwrap();
        assert_eq!(record.to_bin_a, code("A-01-02"));
        assert_eq!(record.to_bin_b, code("A-01-01"));

        assert_eq!(h.units.get(&a).unwrap().current_bin_code(), Some(&code("A-01-02")));
        assert_eq!(h.units.get(&b).unwrap().current_bin_code(), Some(&code("A-01-01")));
        assert_eq!(h.occupied("A-01-01"), 40);
        assert_eq!(h.occupied("A-01-02"), 25);
        assert_eq!(h.entries(), entries + 1);
        assert_eq!(h.ledger.reassignments(Some(&a)).unwrap().len(), 1);
        h.assert_slot_accounting();

        // Picking after the swap releases what each unit now accounts for.
        h.step(&a, UnitAction::ConfirmPick { scanned: "BP-001".into() }).unwrap();
        assert_eq!(h.occupied("A-01-02"), 0);
        h.assert_slot_accounting();
    }

    #[test]
    fn self_swap_and_picked_units_are_rejected() {
        let h = setup();
        let a = h.stored("BP-001", SizeClass::M, 10);
        let b = h.stored("BP-002", SizeClass::M, 10);
        assert!(matches!(
            h.reassigner.reassign(&a, &a, "oops", &operator()),
            Err(WarehouseError::SelfSwap { .. })
        ));

        h.step(&b, UnitAction::ConfirmPick { scanned: "BP-002".into() }).unwrap();
        let err = h.reassigner.reassign(&a, &b, "FIFO", &operator()).unwrap_err();
        assert!(matches!(err, WarehouseError::IllegalTransition { from: UnitState::Picked, .. }));
        assert!(h.ledger.reassignments(None).unwrap().is_empty());
    }

    #[test]
    fn same_bin_swap_is_recorded() {
        let h = setup();
        let a = h.stored("BP-001", SizeClass::M, 10);
        let b = h.stored("BP-002", SizeClass::M, 10);
        assert_eq!(
            h.units.get(&a).unwrap().current_bin_code(),
            h.units.get(&b).unwrap().current_bin_code()
        );
        let record = h.reassigner.reassign(&b, &a, "FIFO rotation", &operator()).unwrap();
        assert_eq!(record.from_bin_a, record.to_bin_a);
        h.assert_slot_accounting();
    }

    #[test]
    fn strict_policy_rejects_cross_size_swaps() {
        let h = setup_with(SwapPolicy { strict: true });
        let a = h.stored("BP-001", SizeClass::M, 10);
        let b = h.stored("BP-002", SizeClass::L, 10);
        let err = h.reassigner.reassign(&a, &b, "FIFO", &operator()).unwrap_err();
        assert!(matches!(err, WarehouseError::IncompatibleSwap(_)));
        assert_eq!(h.units.get(&a).unwrap().current_bin_code(), Some(&code("A-01-01")));
    }

    #[test]
    fn ledger_failure_during_reassign_changes_nothing() {
        let h = setup();
        let a = h.stored("BP-001", SizeClass::M, 10);
        let b = h.stored("BP-002", SizeClass::L, 10);
        h.ledger.fail(true);
        assert!(h.reassigner.reassign(&a, &b, "FIFO", &operator()).is_err());
        assert_eq!(h.units.get(&a).unwrap().current_bin_code(), Some(&code("A-01-01")));
        assert_eq!(h.units.get(&b).unwrap().current_bin_code(), Some(&code("B-02-01")));
    }

    #[test]
    fn bin_admin_records_only_real_changes() {
        let h = setup();
        let before = h.entries();
        assert!(h.admin.set_maintenance(&code("A-01-05"), true, &Actor::system()).unwrap());
        assert!(!h.admin.set_maintenance(&code("A-01-05"), true, &Actor::system()).unwrap());
        assert_eq!(h.entries(), before + 1);

        let uid = h.stored("BP-001", SizeClass::M, 5);
        assert_eq!(h.units.get(&uid).unwrap().current_bin_code(), Some(&code("A-01-01")));
        assert!(matches!(
            h.admin.archive(&code("A-01-01"), &Actor::system()),
            Err(WarehouseError::BinNotEmpty { .. })
        ));
        assert!(h.admin.archive(&code("A-01-05"), &Actor::system()).unwrap());
        assert!(h.admin.restore(&code("A-01-05"), &Actor::system()).unwrap());

        h.ledger.fail(true);
        assert!(h.admin.set_maintenance(&code("A-01-02"), true, &Actor::system()).is_err());
        assert!(!h.registry.get(&code("A-01-02")).unwrap().in_maintenance());
    }

    #[test]
    fn failed_restore_leaves_the_bin_archived() {
        let h = setup();
        assert!(h.admin.archive(&code("A-01-05"), &Actor::system()).unwrap());

        h.ledger.fail(true);
        assert!(matches!(
            h.admin.restore(&code("A-01-05"), &Actor::system()),
            Err(WarehouseError::Ledger(_))
        ));
        assert!(h.registry.get(&code("A-01-05")).unwrap().is_archived());

        h.ledger.fail(false);
        assert!(h.admin.restore(&code("A-01-05"), &Actor::system()).unwrap());
        assert!(!h.registry.get(&code("A-01-05")).unwrap().is_archived());
    }

    #[test]
    fn concurrent_operators_keep_slot_accounting_consistent() {
        let h = Arc::new(setup());
        let ids: Vec<UnitId> = (0..8).map(|i| h.stored(&format!("BP-{i:03}"), SizeClass::M, 5)).collect();

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let h = Arc::clone(&h);
                let ids = ids.clone();
                thread::spawn(move || {
                    for round in 0..10 {
                        let a = &ids[(w + round) % ids.len()];
                        let b = &ids[(w * 3 + round + 1) % ids.len()];
                        let _ = h.reassigner.reassign(a, b, "FIFO rotation", &operator());
                        if round == 5 {
                            let _ = h.tracker.transition(
                                &ids[w],
                                UnitAction::ConfirmPick { scanned: ids[w].to_string() },
                                &operator(),
                                ExpectedVersion::Any,
                            );
                        }
                        let late = format!("LT-{w}{round:02}");
                        let _ = h.tracker.register(
                            NewInventoryUnit {
                                unit_id: id(&late),
                                sku: "SKU-LATE".to_string(),
                                product_name: "Gel-Kayano".to_string(),
                                size_class: SizeClass::M,
                                quantity: 1,
                                source_ref: "SH-9".to_string(),
                            },
                            UnitState::Arrived,
                            &operator(),
                        );
                        let _ = h.tracker.accept(&id(&late), &operator(), ExpectedVersion::Any);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        h.assert_slot_accounting();
    }
}
