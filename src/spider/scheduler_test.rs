#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use quickcheck::{QuickCheck, TestResult};

    use crate::spider::layout::SpiralPosition;
    use crate::spider::scheduler::{Clock, ManualClock, RevealHandle, RevealScheduler};

    fn positions(delays: &[u64]) -> Vec<SpiralPosition> {
        delays
            .iter()
            .enumerate()
            .map(|(i, &d)| SpiralPosition {
                point_id: format!("m{i}"),
                lat: 0.0,
                lng: 0.0,
                reveal_delay_ms: d,
            })
            .collect()
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn start(
        scheduler: &RevealScheduler<ManualClock>,
        delays: &[u64],
        log: &Log,
    ) -> RevealHandle {
        let each = log.clone();
        let done = log.clone();
        scheduler.reveal(
            positions(delays),
            move |p| each.borrow_mut().push(p.point_id.clone()),
            move || done.borrow_mut().push("done".to_string()),
        )
    }

    #[test]
    fn test_fires_in_delay_order_then_completes() {
        let clock = ManualClock::new();
        let scheduler = RevealScheduler::new(clock.clone());
        let log: Log = Rc::default();
        let _handle = start(&scheduler, &[0, 40, 80], &log);

        assert_eq!(scheduler.pending(), 4);
        assert_eq!(scheduler.next_deadline(), Some(0));

        assert_eq!(scheduler.run_due(), 1);
        assert_eq!(*log.borrow(), vec!["m0"]);

        clock.advance(39);
        assert_eq!(scheduler.run_due(), 0);

        clock.advance(1);
        assert_eq!(scheduler.run_due(), 1);
        assert_eq!(scheduler.next_deadline(), Some(80));

        clock.advance(100);
        assert_eq!(scheduler.run_due(), 2);
        assert_eq!(*log.borrow(), vec!["m0", "m1", "m2", "done"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_unsorted_delays_fire_ascending() {
        let clock = ManualClock::new();
        let scheduler = RevealScheduler::new(clock.clone());
        let log: Log = Rc::default();
        let _handle = start(&scheduler, &[50, 10, 30, 10], &log);

        clock.advance(1000);
        scheduler.run_due();
        assert_eq!(*log.borrow(), vec!["m1", "m3", "m2", "m0", "done"]);
    }

    #[test]
    fn test_delays_are_relative_to_reveal_call() {
        let clock = ManualClock::new();
        clock.set(500);
        let scheduler = RevealScheduler::new(clock.clone());
        let log: Log = Rc::default();
        let _handle = start(&scheduler, &[20], &log);

        assert_eq!(scheduler.next_deadline(), Some(520));
        clock.set(519);
        assert_eq!(scheduler.run_due(), 0);
        clock.set(520);
        assert_eq!(scheduler.run_due(), 2);
    }

    #[test]
    fn test_empty_reveal_completes_immediately() {
        let clock = ManualClock::new();
        let scheduler = RevealScheduler::new(clock);
        let log: Log = Rc::default();
        let _handle = start(&scheduler, &[], &log);

        assert_eq!(scheduler.run_due(), 1);
        assert_eq!(*log.borrow(), vec!["done"]);
    }

    #[test]
    fn test_drop_cancels() {
        let clock = ManualClock::new();
        let scheduler = RevealScheduler::new(clock.clone());
        let log: Log = Rc::default();
        drop(start(&scheduler, &[0, 10], &log));

        assert_eq!(scheduler.pending(), 0);
        clock.advance(100);
        assert_eq!(scheduler.run_due(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_cancel_from_inside_callback_wins() {
        let clock = ManualClock::new();
        let scheduler = RevealScheduler::new(clock.clone());
        let fired = Rc::new(Cell::new(0));
        let completed = Rc::new(Cell::new(false));
        let slot: Rc<RefCell<Option<RevealHandle>>> = Rc::default();

        let handle = {
            let fired = fired.clone();
            let completed = completed.clone();
            let slot = slot.clone();
            scheduler.reveal(
                positions(&[0, 0, 0]),
                move |_| {
                    fired.set(fired.get() + 1);
                    if let Some(h) = slot.borrow().as_ref() {
                        h.cancel();
                    }
                },
                move || completed.set(true),
            )
        };
        *slot.borrow_mut() = Some(handle);

        // All three are due at once; the first cancels the rest
        assert_eq!(scheduler.run_due(), 1);
        assert_eq!(fired.get(), 1);
        assert!(!completed.get());
        assert_eq!(scheduler.pending(), 0);
        assert!(slot.borrow().as_ref().is_some_and(RevealHandle::is_cancelled));
    }

    #[test]
    fn test_independent_reveals() {
        let clock = ManualClock::new();
        let scheduler = RevealScheduler::new(clock.clone());
        let a: Log = Rc::default();
        let b: Log = Rc::default();
        let ha = start(&scheduler, &[0, 10], &a);
        let _hb = start(&scheduler, &[0, 10], &b);

        ha.cancel();
        clock.advance(10);
        scheduler.run_due();
        assert!(a.borrow().is_empty());
        assert_eq!(*b.borrow(), vec!["m0", "m1", "done"]);
    }

    #[test]
    fn prop_cancel_after_any_progress_stops_callbacks() {
        fn prop(delays: Vec<u8>, stop_at: u8) -> TestResult {
            let delays: Vec<u64> = delays.into_iter().map(u64::from).collect();
            let clock = ManualClock::new();
            let scheduler = RevealScheduler::new(clock.clone());
            let log: Log = Rc::default();
            let handle = start(&scheduler, &delays, &log);

            clock.set(u64::from(stop_at));
            scheduler.run_due();
            let before = log.borrow().len();

            handle.cancel();
            let clean = scheduler.pending() == 0;
            clock.advance(10_000);
            let fired_after = scheduler.run_due();

            TestResult::from_bool(clean && fired_after == 0 && log.borrow().len() == before)
        }
        QuickCheck::new().quickcheck(prop as fn(Vec<u8>, u8) -> TestResult);
    }

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(7);
        assert_eq!(other.now_ms(), 7);
    }
}
