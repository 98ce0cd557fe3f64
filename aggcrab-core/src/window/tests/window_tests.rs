use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use super::*;

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

/// Aggregate of `samples` computed from scratch.
fn recompute(kind: AggregateKind, samples: &[Value]) -> Option<Value> {
    let mut function = kind.create();
    for sample in samples {
        function.update(sample).unwrap();
    }
    function.finalize()
}

fn window(kind: AggregateKind, window_type: WindowType, size: u64) -> AnyWindow {
    AnyWindow::create(kind, window_type, WindowSettings::new(size)).unwrap()
}

fn time_sliding(kind: AggregateKind, size: u64, resolution: u64) -> AnyWindow {
    AnyWindow::create(
        kind,
        WindowType::TimeSliding,
        WindowSettings::new(size).with_resolution(resolution),
    )
    .unwrap()
}

// ── WindowType / WindowSettings ───────────────────────────────────────────

#[test]
fn test_window_type_parses_case_insensitively() {
    assert_eq!("tumbling".parse::<WindowType>().unwrap(), WindowType::Tumbling);
    assert_eq!("SLIDING".parse::<WindowType>().unwrap(), WindowType::Sliding);
    assert_eq!(
        "timetumbling".parse::<WindowType>().unwrap(),
        WindowType::TimeTumbling
    );
    assert_eq!(
        "timeSliding".parse::<WindowType>().unwrap(),
        WindowType::TimeSliding
    );
}

#[test]
fn test_window_type_rejects_unknown() {
    for name in ["hopping", "", "time-sliding", "session"] {
        assert_eq!(
            name.parse::<WindowType>(),
            Err(AggregateError::UnsupportedWindowType(name.to_string()))
        );
    }
}

#[test]
fn test_timer_interval_per_window_type() {
    let settings = WindowSettings::new(100).with_resolution(20);
    assert_eq!(WindowType::Tumbling.timer_interval(&settings), None);
    assert_eq!(WindowType::Sliding.timer_interval(&settings), None);
    assert_eq!(
        WindowType::TimeTumbling.timer_interval(&settings),
        Some(Duration::from_millis(100))
    );
    assert_eq!(
        WindowType::TimeSliding.timer_interval(&settings),
        Some(Duration::from_millis(20))
    );
}

#[test]
fn test_zero_size_is_rejected_for_every_type() {
    for window_type in WindowType::ALL {
        let err = AnyWindow::create(AggregateKind::Sum, window_type, WindowSettings::new(0))
            .unwrap_err();
        assert!(
            matches!(err, AggregateError::InvalidWindowSettings(_)),
            "{window_type}: {err}"
        );
    }
}

#[test]
fn test_time_sliding_resolution_bounds() {
    for resolution in [0, 101] {
        let err = AnyWindow::create(
            AggregateKind::Sum,
            WindowType::TimeSliding,
            WindowSettings::new(100).with_resolution(resolution),
        )
        .unwrap_err();
        assert!(matches!(err, AggregateError::InvalidWindowSettings(_)));
    }
    // Resolution is ignored by the other variants.
    assert!(
        AnyWindow::create(
            AggregateKind::Sum,
            WindowType::TimeTumbling,
            WindowSettings::new(100)
        )
        .is_ok()
    );
}

#[test]
fn test_additional_settings_are_kept() {
    let settings = WindowSettings::new(3).with_additional_settings(HashMap::from([(
        "precision".to_string(),
        "2".to_string(),
    )]));
    let w = AnyWindow::create(AggregateKind::Avg, WindowType::Tumbling, settings).unwrap();
    assert_eq!(w.settings().additional_setting("precision"), Some("2"));
    assert_eq!(w.settings().additional_setting("missing"), None);
}

// ── Tumbling count ────────────────────────────────────────────────────────

#[test]
fn test_tumbling_sum_emits_every_third_sample() {
    let mut w = window(AggregateKind::Sum, WindowType::Tumbling, 3);
    let out: Vec<Emission> = ints(&[1, 2, 3, 4, 5, 6])
        .into_iter()
        .map(|v| w.add_sample(v).unwrap())
        .collect();

    let emits: Vec<bool> = out.iter().map(|e| e.emit).collect();
    assert_eq!(emits, vec![false, false, true, false, false, true]);

    let emitted: Vec<Option<Value>> = out
        .iter()
        .filter(|e| e.emit)
        .map(|e| e.result.clone())
        .collect();
    assert_eq!(emitted, vec![Some(Value::Int(6)), Some(Value::Int(15))]);
}

#[test]
fn test_tumbling_reports_partial_running_aggregate() {
    let mut w = window(AggregateKind::Sum, WindowType::Tumbling, 3);
    assert_eq!(
        w.add_sample(Value::Int(4)).unwrap(),
        Emission::partial(Some(Value::Int(4)))
    );
    assert_eq!(
        w.add_sample(Value::Int(5)).unwrap(),
        Emission::partial(Some(Value::Int(9)))
    );
    assert_eq!(w.len(), 2);
}

#[test]
fn test_tumbling_resets_after_boundary() {
    let mut w = window(AggregateKind::Max, WindowType::Tumbling, 2);
    w.add_sample(Value::Int(9)).unwrap();
    w.add_sample(Value::Int(1)).unwrap();
    assert!(w.is_empty());
    assert_eq!(w.current(), None);
    assert_eq!(
        w.add_sample(Value::Int(2)).unwrap(),
        Emission::partial(Some(Value::Int(2)))
    );
}

#[test]
fn test_tumbling_size_one_emits_every_sample() {
    let mut w = window(AggregateKind::Avg, WindowType::Tumbling, 1);
    for v in [3, 8] {
        assert_eq!(
            w.add_sample(Value::Int(v)).unwrap(),
            Emission::boundary(Some(Value::Float(v as f64)))
        );
    }
}

// ── Sliding count ─────────────────────────────────────────────────────────

#[test]
fn test_sliding_sum_over_last_three() {
    let mut w = window(AggregateKind::Sum, WindowType::Sliding, 3);
    let out: Vec<Emission> = ints(&[1, 2, 3, 4, 5])
        .into_iter()
        .map(|v| w.add_sample(v).unwrap())
        .collect();

    let emits: Vec<bool> = out.iter().map(|e| e.emit).collect();
    assert_eq!(emits, vec![false, false, true, true, true]);

    let results: Vec<Option<Value>> = out[2..].iter().map(|e| e.result.clone()).collect();
    assert_eq!(
        results,
        vec![Some(Value::Int(6)), Some(Value::Int(9)), Some(Value::Int(12))]
    );
    assert_eq!(w.len(), 3);
}

#[test]
fn test_sliding_min_rescans_after_evicting_minimum() {
    let mut w = window(AggregateKind::Min, WindowType::Sliding, 3);
    for v in [1, 5, 4] {
        w.add_sample(Value::Int(v)).unwrap();
    }
    // 1 leaves the window; the minimum of [5, 4, 6] is 4.
    assert_eq!(
        w.add_sample(Value::Int(6)).unwrap(),
        Emission::boundary(Some(Value::Int(4)))
    );
}

#[test]
fn test_sliding_sum_returns_to_int_after_float_leaves() {
    let mut w = window(AggregateKind::Sum, WindowType::Sliding, 2);
    w.add_sample(Value::Float(1.5)).unwrap();
    assert_eq!(
        w.add_sample(Value::Int(2)).unwrap().result,
        Some(Value::Float(3.5))
    );
    assert_eq!(
        w.add_sample(Value::Int(3)).unwrap().result,
        Some(Value::Int(5))
    );
}

#[test]
fn test_tumbling_avg_of_i64_max() {
    let mut w = window(AggregateKind::Avg, WindowType::Tumbling, 2);
    w.add_sample(Value::Int(i64::MAX)).unwrap();
    assert_eq!(
        w.add_sample(Value::Int(i64::MAX)).unwrap(),
        Emission::boundary(Some(Value::Float(9.223372036854776e18)))
    );
}

#[test]
fn test_sliding_rejected_sample_keeps_window_intact() {
    let mut w = window(AggregateKind::Sum, WindowType::Sliding, 2);
    w.add_sample(Value::Int(1)).unwrap();
    w.add_sample(Value::Int(2)).unwrap();

    let err = w.add_sample(Value::from("oops")).unwrap_err();
    assert!(matches!(err, AggregateError::UnsupportedType { .. }));
    assert_eq!(w.len(), 2);
    assert_eq!(w.current(), Some(Value::Int(3)));

    assert_eq!(
        w.add_sample(Value::Int(10)).unwrap(),
        Emission::boundary(Some(Value::Int(12)))
    );
}

#[test]
fn test_count_windows_have_no_next_block() {
    for window_type in [WindowType::Tumbling, WindowType::Sliding] {
        let mut w = window(AggregateKind::Count, window_type, 2);
        assert_eq!(
            w.next_block(),
            Err(AggregateError::NotTimeWindow(window_type))
        );
        assert!(w.as_time_window_mut().is_none());
    }
}

// ── Tumbling time ─────────────────────────────────────────────────────────

#[test]
fn test_time_tumbling_arrival_never_emits() {
    let mut w = window(AggregateKind::Sum, WindowType::TimeTumbling, 100);
    for v in 1..=10 {
        assert!(!w.add_sample(Value::Int(v)).unwrap().emit);
    }
    assert_eq!(w.current(), Some(Value::Int(55)));
}

#[test]
fn test_time_tumbling_next_block_flushes_period() {
    let mut w = window(AggregateKind::Sum, WindowType::TimeTumbling, 100);
    for v in [3, 4, 5] {
        w.add_sample(Value::Int(v)).unwrap();
    }
    assert_eq!(
        w.next_block().unwrap(),
        Emission::boundary(Some(Value::Int(12)))
    );
    assert!(w.is_empty());

    w.add_sample(Value::Int(7)).unwrap();
    assert_eq!(
        w.next_block().unwrap(),
        Emission::boundary(Some(Value::Int(7)))
    );
}

#[test]
fn test_time_tumbling_empty_block_still_emits() {
    let cases = [
        (AggregateKind::Sum, Some(Value::Int(0))),
        (AggregateKind::Count, Some(Value::Int(0))),
        (AggregateKind::Avg, None),
        (AggregateKind::Min, None),
        (AggregateKind::Max, None),
    ];
    for (kind, expected) in cases {
        let mut w = window(kind, WindowType::TimeTumbling, 100);
        assert_eq!(w.next_block().unwrap(), Emission::boundary(expected), "{kind}");
    }
}

// ── Sliding time ──────────────────────────────────────────────────────────

#[test]
fn test_time_sliding_retains_last_size_over_resolution_slots() {
    // 100ms window advanced every 50ms: two sealed slots.
    let mut w = time_sliding(AggregateKind::Sum, 100, 50);

    w.add_sample(Value::Int(1)).unwrap();
    w.add_sample(Value::Int(2)).unwrap();
    assert_eq!(w.next_block().unwrap(), Emission::boundary(Some(Value::Int(3))));

    assert_eq!(
        w.add_sample(Value::Int(3)).unwrap(),
        Emission::partial(Some(Value::Int(6)))
    );
    assert_eq!(w.next_block().unwrap(), Emission::boundary(Some(Value::Int(6))));

    w.add_sample(Value::Int(4)).unwrap();
    // First slot [1, 2] expires.
    assert_eq!(w.next_block().unwrap(), Emission::boundary(Some(Value::Int(7))));
    assert_eq!(w.next_block().unwrap(), Emission::boundary(Some(Value::Int(4))));
    assert_eq!(w.next_block().unwrap(), Emission::boundary(Some(Value::Int(0))));
    assert!(w.is_empty());
}

#[test]
fn test_time_sliding_max_rescans_after_expiry() {
    let mut w = time_sliding(AggregateKind::Max, 10, 10);
    w.add_sample(Value::Int(5)).unwrap();
    w.add_sample(Value::Int(1)).unwrap();
    assert_eq!(w.next_block().unwrap(), Emission::boundary(Some(Value::Int(5))));

    w.add_sample(Value::Int(3)).unwrap();
    assert_eq!(w.next_block().unwrap(), Emission::boundary(Some(Value::Int(3))));
    assert_eq!(w.len(), 1);
}

#[test]
fn test_time_sliding_slot_count_rounds_down() {
    match time_sliding(AggregateKind::Count, 100, 30) {
        AnyWindow::TimeSliding(w) => assert_eq!(w.slot_count(), 3),
        other => panic!("expected TimeSliding, got {:?}", other.window_type()),
    }
}

// ── SharedWindow ──────────────────────────────────────────────────────────

#[test]
fn test_shared_window_serializes_arrival_and_ticks() {
    const WRITERS: usize = 4;
    const PER_WRITER: usize = 2_000;

    let shared = Arc::new(SharedWindow::new(window(
        AggregateKind::Count,
        WindowType::TimeTumbling,
        10,
    )));

    let flushed: i64 = thread::scope(|s| {
        for _ in 0..WRITERS {
            let shared = Arc::clone(&shared);
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    shared.add_sample(Value::Int(i as i64)).unwrap();
                }
            });
        }
        let ticker = s.spawn(|| {
            let mut total = 0;
            for _ in 0..200 {
                let emission = shared.next_block().unwrap();
                assert!(emission.emit);
                if let Some(Value::Int(n)) = emission.result {
                    total += n;
                }
                thread::yield_now();
            }
            total
        });
        ticker.join().unwrap()
    });

    let remaining = match shared.current().unwrap() {
        Some(Value::Int(n)) => n,
        other => panic!("unexpected count {other:?}"),
    };
    // Every sample is counted exactly once: either flushed by a tick or still buffered.
    assert_eq!(flushed + remaining, (WRITERS * PER_WRITER) as i64);
    assert_eq!(shared.len().unwrap() as i64, remaining);
}

#[test]
fn test_shared_window_next_block_on_count_window_fails() {
    let shared = SharedWindow::new(window(AggregateKind::Sum, WindowType::Sliding, 2));
    assert_eq!(shared.window_type(), WindowType::Sliding);
    assert_eq!(shared.function(), AggregateKind::Sum);
    assert_eq!(
        shared.next_block(),
        Err(AggregateError::NotTimeWindow(WindowType::Sliding))
    );
}

// ── Properties ────────────────────────────────────────────────────────────

fn ordered_sample() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-100i64..100).prop_map(Value::Int),
        (-100.0f64..100.0).prop_map(Value::Float),
    ]
}

/// Ints near the `i64` limits mixed with fractional floats.
fn numeric_sample() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1_000i64..1_000).prop_map(Value::Int),
        prop_oneof![Just(i64::MAX), Just(i64::MIN), Just(i64::MAX - 1)].prop_map(Value::Int),
        (-1_000.0f64..1_000.0).prop_map(Value::Float),
    ]
}

fn numeric_kind() -> impl Strategy<Value = AggregateKind> {
    prop::sample::select(vec![AggregateKind::Sum, AggregateKind::Avg])
}

/// Same variant, and for floats the same value up to accumulated rounding.
fn assert_same_aggregate(
    actual: Option<Value>,
    expected: Option<Value>,
) -> std::result::Result<(), TestCaseError> {
    match (&actual, &expected) {
        (Some(Value::Float(a)), Some(Value::Float(b))) => {
            let tolerance = 1e-9 * a.abs().max(b.abs()).max(1.0);
            prop_assert!((a - b).abs() <= tolerance, "{} vs {}", a, b);
        }
        _ => prop_assert_eq!(&actual, &expected),
    }
    Ok(())
}

fn any_kind() -> impl Strategy<Value = AggregateKind> {
    prop::sample::select(AggregateKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_tumbling_emits_every_kth_sample(
        kind in any_kind(),
        k in 1u64..6,
        values in prop::collection::vec(-1_000i64..1_000, 0..40),
    ) {
        let mut w = window(kind, WindowType::Tumbling, k);
        let samples = ints(&values);
        for (i, sample) in samples.iter().enumerate() {
            let emission = w.add_sample(sample.clone()).unwrap();
            let boundary = (i + 1) % k as usize == 0;
            prop_assert_eq!(emission.emit, boundary);
            if boundary {
                let start = i + 1 - k as usize;
                prop_assert_eq!(emission.result, recompute(kind, &samples[start..=i]));
            }
        }
    }

    #[test]
    fn prop_sliding_matches_recomputation(
        kind in any_kind(),
        k in 1u64..6,
        values in prop::collection::vec(-1_000i64..1_000, 1..40),
    ) {
        let mut w = window(kind, WindowType::Sliding, k);
        let samples = ints(&values);
        for (i, sample) in samples.iter().enumerate() {
            let emission = w.add_sample(sample.clone()).unwrap();
            let start = (i + 1).saturating_sub(k as usize);
            prop_assert_eq!(emission.emit, i + 1 >= k as usize);
            prop_assert_eq!(emission.result, recompute(kind, &samples[start..=i]));
        }
    }

    #[test]
    fn prop_sliding_mixed_numeric_matches_recomputation(
        kind in numeric_kind(),
        k in 1u64..6,
        samples in prop::collection::vec(numeric_sample(), 1..60),
    ) {
        let mut w = window(kind, WindowType::Sliding, k);
        for (i, sample) in samples.iter().enumerate() {
            let result = w.add_sample(sample.clone()).unwrap().result;
            let start = (i + 1).saturating_sub(k as usize);
            assert_same_aggregate(result, recompute(kind, &samples[start..=i]))?;
        }
    }

    #[test]
    fn prop_time_sliding_mixed_numeric_matches_recomputation(
        kind in numeric_kind(),
        slots in 1u64..5,
        blocks in prop::collection::vec(prop::collection::vec(numeric_sample(), 0..5), 1..20),
    ) {
        let mut w = time_sliding(kind, slots * 10, 10);
        let mut history: Vec<Vec<Value>> = Vec::new();
        for block in blocks {
            for sample in &block {
                w.add_sample(sample.clone()).unwrap();
            }
            history.push(block);

            let start = history.len().saturating_sub(slots as usize);
            let retained: Vec<Value> = history[start..].concat();
            assert_same_aggregate(w.next_block().unwrap().result, recompute(kind, &retained))?;
        }
    }

    #[test]
    fn prop_sliding_extreme_after_eviction_matches_recomputation(
        is_min in any::<bool>(),
        k in 1u64..8,
        samples in prop::collection::vec(ordered_sample(), 1..60),
    ) {
        let kind = if is_min { AggregateKind::Min } else { AggregateKind::Max };
        let mut w = window(kind, WindowType::Sliding, k);
        for (i, sample) in samples.iter().enumerate() {
            let result = w.add_sample(sample.clone()).unwrap().result;
            let start = (i + 1).saturating_sub(k as usize);
            prop_assert_eq!(result, recompute(kind, &samples[start..=i]));
        }
    }

    #[test]
    fn prop_time_sliding_matches_recomputation(
        kind in any_kind(),
        slots in 1u64..5,
        blocks in prop::collection::vec(prop::collection::vec(-1_000i64..1_000, 0..5), 1..20),
    ) {
        let mut w = time_sliding(kind, slots * 10, 10);
        let mut history: Vec<Vec<Value>> = Vec::new();
        for block in &blocks {
            let block = ints(block);
            for sample in &block {
                prop_assert!(!w.add_sample(sample.clone()).unwrap().emit);
            }
            history.push(block);

            let emission = w.next_block().unwrap();
            let start = history.len().saturating_sub(slots as usize);
            let retained: Vec<Value> = history[start..].concat();
            prop_assert!(emission.emit);
            prop_assert_eq!(emission.result, recompute(kind, &retained));
            prop_assert_eq!(w.len(), retained.len());
        }
    }

    #[test]
    fn prop_time_tumbling_flushes_exactly_the_period(
        kind in any_kind(),
        blocks in prop::collection::vec(prop::collection::vec(-1_000i64..1_000, 0..6), 1..10),
    ) {
        let mut w = window(kind, WindowType::TimeTumbling, 100);
        for block in &blocks {
            let block = ints(block);
            for sample in &block {
                w.add_sample(sample.clone()).unwrap();
            }
            let emission = w.next_block().unwrap();
            prop_assert!(emission.emit);
            prop_assert_eq!(emission.result, recompute(kind, &block));
            prop_assert!(w.is_empty());
        }
    }
}
