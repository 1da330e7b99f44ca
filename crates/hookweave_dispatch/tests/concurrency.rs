//! Concurrent access tests for `hookweave_dispatch`.
//!
//! These tests verify that invocation contexts stay thread-local and that
//! site registration is safe while other threads dispatch.


use std::sync::{Arc, Barrier};
use std::thread;

use hookweave_dispatch::{DispatchPhase, HookDispatch, HookDispatchMapper};
use hookweave_sensor::config::SensorConfig;
use hookweave_sensor::id::SiteId;
use hookweave_sensor::sink::SinkKind;
use test_utils::{Fixture, TREE};

/// A recording on one thread is invisible to another thread.
#[test]
fn invocation_context_does_not_leak_across_threads() {
    let fx = Arc::new(Fixture::new());
    fx.method(3, &[TREE], true);
    fx.method(16, &[8], false);

    let entered = Arc::new(Barrier::new(2));
    let checked = Arc::new(Barrier::new(2));

    let recorder = {
        let fx = Arc::clone(&fx);
        let entered = Arc::clone(&entered);
        let checked = Arc::clone(&checked);
        thread::spawn(move || {
            fx.invoke_method(3, || {
                entered.wait();
                checked.wait();
            });
        })
    };

    let bystander = {
        let fx = Arc::clone(&fx);
        thread::spawn(move || {
            entered.wait();
            let active = fx.dispatcher.invocation_active();
            fx.invoke_method(16, || {});
            checked.wait();
            active
        })
    };

    let bystander_saw_tree = bystander.join().expect("bystander panicked");
    recorder.join().expect("recorder panicked");

    assert!(!bystander_saw_tree);
    let call = fx
        .journal
        .single(16, 8, DispatchPhase::SecondAfterBody)
        .expect("sensor 8 at site 16");
    assert_eq!(call.sink, Some(SinkKind::Core));
    assert!(fx.journal.single(16, TREE, DispatchPhase::BeforeBody).is_none());
}

/// Every thread can run its own recording at the same time.
#[test]
fn threads_record_independent_trees() {
    const THREADS: usize = 8;

    let fx = Arc::new(Fixture::new());
    fx.method(3, &[TREE], true);
    fx.method(15, &[7], false);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let fx = Arc::clone(&fx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut active_inside = false;
                fx.invoke_method(3, || {
                    barrier.wait();
                    fx.invoke_method(15, || {});
                    active_inside = fx.dispatcher.invocation_active();
                });
                active_inside && !fx.dispatcher.invocation_active()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("thread panicked"));
    }

    let nested = fx
        .journal
        .calls()
        .into_iter()
        .filter(|call| call.site == 15 && call.phase == DispatchPhase::SecondAfterBody)
        .collect::<Vec<_>>();
    assert_eq!(nested.len(), THREADS * 2);
    for call in nested {
        let expected = if call.sensor == TREE {
            SinkKind::Core
        } else {
            SinkKind::InvocationTree
        };
        assert_eq!(call.sink, Some(expected));
    }
}

/// Registration during dispatch never loses a write.
#[test]
fn registration_races_with_dispatch() {
    const WRITERS: u64 = 4;
    const SITES_PER_WRITER: u64 = 50;

    let fx = Arc::new(Fixture::new());
    fx.method(3, &[1], false);
    let barrier = Arc::new(Barrier::new(WRITERS as usize + 2));

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let fx = Arc::clone(&fx);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for n in 0..SITES_PER_WRITER {
                let site = SiteId::new(1_000 + writer * SITES_PER_WRITER + n);
                let config = SensorConfig::method().with_sensor(2_u64).build();
                fx.dispatcher.register_method_mapping(site, config);
            }
        }));
    }
    for _ in 0..2 {
        let fx = Arc::clone(&fx);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..100 {
                fx.dispatcher
                    .dispatch_method_before_body(SiteId::new(3), None, &[]);
            }
        }));
    }

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(
        fx.dispatcher.registry().len(),
        (WRITERS * SITES_PER_WRITER) as usize + 1
    );
    assert_eq!(fx.journal.sensors(3, DispatchPhase::BeforeBody).len(), 200);
}
