//! Conformance tests for the cancellation protocol: cleanups run exactly
//! once, continuations resume at most once, and stale deliveries are
//! ignored.

use plait::test_utils::{run, run_ok};
use plait::time::{wait, yield_now};
use plait::{
    await_with, cancelable, no_await, strand, Cleanup, Exn, ResumeHandle, Try,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

#[test]
fn sweep_runs_every_cleanup_exactly_once() {
    let cleanups = Rc::new(RefCell::new(Vec::new()));
    let observed = cleanups.clone();
    let out = run(move |cx| async move {
        cancelable(&cx, |inner| async move {
            let mut strands = Vec::new();
            for i in 0..4u32 {
                let inner2 = inner.clone();
                let observed = observed.clone();
                strands.push(strand(async move {
                    await_with(&inner2, move |_on: ResumeHandle<u32>| {
                        let observed = observed.clone();
                        Ok(Some(Box::new(move || observed.borrow_mut().push(i)) as Cleanup))
                    })
                    .await
                }));
            }
            let canceller = {
                let inner = inner.clone();
                strand(async move {
                    inner.cancel();
                    Ok(99u32)
                })
            };
            strands.push(canceller);
            Ok(plait::interleavedx(&inner, strands).await)
        })
        .await
    });
    let outs = out.unwrap();
    for pending in &outs[..4] {
        assert!(pending.as_ref().unwrap_err().is_cancel());
    }
    assert_eq!(outs[4], Ok(99));
    // Each registered cleanup ran once, in registration order.
    assert_eq!(*cleanups.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn resumption_happens_at_most_once_under_duplicate_fires() {
    let out = run(|cx| async move {
        let resumed = Rc::new(Cell::new(0u32));
        let observed = resumed.clone();
        let v = await_with(&cx, move |on: ResumeHandle<u32>| {
            // The host misbehaves and fires the done callback three times.
            on.fire(Ok(1), true);
            on.fire(Ok(2), true);
            on.fire(Err(Exn::error("late")), true);
            Ok(None)
        })
        .await?;
        observed.set(observed.get() + 1);
        Ok((v, resumed.get()))
    });
    assert_eq!(out.unwrap(), (1, 1));
}

#[test]
fn cancelled_wait_never_fires_later() {
    let out = run(|cx| async move {
        let outcome = cancelable(&cx, |inner| async move {
            let sleeper = {
                let inner = inner.clone();
                strand(async move { wait(&inner, Duration::from_millis(5)).await })
            };
            let canceller = {
                let inner = inner.clone();
                strand(async move {
                    inner.cancel();
                    Ok(())
                })
            };
            Ok(plait::interleavedx(&inner, vec![sleeper, canceller]).await)
        })
        .await?;
        // Let virtual time reach the (cleared) deadline; nothing fires.
        wait(&cx, Duration::from_millis(20)).await?;
        Ok(outcome)
    });
    let outs = out.unwrap();
    assert!(outs[0].as_ref().unwrap_err().is_cancel());
    assert_eq!(outs[1], Ok(()));
}

#[test]
fn cancel_returns_normally_in_the_caller() {
    let out = run_ok(|cx| async move {
        cancelable(&cx, |inner| async move {
            inner.cancel();
            // The canceling strand itself keeps running.
            Ok("still here")
        })
        .await
    });
    assert_eq!(out, "still here");
}

#[test]
fn cancel_only_reaches_awaits_in_its_own_frame() {
    let outs = run_ok(|cx| async move {
        let outer_sleep = {
            let cx = cx.clone();
            strand(async move {
                wait(&cx, Duration::from_millis(5)).await?;
                Ok("outer done")
            })
        };
        let inner_block = {
            let cx = cx.clone();
            strand(async move {
                cancelable(&cx, |inner| async move {
                    inner.cancel();
                    yield_now(&inner).await?;
                    Ok("inner done")
                })
                .await
            })
        };
        Ok(plait::interleavedx(&cx, vec![outer_sleep, inner_block]).await)
    });
    // The outer wait is untouched by the inner frame's cancel. The inner
    // strand suspends after its cancel and is NOT torn down: the sweep ran
    // before the yield was registered.
    assert_eq!(outs[0], Ok("outer done"));
    assert_eq!(outs[1], Ok("inner done"));
}

#[test]
fn detached_operations_get_a_cancel_delivery() {
    let deliveries = Rc::new(RefCell::new(Vec::new()));
    let observed = deliveries.clone();
    let out = run(move |cx| async move {
        cancelable(&cx, |inner| async move {
            no_await(
                &inner,
                |on: ResumeHandle<u32>| {
                    on.fire(Ok(1), false);
                    Ok(None)
                },
                move |res: Try<u32>, done| {
                    observed.borrow_mut().push((res.map_err(|e| e.is_cancel()), done));
                },
            );
            Ok(())
        })
        .await
    });
    assert_eq!(out, Ok(()));
    // One streaming delivery, then the scope-exit cancellation.
    assert_eq!(
        *deliveries.borrow(),
        vec![(Ok(1), false), (Err(true), true)]
    );
}

#[test]
fn expired_timeout_leaves_no_residue() {
    let out = run(|cx| async move {
        let slept = plait::timeout(&cx, Duration::from_millis(1), |cx| async move {
            wait(&cx, Duration::from_secs(3600)).await?;
            Ok(())
        })
        .await?;
        assert_eq!(slept, None);
        assert_eq!(cx.armed_timers(), 0);
        assert_eq!(cx.outstanding_ops(), 0);
        Ok(())
    });
    assert_eq!(out, Ok(()));
}
