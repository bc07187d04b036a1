use cofn::{Builder, Error, IterStep, Scope, time};

use futures::executor::block_on;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn yields_every_value_then_the_final_return() {
    let _ = env_logger::try_init();

    let counter = Builder::iterable()
        .build(|scope: &Scope<'_, i32>, upto: i32| {
            for i in 0..upto {
                scope.emit(i);
            }
            Ok(-1)
        })
        .expect("build should accept an iterable config");

    let iterator = counter.call(3).expect("call should produce an iterator");

    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(0)));
    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(1)));
    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(2)));
    assert_eq!(block_on(iterator.next()), Ok(IterStep::Done(-1)));
}

#[test]
fn pulling_past_the_end_fails() {
    let _ = env_logger::try_init();

    let single = Builder::iterable()
        .build(|scope: &Scope<'_, i32>, _args: ()| {
            scope.emit(1);
            Ok(0)
        })
        .expect("build should accept an iterable config");

    let iterator = single.call(()).expect("call should produce an iterator");

    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(1)));
    assert_eq!(block_on(iterator.next()), Ok(IterStep::Done(0)));
    assert_eq!(
        block_on(iterator.next()),
        Err(Error::IteratorDone),
        "a pull after the final step must fail"
    );
}

#[test]
fn body_error_rejects_the_pending_pull() {
    let _ = env_logger::try_init();

    let faulty = Builder::iterable()
        .build(|scope: &Scope<'_, i32>, _args: ()| {
            scope.emit(1);
            Err(Error::failure("broke"))
        })
        .expect("build should accept an iterable config");

    let iterator = faulty.call(()).expect("call should produce an iterator");

    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(1)));
    assert_eq!(block_on(iterator.next()), Err(Error::failure("broke")));
    assert_eq!(block_on(iterator.next()), Err(Error::IteratorDone));
}

#[test]
fn bodies_may_await_between_yields() {
    let _ = env_logger::try_init();

    let ticks = Builder::iterable()
        .build(|scope: &Scope<'_, u32>, _args: ()| {
            for i in 0..3u32 {
                let v = scope.wait(&time::resolve_after(Duration::from_millis(5), i * 10))?;
                scope.emit(v);
            }
            Ok(99)
        })
        .expect("build should accept an iterable config");

    let iterator = ticks.call(()).expect("call should produce an iterator");

    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(0)));
    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(10)));
    assert_eq!(block_on(iterator.next()), Ok(IterStep::Next(20)));
    assert_eq!(block_on(iterator.next()), Ok(IterStep::Done(99)));
}

#[test]
fn for_each_drives_the_whole_sequence() {
    let _ = env_logger::try_init();

    let counter = Builder::iterable()
        .build(|scope: &Scope<'_, i32>, upto: i32| {
            for i in 0..upto {
                scope.emit(i);
            }
            Ok(-1)
        })
        .expect("build should accept an iterable config");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let iterator = counter.call(4).expect("call should produce an iterator");
    let completion = iterator.for_each(move |value| {
        sink.lock().unwrap().push(value);
        Ok(())
    });

    assert_eq!(block_on(completion), Ok(-1), "for_each resolves with the final value");
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn for_each_aborts_on_a_callback_error() {
    let _ = env_logger::try_init();

    let counter = Builder::iterable()
        .build(|scope: &Scope<'_, i32>, upto: i32| {
            for i in 0..upto {
                scope.emit(i);
            }
            Ok(-1)
        })
        .expect("build should accept an iterable config");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let iterator = counter.call(5).expect("call should produce an iterator");
    let completion = iterator.for_each(move |value| {
        if value == 2 {
            return Err(Error::failure("enough"));
        }
        sink.lock().unwrap().push(value);
        Ok(())
    });

    assert_eq!(block_on(completion), Err(Error::failure("enough")));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1], "the drive must stop at the failing step");
}
