use cofn::protocol::MapOutcome;
use cofn::{Builder, ConfigError, Error, Scope, time};

use futures::executor::block_on;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn echo(_scope: &Scope<'_, String>, input: String) -> Result<String, Error> {
    Ok(input)
}

#[test]
fn layered_protocol_rewrites_results_the_base_leaves_alone() {
    let _ = env_logger::try_init();

    let plain = Builder::future().build(echo).expect("plain build");
    let decorated = Builder::future()
        .wrap(|base| {
            MapOutcome::new(base, |outcome: Result<String, Error>| {
                outcome.map(|value| format!("<<{value}>>"))
            })
        })
        .build(echo)
        .expect("decorated build");

    let unprefixed = plain.call("X".to_string()).expect("plain call");
    let prefixed = decorated.call("X".to_string()).expect("decorated call");

    assert_eq!(block_on(unprefixed), Ok("X".to_string()));
    assert_eq!(
        block_on(prefixed),
        Ok("<<X>>".to_string()),
        "the layer must rewrite the result before the base settles it"
    );
}

#[test]
fn layered_protocol_rewrites_errors_too() {
    let _ = env_logger::try_init();

    let labeled = Builder::future()
        .wrap(|base| {
            MapOutcome::new(base, |outcome: Result<String, Error>| {
                outcome.map_err(|error| Error::failure(format!("wrapped: {error}")))
            })
        })
        .build(|_scope: &Scope<'_, String>, _args: ()| -> Result<String, Error> {
            Err(Error::failure("inner"))
        })
        .expect("build should succeed");

    let promise = labeled.call(()).expect("call should produce a future");

    assert_eq!(block_on(promise), Err(Error::failure("wrapped: inner")));
}

#[test]
fn thunk_bodies_start_only_when_invoked() {
    let _ = env_logger::try_init();

    let started = Arc::new(AtomicBool::new(false));
    let flag = started.clone();

    let deferred_fn = Builder::thunk()
        .build(move |_scope: &Scope<'_, i32>, n: i32| {
            flag.store(true, Ordering::SeqCst);
            Ok(n + 1)
        })
        .expect("build should accept a thunk config");

    let thunk = deferred_fn.call(5).expect("call should produce a thunk");
    assert!(
        !started.load(Ordering::SeqCst),
        "the body must not start before the thunk is invoked"
    );

    let outcome = Arc::new(Mutex::new(None));
    let slot = outcome.clone();
    thunk.invoke(move |result| *slot.lock().unwrap() = Some(result));

    assert!(started.load(Ordering::SeqCst));
    assert_eq!(*outcome.lock().unwrap(), Some(Ok(6)));
}

#[test]
fn value_kind_blocks_and_returns_the_plain_result() {
    let _ = env_logger::try_init();

    let greet = Builder::value()
        .build(|scope: &Scope<'_, String>, name: String| {
            let hello = scope.wait(&time::resolve_after(
                Duration::from_millis(10),
                "hi".to_string(),
            ))?;
            Ok(format!("{hello} {name}"))
        })
        .expect("build should accept a value config");

    assert_eq!(greet.call("bob".to_string()), Ok("hi bob".to_string()));
}

#[test]
fn value_kind_re_raises_body_errors_at_the_call_site() {
    let _ = env_logger::try_init();

    let faulty = Builder::value()
        .build(|_scope: &Scope<'_, i32>, _args: ()| -> Result<i32, Error> {
            Err(Error::failure("sync failure"))
        })
        .expect("build should accept a value config");

    assert_eq!(faulty.call(()), Err(Error::failure("sync failure")));
}

#[test]
fn trailing_callback_and_future_both_observe_the_outcome() {
    let _ = env_logger::try_init();

    let triple = Builder::future()
        .with_callback()
        .build(|_scope: &Scope<'_, i32>, n: i32| Ok(n * 3))
        .expect("build should accept a callback config");

    let outcome = Arc::new(Mutex::new(None));
    let slot = outcome.clone();

    let promise = triple
        .call_with(4, move |result| *slot.lock().unwrap() = Some(result))
        .expect("call should produce a future");

    assert_eq!(block_on(promise), Ok(12));
    assert_eq!(*outcome.lock().unwrap(), Some(Ok(12)));

    // The callback stays optional on every call.
    let promise = triple.call(2).expect("call without callback");
    assert_eq!(block_on(promise), Ok(6));
}

#[test]
fn fire_and_forget_reaches_the_callback_only() {
    let _ = env_logger::try_init();

    let send = Builder::fire_and_forget()
        .build(|_scope: &Scope<'_, u8>, x: u8| Ok(x))
        .expect("build should accept a fire-and-forget config");

    let outcome = Arc::new(Mutex::new(None));
    let slot = outcome.clone();

    send.call_with(9, move |result| *slot.lock().unwrap() = Some(result))
        .expect("call should succeed");

    assert_eq!(*outcome.lock().unwrap(), Some(Ok(9)));
}

#[test]
fn callbacks_are_refused_where_not_configured() {
    let _ = env_logger::try_init();

    let plain = Builder::future().build(echo).expect("build should succeed");

    match plain.call_with("x".to_string(), |_| {}) {
        Err(error) => assert_eq!(error, Error::CallbackNotAccepted),
        Ok(_) => panic!("a plain variant must refuse a trailing callback"),
    }
}

#[test]
fn invalid_configurations_fail_at_build_time() {
    let _ = env_logger::try_init();

    match Builder::future()
        .max_concurrency(0)
        .build(|_scope: &Scope<'_, i32>, _args: ()| Ok(0))
    {
        Err(error) => assert_eq!(error, Error::Config(ConfigError::ZeroConcurrency)),
        Ok(_) => panic!("zero capacity must be rejected"),
    }

    match Builder::iterable()
        .max_concurrency(2)
        .build(|_scope: &Scope<'_, i32>, _args: ()| Ok(0))
    {
        Err(error) => assert_eq!(error, Error::Config(ConfigError::IterableConcurrency)),
        Ok(_) => panic!("bounded iterables must be rejected"),
    }
}

#[test]
fn derived_builders_override_without_touching_the_base() {
    let _ = env_logger::try_init();

    let base = Builder::future().max_concurrency(3);
    let derived = base.clone().max_concurrency(1);
    let relaxed = base.clone().unbounded();

    assert_eq!(base.config().max_concurrency, Some(3));
    assert_eq!(derived.config().max_concurrency, Some(1));
    assert_eq!(relaxed.config().max_concurrency, None);

    let f = derived
        .build(|_scope: &Scope<'_, i32>, n: i32| Ok(n))
        .expect("derived build should succeed");
    assert_eq!(block_on(f.call(8).expect("call")), Ok(8));
}
