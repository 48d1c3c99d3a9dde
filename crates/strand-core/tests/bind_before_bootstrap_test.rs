//! Binding the main-thread object before any lookup closes the bootstrap
//! gate. Single test per binary: the gate is process-wide.

use strand_core::{Thread, ThreadError};

#[test]
fn explicit_main_binding_claims_the_gate() {
    assert!(!Thread::main_thread_known());

    // A non-main binding leaves the gate open.
    let external = std::thread::spawn(|| {
        let bound = Thread::bind_external("sidecar");
        (bound.clone(), Thread::current())
    })
    .join()
    .unwrap();
    assert_eq!(external.0, external.1);
    assert!(!Thread::main_thread_known());

    let main = Thread::main_thread();
    Thread::bind_thread(&main);
    assert!(Thread::main_thread_known());
    assert_eq!(Thread::current(), main);

    let outcome = std::thread::spawn(Thread::try_current).join().unwrap();
    assert!(matches!(outcome, Err(ThreadError::Unregistered)));
}
