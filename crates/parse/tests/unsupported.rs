mod common;

use common::parse_err;
use parse::FrontError;

// The deliberately refused corners of C17 are diagnosed, not mis-parsed.

#[test]
fn atomic_is_refused() {
    let err = parse_err("_Atomic int x;");
    assert!(matches!(err, FrontError::Unsupported { .. }), "got {:?}", err);

    let err = parse_err("int *_Atomic p;");
    assert!(matches!(err, FrontError::Unsupported { .. }), "got {:?}", err);
}

#[test]
fn complex_is_refused() {
    let err = parse_err("double _Complex z;");
    assert!(matches!(err, FrontError::Unsupported { .. }), "got {:?}", err);
}

#[test]
fn thread_local_is_refused() {
    let err = parse_err("_Thread_local int t;");
    assert!(matches!(err, FrontError::Unsupported { .. }), "got {:?}", err);
}

#[test]
fn vlas_are_refused() {
    let err = parse_err("int f(int n) { int a[n]; return a[0]; }");
    assert!(matches!(err, FrontError::Unsupported { .. }), "got {:?}", err);
}
