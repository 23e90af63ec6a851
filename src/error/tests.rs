use super::*;

#[test]
fn codec_overflow_maps_to_overflow_variant() {
    let e: EngineError = CodecError::Overflow.into();
    assert!(matches!(e, EngineError::Overflow));
}

#[test]
fn codec_not_an_integer_maps_to_invalid_argument() {
    let e: EngineError = CodecError::NotAnInteger.into();
    assert!(matches!(e, EngineError::InvalidArgument(_)));
}

#[test]
fn codec_eof_maps_to_corruption() {
    let e: EngineError = CodecError::UnexpectedEof {
        needed: 8,
        available: 2,
    }
    .into();
    assert!(matches!(e, EngineError::Corruption(_)));
}

#[test]
fn store_invalid_snapshot_maps_to_internal() {
    let e: EngineError = StoreError::InvalidSnapshot.into();
    assert!(matches!(e, EngineError::Internal(_)));
}

#[test]
fn store_io_maps_to_io_error_preserving_message() {
    let e: EngineError = StoreError::Io("disk full".into()).into();
    match e {
        EngineError::IoError(msg) => assert_eq!(msg, "disk full"),
        other => panic!("expected IoError, got {other:?}"),
    }
}
