use request_log_analyzer::convert::{
    Conversion, ConversionError, FieldValue, parse_canonical, parse_literal, sanitize_parameters,
};
use serde_json::json;

#[test]
fn test_timestamp_formats_share_one_canonical_form() {
    assert_eq!(
        parse_canonical("2015-02-02 13:33:08 -0500").unwrap(),
        20150202133308
    );
    assert_eq!(
        parse_canonical("Wed Jul 07 09:13:27 -0700 2010").unwrap(),
        20100707091327
    );
    assert_eq!(
        Conversion::Timestamp.convert("Thu Oct 25 16:15:18 -0800 2010").unwrap(),
        Some(FieldValue::Timestamp(20101025161518))
    );
}

#[test]
fn test_timestamp_rejects_unknown_month_and_garbage() {
    assert!(matches!(
        parse_canonical("Wed Foo 07 09:13:27 -0700 2010"),
        Err(ConversionError::UnknownMonth(_))
    ));
    assert!(parse_canonical("yesterday").is_err());
    assert!(parse_canonical("2015-13-45 13:33:08 -0500").is_err());
}

#[test]
fn test_duration_scaled_to_seconds() {
    let msec = Conversion::from_tag("duration", Some("msec")).unwrap();
    match msec.convert("2205.17").unwrap() {
        Some(FieldValue::Duration(seconds)) => assert!((seconds - 2.20517).abs() < 1e-9),
        other => panic!("unexpected {other:?}"),
    }

    let musec = Conversion::from_tag("duration", Some("musec")).unwrap();
    assert_eq!(
        musec.convert("1500000").unwrap(),
        Some(FieldValue::Duration(1.5))
    );
}

#[test]
fn test_eval_parses_hash_literal() {
    assert_eq!(
        Conversion::Eval.convert(r#"{"id"=>"203341"}"#).unwrap(),
        Some(FieldValue::Literal(json!({"id": "203341"})))
    );
}

#[test]
fn test_eval_never_executes_code() {
    let result = Conversion::Eval.convert(r#"{"id"=>`rm -rf /`}"#);
    assert!(matches!(result, Err(ConversionError::Literal(_))));
}

#[test]
fn test_sanitized_upload_parses_only_after_sanitizing() {
    let raw = r#"{"photo"=>#<UploadedFile @original_filename="IMG_2228.JPG", @tempfile=#<Tempfile:/tmp/upload.jpg>>}"#;

    assert!(parse_literal(raw).is_err());

    let sanitized = sanitize_parameters(raw);
    assert_eq!(
        sanitized,
        r#"{"photo"=>"UploadedFile @original_filename=\"IMG_2228.JPG\", @tempfile=\"Tempfile:/tmp/upload.jpg\""}"#
    );
    assert_eq!(
        parse_literal(&sanitized).unwrap(),
        json!({"photo": r#"UploadedFile @original_filename="IMG_2228.JPG", @tempfile="Tempfile:/tmp/upload.jpg""#})
    );

    // the eval converter applies the same repair
    assert!(Conversion::Eval.convert(raw).unwrap().is_some());
}

#[test]
fn test_integer_conversion() {
    assert_eq!(
        Conversion::Integer.convert("200").unwrap(),
        Some(FieldValue::Integer(200))
    );
    assert!(Conversion::Integer.convert("2OO").is_err());
    assert_eq!(Conversion::Integer.convert("").unwrap(), None);
}

#[test]
fn test_epoch_converts_to_canonical_utc() {
    assert_eq!(
        Conversion::Epoch.convert("1422883988").unwrap(),
        Some(FieldValue::Timestamp(20150202133308))
    );
}
