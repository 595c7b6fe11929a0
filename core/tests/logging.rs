//! `log_to` installs the process-wide subscriber, so it gets its own test
//! binary.

use suck_core::{log_to, CallOptions, Config, Error, FormData, HttpCall, HttpRequest, HttpResponse};

#[test]
fn calls_are_traced_to_the_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.log");
    log_to(&path).unwrap();

    let config = Config::new().with_transport(|_: &HttpRequest| -> suck_core::Result<HttpResponse> {
        Ok(HttpResponse::new(200, "OK", "all good"))
    });
    let call = HttpCall::post(
        "http://test.com/resources",
        CallOptions::new().config(config).callback(|_: &HttpCall| {}),
    )
    .unwrap();
    call.invoke(Some(FormData::from([("login", "matt")]))).unwrap();

    let log = std::fs::read_to_string(&path).unwrap();
    assert!(log.contains("making request"));
    assert!(log.contains("login=matt"));
    assert!(log.contains("response received"));
    assert!(log.contains("all good"));
    assert!(log.contains(&call.id().to_string()));

    // The subscriber is global; a second sink cannot be installed.
    let err = log_to(dir.path().join("other.log")).unwrap_err();
    assert!(matches!(err, Error::LogSink(_)));
}
