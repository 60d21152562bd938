//! Unit tests for argument handling

use crate::cli::{build_app, parse_args, split_repositories, Cli};
use crate::registry::ResolutionPolicy;
use crate::server::{Request, Response};
use std::ffi::OsString;

#[test]
fn test_leading_args_are_repositories() {
    let (repos, rest) = split_repositories(["webdispatch", "site", "lib", "--watch", "extra"]);
    let dirs: Vec<_> = repos.dirs().iter().map(|d| d.to_string_lossy().into_owned()).collect();
    assert_eq!(dirs, vec!["site", "lib"]);
    assert_eq!(
        rest,
        vec![
            OsString::from("webdispatch"),
            OsString::from("--watch"),
            OsString::from("extra")
        ]
    );
}

#[test]
fn test_no_repositories() {
    let (repos, rest) = split_repositories(["webdispatch", "--strict"]);
    assert!(repos.is_empty());
    assert_eq!(rest.len(), 2);
    let (repos, rest) = split_repositories(["webdispatch"]);
    assert!(repos.is_empty());
    assert_eq!(rest, vec![OsString::from("webdispatch")]);
}

#[test]
fn test_flags_parse() {
    let (repos, cli) = parse_args([
        "webdispatch",
        "app",
        "--addr",
        "127.0.0.1:9000",
        "--strict",
        "--setup",
        "routes",
    ])
    .unwrap();
    assert_eq!(repos.dirs().len(), 1);
    assert_eq!(cli.addr.as_deref(), Some("127.0.0.1:9000"));
    assert!(cli.strict);
    assert!(!cli.watch);
    assert_eq!(cli.setup, "routes");
    assert_eq!(cli.policy(), ResolutionPolicy::Strict);
}

#[test]
fn test_unknown_flag_is_rejected() {
    assert!(parse_args(["webdispatch", "app", "--verbose"]).is_err());
}

#[test]
fn test_defaults() {
    let (_, cli) = parse_args(["webdispatch"]).unwrap();
    assert_eq!(cli.setup, "setup");
    assert_eq!(cli.policy(), ResolutionPolicy::Permissive);
}

#[test]
fn test_build_app_routes_to_echo() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("setup.yaml"),
        "urls:\n  - ['^say/(\\w+)$', 'echo.text']\n",
    )
    .unwrap();
    let (repos, cli) = parse_args([OsString::from("webdispatch"), dir.path().into()]).unwrap();
    let app = build_app(repos, &cli).unwrap();

    let mut res = Response::new();
    app.dispatcher()
        .handle_request(&Request::get("/say/hi"), &mut res);
    assert_eq!(res.status, 200);
    assert_eq!(res.body(), "hi");
}

#[test]
fn test_build_app_without_setup_still_builds() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli {
        addr: None,
        watch: false,
        strict: false,
        setup: "setup".into(),
    };
    let app = build_app(std::iter::once(dir.path()).collect(), &cli).unwrap();
    assert_eq!(app.effective_conf(None).port, 8080);

    let mut res = Response::new();
    app.dispatcher().handle_request(&Request::get("/"), &mut res);
    assert_eq!(res.status, 500);
    assert!(res.body().contains("not found in"));
}
