//! Typed values fed from the command line, defaults and the environment.

use std::time::Duration as StdDuration;

use rstest::rstest;

use cmdtree::util::testing;
use cmdtree::{
    Bool, Command, CommandTree, Duration, EnumArray, Error, HostPort, Opt, Slot, Str,
    StringArray, Url, Value,
};

fn run(tree: &CommandTree, args: &[&str]) -> cmdtree::Result<()> {
    testing::init_test_setup();
    tree.invoke(args.iter().copied()).run()
}

fn single(opt: Opt) -> CommandTree {
    CommandTree::new(
        Command::new("app").child(Command::new("run").option(opt).handler(|_ctx, _inv| Ok(()))),
    )
    .unwrap()
}

#[rstest]
#[case("1h30m", StdDuration::from_secs(5400))]
#[case("250ms", StdDuration::from_millis(250))]
#[case("1.5s", StdDuration::from_millis(1500))]
#[case("2m3.25s", StdDuration::from_millis(123_250))]
fn given_go_style_duration_flag_when_run_then_parsed(#[case] raw: &str, #[case] want: StdDuration) {
    let timeout = Duration::new();
    let tree = single(Opt::new("timeout").value(timeout.clone()));

    let result = run(&tree, &["run", "--timeout", raw]);

    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(timeout.value(), want);
}

#[test]
fn given_duration_default_when_rendered_then_round_trips_to_go_format() {
    let timeout = Duration::new();

    timeout.set_default("90s").unwrap();

    assert_eq!(timeout.render(), "1m30s");
}

#[test]
fn given_array_default_when_flag_repeated_then_default_replaced_and_values_appended() {
    // Arrange
    let tags = StringArray::new();
    let tree = single(Opt::new("tag").default_value("base").value(tags.clone()));

    // Act
    let result = run(&tree, &["run", "--tag", "a", "--tag=b,c"]);

    // Assert
    assert!(result.is_ok());
    assert_eq!(tags.value(), vec!["a", "b", "c"]);
}

#[test]
fn given_array_default_when_flag_absent_then_default_kept() {
    let tags = StringArray::new();
    let tree = single(Opt::new("tag").default_value("x,y").value(tags.clone()));

    let result = run(&tree, &["run"]);

    assert!(result.is_ok());
    assert_eq!(tags.render(), "[x,y]");
}

#[test]
fn given_enum_array_when_mixed_case_choices_given_then_accepted() {
    let levels = EnumArray::new(["debug", "info", "warn"]);
    let tree = single(Opt::new("level").value(levels.clone()));

    let result = run(&tree, &["run", "--level", "DEBUG,warn"]);

    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(levels.value().len(), 2);
}

#[rstest]
#[case("127.0.0.1:8080", "127.0.0.1", "8080")]
#[case("[::1]:9000", "::1", "9000")]
#[case(":80", "", "80")]
fn given_host_port_flag_when_run_then_split(#[case] raw: &str, #[case] host: &str, #[case] port: &str) {
    let listen = HostPort::new();
    let tree = single(Opt::new("listen").value(listen.clone()));

    let result = run(&tree, &["run", "--listen", raw]);

    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(listen.host(), host);
    assert_eq!(listen.port(), port);
}

#[rstest]
#[case::url(Opt::new("endpoint").value(Url::new()), "not a url")]
#[case::host_port(Opt::new("endpoint").value(HostPort::new()), "localhost")]
#[case::duration(Opt::new("endpoint").value(Duration::new()), "-5s")]
fn given_malformed_value_when_run_then_flag_parse_error(#[case] opt: Opt, #[case] raw: &str) {
    let tree = single(opt);

    let err = run(&tree, &["run", "--endpoint", raw]).unwrap_err();

    assert!(matches!(err, Error::FlagParse { .. }), "{err}");
}

#[test]
fn given_invalid_default_when_run_then_reported_before_handler() {
    let tree = single(
        Opt::new("timeout")
            .default_value("soon")
            .value(Duration::new()),
    );

    let err = run(&tree, &["run"]).unwrap_err();

    assert!(matches!(err, Error::FlagParse { .. }));
    assert!(err.to_string().contains("soon"));
}

#[test]
fn given_grouped_bool_shorthands_when_run_then_each_is_set() {
    // Arrange
    let all = Bool::new();
    let long = Bool::new();
    let tree = CommandTree::new(
        Command::new("app").child(
            Command::new("ls")
                .option(Opt::new("all").short('a').value(all.clone()))
                .option(Opt::new("long").short('l').value(long.clone()))
                .handler(|_ctx, _inv| Ok(())),
        ),
    )
    .unwrap();

    // Act
    let result = run(&tree, &["ls", "-al"]);

    // Assert
    assert!(result.is_ok());
    assert!(all.value());
    assert!(long.value());
}

#[test]
fn given_explicit_false_when_bool_flag_given_then_false() {
    let force = Bool::new();
    let tree = single(Opt::new("force").default_value("true").value(force.clone()));

    let result = run(&tree, &["run", "--force=false"]);

    assert!(result.is_ok());
    assert!(!force.value());
}

#[rstest]
#[case::empty_bool(Opt::new("force").value(Bool::new()), "--force=")]
#[case::huge_duration(Opt::new("timeout").value(Duration::new()), "--timeout=99999999999999999999999999999999999h")]
fn given_unusable_operand_when_run_then_flag_parse_error(#[case] opt: Opt, #[case] token: &str) {
    let tree = single(opt);

    let err = run(&tree, &["run", token]).unwrap_err();

    assert!(matches!(err, Error::FlagParse { .. }), "{err}");
}

#[test]
fn given_shared_slot_when_flag_set_then_all_handles_see_value() {
    let slot: Slot<String> = Slot::default();
    let tree = single(Opt::new("name").value(Str::bound(&slot)));

    let result = run(&tree, &["run", "--name", "ada"]);

    assert!(result.is_ok());
    assert_eq!(slot.get(), "ada");
}

#[test]
fn given_env_files_array_from_environment_when_run_then_split_on_commas() {
    std::env::set_var("CMDTREE_TEST_VALUES_FILES", "a.env, b.env");
    let files = StringArray::new();
    let tree = single(
        Opt::new("files")
            .env("CMDTREE_TEST_VALUES_FILES")
            .value(files.clone()),
    );

    let result = run(&tree, &["run"]);

    assert!(result.is_ok());
    assert_eq!(files.value(), vec!["a.env", "b.env"]);
}
