//! Integration tests for how console arguments are rendered

use super::common::harness::{controller, lines, run_snippet};
use jsplayground::{OutputKind, RenderedValue};

#[tokio::test(start_paused = true)]
async fn test_nested_object_rendering() {
    let mut controller = controller();
    let run = run_snippet(&mut controller, "console.log({a: 1, b: [1, 2]})").await;

    assert_eq!(lines(&run), vec!["{ a: 1, b: [ 1, 2 ] }"]);
    assert!(matches!(run.records[0].args[0], RenderedValue::Object { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_self_reference_renders_cycle_marker() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        "const node = { name: 'root' }; node.self = node; console.log(node);",
    )
    .await;

    insta::assert_snapshot!(run.records[0].text, @"{ name: 'root', self: [Circular] }");
}

#[tokio::test(start_paused = true)]
async fn test_format_specifiers() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        "console.log('%s is %i years', 'Ada', 36.6, 'extra')",
    )
    .await;

    insta::assert_snapshot!(run.records[0].text, @"Ada is 36 years extra");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_console_method_is_recorded() {
    let mut controller = controller();
    let run = run_snippet(&mut controller, "console.profile('cpu'); console.log('after')").await;

    assert_eq!(run.records[0].kind, OutputKind::Other("profile".into()));
    assert_eq!(lines(&run), vec!["cpu", "after"]);
}

#[tokio::test(start_paused = true)]
async fn test_strings_quoted_only_when_nested() {
    let mut controller = controller();
    let run = run_snippet(&mut controller, "console.log('top', ['inner'])").await;

    assert_eq!(lines(&run), vec!["top [ 'inner' ]"]);
}

#[tokio::test(start_paused = true)]
async fn test_error_kinds_map_to_record_kinds() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        "console.info('i'); console.warn('w'); console.error('e'); console.debug('d');",
    )
    .await;

    let kinds: Vec<OutputKind> = run.records.iter().map(|r| r.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            OutputKind::Info,
            OutputKind::Warn,
            OutputKind::Error,
            OutputKind::Debug
        ]
    );
}
