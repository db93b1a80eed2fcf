use lazy_json::{
    parse, parse_events, parse_to_value, parse_with_options, Cursor, Document, ErrorKind, Event,
    EventIter, EventSource, JsonEvents, Literal, ObjectView, ReaderOptions, Value,
};
use rstest::rstest;
use serde_json::json;

type Source<'a> = JsonEvents<&'a [u8]>;

fn open_object(input: &str) -> (Cursor<Source<'_>>, ObjectView) {
    let Document { cursor, root } = parse(input.as_bytes()).expect("parse");
    match root {
        Value::Object(view) => (cursor, view),
        other => panic!("expected object root, got {other:?}"),
    }
}

fn number(value: i64) -> Literal {
    Literal::Number(value.into())
}

#[rstest]
fn map_with_array_value() {
    let (mut cursor, mut root) = open_object(r#"{"moose": [1, "a", 3]}"#);
    let (key, value) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "moose");
    let mut items = value.into_array().expect("array");
    let mut seen = Vec::new();
    while let Some((index, item)) = items.next(&mut cursor).unwrap() {
        seen.push((index, item.as_literal().cloned().expect("scalar")));
    }
    assert_eq!(
        seen,
        vec![
            (0, number(1)),
            (1, Literal::String("a".into())),
            (2, number(3)),
        ]
    );
    assert!(root.next(&mut cursor).unwrap().is_none());
}

#[rstest]
fn scalars_are_returned_unwrapped() {
    let (mut cursor, mut root) = open_object(r#"{"moose": "goose"}"#);
    let (key, value) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "moose");
    assert!(value.is_scalar());
    assert_eq!(value.as_literal(), Some(&Literal::String("goose".into())));
}

#[rstest]
#[case("{}")]
#[case("[]")]
#[case("  { }  ")]
fn empty_containers_yield_nothing(#[case] input: &str) {
    let Document { mut cursor, root } = parse(input.as_bytes()).unwrap();
    match root {
        Value::Object(mut view) => assert!(view.next(&mut cursor).unwrap().is_none()),
        Value::Array(mut view) => assert!(view.next(&mut cursor).unwrap().is_none()),
        Value::Scalar(literal) => panic!("unexpected scalar {literal:?}"),
    }
    cursor.finish().unwrap();
}

#[rstest]
fn nested_objects_inside_array() {
    let (mut cursor, mut root) = open_object(r#"{"moose": [{"a": 1}, {"b": 2}, {"c": 3}]}"#);
    let expected = json!({"a": 1, "b": 2, "c": 3});
    let (_, value) = root.next(&mut cursor).unwrap().unwrap();
    let mut items = value.into_array().unwrap();
    let mut count = 0;
    while let Some((_, item)) = items.next(&mut cursor).unwrap() {
        let mut object = item.into_object().unwrap();
        while let Some((key, value)) = object.next(&mut cursor).unwrap() {
            assert_eq!(value.materialize(&mut cursor).unwrap(), expected[key.as_str()]);
            count += 1;
        }
    }
    assert_eq!(count, 3);
}

#[rstest]
fn unread_array_items_are_skipped() {
    let (mut cursor, mut root) = open_object(
        r#"{"moose": [{"a": 1}, {"b": {"nested": [1, 2, 3]}}, {"c": 3}]}"#,
    );
    let (_, value) = root.next(&mut cursor).unwrap().unwrap();
    let mut items = value.into_array().unwrap();
    let indices: Vec<usize> = items
        .entries(&mut cursor)
        .map(|entry| entry.map(|(index, _)| index))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(root.next(&mut cursor).unwrap().is_none());
}

#[rstest]
fn unread_object_members_are_skipped() {
    let (mut cursor, mut root) = open_object(
        r#"{"moose": {"a": [1, 2, 3], "b": {"nested": [1, 2, 3]}, "c": [1, 2, 3]}}"#,
    );
    let (_, value) = root.next(&mut cursor).unwrap().unwrap();
    let mut members = value.into_object().unwrap();
    let keys: Vec<String> = members
        .entries(&mut cursor)
        .map(|entry| entry.map(|(key, _)| key.to_string()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[rstest]
fn skip_then_resume_yields_next_sibling() {
    let (mut cursor, mut root) = open_object(r#"{"a": {"x": 1, "y": 2}, "b": 3}"#);
    let (key, untouched) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "a");
    assert!(untouched.into_object().is_some());

    let (key, value) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "b");
    assert_eq!(value.as_literal(), Some(&number(3)));
    assert!(root.next(&mut cursor).unwrap().is_none());
}

#[rstest]
fn partially_read_child_is_drained_on_resume() {
    let (mut cursor, mut root) = open_object(r#"{"a": {"x": [1, [2]], "y": 2}, "b": 3}"#);
    let (_, value) = root.next(&mut cursor).unwrap().unwrap();
    let mut inner = value.into_object().unwrap();
    let (key, deeper) = inner.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "x");
    let mut deeper = deeper.into_array().unwrap();
    assert!(deeper.next(&mut cursor).unwrap().is_some());

    let (key, _) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "b");

    // Both views were passed by their ancestor and now read as exhausted.
    assert!(inner.next(&mut cursor).unwrap().is_none());
    assert!(deeper.next(&mut cursor).unwrap().is_none());
    assert!(root.next(&mut cursor).unwrap().is_none());
}

#[rstest]
fn exhausted_views_are_not_restartable() {
    let (mut cursor, mut root) = open_object(r#"{"a": 1}"#);
    assert!(root.next(&mut cursor).unwrap().is_some());
    assert!(root.next(&mut cursor).unwrap().is_none());
    assert!(root.is_exhausted());
    assert!(root.next(&mut cursor).unwrap().is_none());
    assert!(root.next(&mut cursor).unwrap().is_none());
}

#[rstest]
fn skipping_earlier_sibling_keeps_later_sibling_readable() {
    let expected = json!({"d": 1, "e": 2, "f": 3});
    let (mut cursor, mut root) = open_object(
        r#"{"moose": [{"a": 1}, {"b": 2}, {"c": 3}], "goose": [{"d": 1}, {"e": 2}, {"f": 3}]}"#,
    );
    let mut seen = 0;
    while let Some((key, value)) = root.next(&mut cursor).unwrap() {
        if key != "goose" {
            continue;
        }
        let mut items = value.into_array().unwrap();
        while let Some((_, item)) = items.next(&mut cursor).unwrap() {
            let mut object = item.into_object().unwrap();
            while let Some((name, value)) = object.next(&mut cursor).unwrap() {
                assert_eq!(value.materialize(&mut cursor).unwrap(), expected[name.as_str()]);
                seen += 1;
            }
        }
    }
    assert_eq!(seen, 3);
}

const LEVELS: &str = r#"{
  "level-1": [
    {
      "level-2": [
        {
          "level-3a": [
            {"a": 1, "b": "moose", "c": "goose"},
            {"a": 2, "b": "truce", "c": "deduce"},
            {"a": 3, "b": "house", "c": "flute"}
          ]
        },
        {
          "level-3b": [
            {"x": 9, "b": "10"}
          ]
        }
      ]
    }
  ]
}"#;

#[rstest]
fn selective_descent_through_levels() {
    let (mut cursor, mut root) = open_object(LEVELS);
    let mut found = Vec::new();
    while let Some((_, sessions)) = root.next(&mut cursor).unwrap() {
        let mut sessions = sessions.into_array().unwrap();
        while let Some((_, session)) = sessions.next(&mut cursor).unwrap() {
            let mut session = session.into_object().unwrap();
            while let Some((_, groups)) = session.next(&mut cursor).unwrap() {
                let mut groups = groups.into_array().unwrap();
                while let Some((_, group)) = groups.next(&mut cursor).unwrap() {
                    let mut group = group.into_object().unwrap();
                    while let Some((group_type, lines)) = group.next(&mut cursor).unwrap() {
                        if group_type != "level-3a" {
                            continue;
                        }
                        let mut lines = lines.into_array().unwrap();
                        while let Some((_, line)) = lines.next(&mut cursor).unwrap() {
                            found.push(line.materialize(&mut cursor).unwrap());
                        }
                    }
                }
            }
        }
    }
    assert_eq!(
        found,
        vec![
            json!({"a": 1, "b": "moose", "c": "goose"}),
            json!({"a": 2, "b": "truce", "c": "deduce"}),
            json!({"a": 3, "b": "house", "c": "flute"}),
        ]
    );
    cursor.finish().unwrap();
}

#[rstest]
#[case(r#"{"moose": [1, "a", 3.5, -2e3, true, false, null]}"#)]
#[case(r#"[[], {}, [[[]]], {"a": {"b": {"c": []}}}]"#)]
#[case(r#""just a string""#)]
#[case("12345678901234567890")]
#[case(r#"{"dup": 1, "other": [1, 2], "dup": {"replaced": true}}"#)]
#[case(LEVELS)]
fn materialize_matches_reference_parse(#[case] input: &str) {
    let reference: serde_json::Value = serde_json::from_str(input).unwrap();
    assert_eq!(parse_to_value(input.as_bytes()).unwrap(), reference);
}

#[rstest]
fn deep_nesting_is_skipped_without_recursion() {
    let depth = 200_000;
    let input = format!("[{}1{}, 2]", "[".repeat(depth), "]".repeat(depth));
    let Document { mut cursor, root } = parse(input.as_bytes()).unwrap();
    let mut items = root.into_array().unwrap();
    let (index, _deep) = items.next(&mut cursor).unwrap().unwrap();
    assert_eq!(index, 0);
    let (index, value) = items.next(&mut cursor).unwrap().unwrap();
    assert_eq!(index, 1);
    assert_eq!(value.as_literal(), Some(&number(2)));
    assert_eq!(cursor.stats().skipped_events as usize, depth * 2);
}

#[rstest]
fn explicit_skip_of_value() {
    let (mut cursor, mut root) = open_object(r#"{"a": [1, [2, 3]], "b": true}"#);
    let (_, value) = root.next(&mut cursor).unwrap().unwrap();
    value.skip(&mut cursor).unwrap();
    assert_eq!(cursor.depth(), 1);
    let (key, value) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "b");
    assert_eq!(value.as_literal(), Some(&Literal::Bool(true)));
}

#[rstest]
fn document_finish_drains_remaining_root() {
    let document = parse(r#"{"a": [1, 2, 3], "b": {"c": null}}"#.as_bytes()).unwrap();
    let stats = document.finish().unwrap();
    assert_eq!(stats.events, 13);
    assert_eq!(stats.scalars_decoded, 0);
}

#[rstest]
fn truncated_document_errors_at_next_request() {
    let (mut cursor, mut root) = open_object(r#"{"a": 1, "b": [1, 2"#);
    assert!(root.next(&mut cursor).unwrap().is_some());
    let (_, value) = root.next(&mut cursor).unwrap().unwrap();
    let mut items = value.into_array().unwrap();
    assert!(items.next(&mut cursor).unwrap().is_some());
    assert!(items.next(&mut cursor).unwrap().is_some());
    let err = items.next(&mut cursor).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedEndOfStream);

    // The failure is terminal for every view sharing the cursor.
    let err = root.next(&mut cursor).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedEndOfStream);
}

#[rstest]
fn malformed_document_errors() {
    let (mut cursor, mut root) = open_object(r#"{"a": 1 "b": 2}"#);
    assert!(root.next(&mut cursor).unwrap().is_some());
    let err = root.next(&mut cursor).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedInput);
}

#[rstest]
fn empty_input_is_unexpected_end() {
    let err = parse("".as_bytes()).err().expect("empty input must fail");
    assert_eq!(err.kind, ErrorKind::UnexpectedEndOfStream);
}

#[rstest]
#[case(vec![Event::MapStart, Event::Scalar(Literal::Null), Event::MapEnd])]
#[case(vec![Event::MapStart, Event::MapKey("a".into()), Event::ArrayEnd])]
#[case(vec![Event::ArrayStart, Event::MapEnd])]
fn out_of_order_events_are_structural_errors(#[case] events: Vec<Event>) {
    let Document { mut cursor, root } = parse_events(EventIter::new(events)).unwrap();
    let err = match root {
        Value::Object(mut view) => view.next(&mut cursor).unwrap_err(),
        Value::Array(mut view) => view.next(&mut cursor).unwrap_err(),
        Value::Scalar(_) => panic!("unexpected scalar root"),
    };
    assert_eq!(err.kind, ErrorKind::StructuralError);
}

#[rstest]
fn close_tag_as_root_is_structural_error() {
    let err = parse_events(EventIter::new(vec![Event::MapEnd]))
        .err()
        .expect("must fail");
    assert_eq!(err.kind, ErrorKind::StructuralError);
}

#[rstest]
fn deep_document_materializes_and_drops() {
    let depth = 200_000;
    let input = format!(r#"{{"deep": {}"leaf"{}}}"#, "[".repeat(depth), "]".repeat(depth));
    let value = parse_to_value(input.as_bytes()).unwrap();
    let mut levels = 0;
    let mut current = &value["deep"];
    while let Some(items) = current.as_array() {
        levels += 1;
        current = &items[0];
    }
    assert_eq!(levels, depth);
    assert_eq!(current, &json!("leaf"));
    drop(value);
}

#[rstest]
#[case(ReaderOptions::new(), "[1, 2,]", Err(ErrorKind::MalformedInput))]
#[case(ReaderOptions::new().with_allow_trailing_comma(true), "[1, 2,]", Ok(json!([1, 2])))]
#[case(
    ReaderOptions::new().with_allow_trailing_comma(true),
    r#"{"a": [true,], "b": null,}"#,
    Ok(json!({"a": [true], "b": null}))
)]
#[case(ReaderOptions::new(), "[[[1]]]", Ok(json!([[[1]]])))]
#[case(ReaderOptions::new().with_max_nesting_depth(Some(3)), "[[[1]]]", Ok(json!([[[1]]])))]
#[case(
    ReaderOptions::new().with_max_nesting_depth(Some(2)),
    "[[[1]]]",
    Err(ErrorKind::MalformedInput)
)]
#[case(
    ReaderOptions::new().with_max_nesting_depth(Some(1)),
    r#"{"a": {"b": 1}}"#,
    Err(ErrorKind::MalformedInput)
)]
fn reader_options_are_applied(
    #[case] options: ReaderOptions,
    #[case] input: &str,
    #[case] expected: Result<serde_json::Value, ErrorKind>,
) {
    let outcome = parse_with_options(input.as_bytes(), &options).and_then(Document::materialize);
    match (outcome, expected) {
        (Ok(value), Ok(expected)) => assert_eq!(value, expected),
        (Err(err), Err(kind)) => {
            assert_eq!(err.kind, kind, "{err}");
            assert!(err.location.is_some(), "{err}");
        }
        (outcome, expected) => panic!("got {outcome:?}, expected {expected:?}"),
    }
}

#[rstest]
fn cursor_hands_back_its_source() {
    let document = parse(r#"{"a": [1, 2], "b": 3}"#.as_bytes()).unwrap();
    let (mut cursor, root) = document.into_parts();
    let mut root = root.into_object().unwrap();
    let (key, _) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(key, "a");
    root.skip(&mut cursor).unwrap();
    assert_eq!(cursor.depth(), 0);

    let mut source = cursor.into_source();
    assert_eq!(source.next_event().unwrap(), None);
}

#[rstest]
fn passed_view_materializes_as_empty() {
    let (mut cursor, mut root) = open_object(r#"{"a": {"x": 1}, "b": [1, 2]}"#);
    let (_, first) = root.next(&mut cursor).unwrap().unwrap();
    let (_, second) = root.next(&mut cursor).unwrap().unwrap();
    assert_eq!(first.materialize(&mut cursor).unwrap(), json!({}));
    assert_eq!(second.materialize(&mut cursor).unwrap(), json!([1, 2]));
    cursor.finish().unwrap();
}
