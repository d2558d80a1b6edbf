use dendros::config::ReaderConfig;
use dendros::events::{ContentEvent, Event, EventContentType};
use dendros::{
    DiagnosticKind, EventReader, LiteralValue, NewickReader, NodeId, ReadError, Tree,
    parse_enewick, parse_newick,
};

fn read_events(s: &str, config: ReaderConfig) -> Vec<Event> {
    NewickReader::new(s.as_bytes(), config)
        .collect::<Result<Vec<Event>, ReadError>>()
        .unwrap_or_else(|err| panic!("Failed to read {s}: {err}"))
}

#[test]
fn test_standard_format_compliance() {
    let test_cases = vec![
        ("Empty nodes", "(,,(,));", 4, 6),
        ("Leaf names only", "(A,B,(C,D));", 4, 6),
        ("All nodes named", "(A,B,(C,D)E)F;", 4, 6),
        ("Branch lengths only", "(:0.1,:0.2,(:0.3,:0.4):0.5);", 4, 6),
        ("Names and branch lengths", "(A:0.1,B:0.2,(C:0.3,D:0.4):0.5);", 4, 6),
        ("All names and branches", "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;", 4, 6),
        ("Rooted on leaf", "((B:0.2,(C:0.3,D:0.4)E:0.5)F:0.1)A;", 3, 6),
        ("Single node", "A;", 1, 1),
        ("Single node with branch", "A:0.5;", 1, 1),
        ("No terminal symbol", "(A,B)", 2, 3),
        ("Multifurcating tree", "(A,B,C,D);", 4, 5),
        ("Whitespace everywhere", " ( A : 1 ,\n B : 2 ) C ; ", 2, 3),
    ];

    for (name, newick, expected_tips, expected_nodes) in test_cases {
        println!("Testing: {name}");
        let trees = parse_newick(newick)
            .unwrap_or_else(|err| panic!("Failed to parse {name}: {err}"));
        assert_eq!(trees.len(), 1, "Should have exactly one tree");
        let tree = &trees[0];
        assert_eq!(tree.tip_count_all(), expected_tips, "Wrong tip count for {name}");
        assert_eq!(tree.node_count_all(), expected_nodes, "Wrong node count for {name}");
    }
}

fn describe(tree: &Tree, node_id: NodeId) -> String {
    let mut s = String::new();
    let children = tree.child_ids(node_id);
    if !children.is_empty() {
        let children: Vec<String> =
            children.into_iter().map(|child| describe(tree, child)).collect();
        s.push_str(&format!("({})", children.join(",")));
    }
    if let Some(label) = tree.node_label(node_id) {
        s.push_str(&label);
    }
    s
}

#[test]
fn test_comments_between_any_two_tokens() {
    let tokens = ["(", "(", "A", ",", "B", ")", "C", ",", "D", ")", "E", ";"];

    for comment in ["[c]", "[&k=1]"] {
        for gap in 0..=tokens.len() {
            let mut newick = tokens[..gap].concat();
            newick.push_str(comment);
            newick.push_str(&tokens[gap..].concat());
            println!("Testing: {newick}");

            let trees = parse_newick(&newick)
                .unwrap_or_else(|err| panic!("Failed to parse {newick}: {err}"));
            assert_eq!(trees.len(), 1);
            let start = trees[0].start_node_id().unwrap();
            assert_eq!(describe(&trees[0], start), "((A,B)C,D)E");
        }
    }
}

#[test]
fn test_comments_before_nested_subtrees() {
    let test_cases = vec![
        ("Free text at depth 1", "([note](A,B),C);", "A"),
        ("Hot comment at depth 1", "(A,[&x=1](B,C));", "B"),
        ("Hot comment and space", "([&x=1] (A,B),C);", "A"),
        ("Hot comment at depth 2", "(([&x=1](A,B),C),D);", "A"),
        ("Free text at depth 2", "(D,(C,[note] (A,B)));", "A"),
    ];

    for (name, newick, child) in test_cases {
        println!("Testing: {name}");
        let trees = parse_newick(newick)
            .unwrap_or_else(|err| panic!("Failed to parse {name}: {err}"));
        let tree = &trees[0];
        let child_id = tree.node_id_by_label(child).unwrap();
        let parent_id = tree.parent_ids(child_id)[0];
        let parent = tree.node(parent_id).unwrap();
        if newick.contains("&x=1") {
            assert_eq!(
                parent.annotation("x").and_then(|entry| entry.value.clone()),
                Some(LiteralValue::Integer(1)),
                "Annotation not on subtree node in {name}"
            );
        } else {
            assert_eq!(parent.comments(), ["note"], "Comment not on subtree node in {name}");
        }
    }
}

#[test]
fn test_multiple_trees() {
    let trees = parse_newick("(A,B);\n[second](C,D)E;\n[&U] (F,G);").unwrap();
    assert_eq!(trees.len(), 3);
    assert_eq!(trees[1].comments(), ["second"]);
    assert!(trees[0].is_rooted());
    assert!(!trees[2].is_rooted());
}

#[test]
fn test_quoted_labels_and_escaping() {
    let test_cases = vec![
        ("Underscore to space", "(A_B,C_D);", vec!["A B", "C D"]),
        ("Single quoted", "('A B','C_D');", vec!["A B", "C_D"]),
        ("Escaped quote", "('can''t',\"say \"\"hi\"\"\");", vec!["can't", "say \"hi\""]),
        ("Special characters", "('a(b)c','x:y,z');", vec!["a(b)c", "x:y,z"]),
    ];

    for (name, newick, labels) in test_cases {
        println!("Testing: {name}");
        let trees = parse_newick(newick).unwrap();
        for label in labels {
            assert!(
                trees[0].node_id_by_label(label).is_some(),
                "Label {label:?} not found in {name}"
            );
        }
    }
}

#[test]
fn test_underscores_kept_when_configured() {
    let events = read_events("A_B;", ReaderConfig::default().with_replace_underscores(false));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Start(ContentEvent::Node(node)) if node.label.as_deref() == Some("A_B")
    )));
}

#[test]
fn test_single_node_shorthand() {
    let with_terminal = read_events("A:1;", ReaderConfig::default());
    let without_terminal = read_events("A:1", ReaderConfig::default());
    assert_eq!(with_terminal, without_terminal);
    assert!(with_terminal.iter().any(|event| event.is_start(EventContentType::RootEdge)));
}

/// Two hot comments without a length are split: the first stays with the
/// node, the rest go to the edge. A single hot comment without a length
/// stays with the node. The asymmetry is intentional.
#[test]
fn test_hot_comment_reclassification_is_intentional() {
    let trees = parse_newick("(A[&x=1][&y=2],B[&z=3]);").unwrap();
    let tree = &trees[0];

    let a = tree.node(tree.node_id_by_label("A").unwrap()).unwrap();
    let keys: Vec<&str> = a.annotations().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["x"]);
    let a_edge = tree.edge(a.afferent_edge_ids()[0]).unwrap();
    let keys: Vec<&str> = a_edge.annotations().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["y"]);

    let b = tree.node(tree.node_id_by_label("B").unwrap()).unwrap();
    assert_eq!(b.annotations().len(), 1);
    assert_eq!(b.annotations()[0].key, "z");
    assert!(tree.edge(b.afferent_edge_ids()[0]).unwrap().annotations().is_empty());
}

#[test]
fn test_comments_after_length_belong_to_edge() {
    let trees = parse_newick("(A[&x=1]:0.5[&y=2][note],B);").unwrap();
    let tree = &trees[0];
    let a = tree.node(tree.node_id_by_label("A").unwrap()).unwrap();
    assert_eq!(a.annotations()[0].key, "x");
    let edge = tree.edge(a.afferent_edge_ids()[0]).unwrap();
    assert_eq!(edge.length(), Some(0.5));
    assert_eq!(edge.annotations()[0].key, "y");
    assert_eq!(edge.comments(), ["note"]);
}

#[test]
fn test_annotation_dialects() {
    let trees =
        parse_newick("(A[&&NHX:S=Human:B=90]:0.1,B[&rate=1.5,set={1,\"x\"},flag]);").unwrap();
    let tree = &trees[0];

    let a = tree.node(tree.node_id_by_label("A").unwrap()).unwrap();
    assert_eq!(a.annotation("S").unwrap().value, Some(LiteralValue::Text("Human".into())));
    assert_eq!(a.annotation("B").unwrap().value, Some(LiteralValue::Integer(90)));

    let b = tree.node(tree.node_id_by_label("B").unwrap()).unwrap();
    assert_eq!(b.annotation("rate").unwrap().value, Some(LiteralValue::Decimal(1.5)));
    assert_eq!(
        b.annotation("set").unwrap().value,
        Some(LiteralValue::List(vec![
            LiteralValue::Integer(1),
            LiteralValue::Text("x".into()),
        ]))
    );
    assert_eq!(b.annotation("flag").unwrap().value, None);
}

#[test]
fn test_network_dedup() {
    let input = "((A,X#H1[&a=1])B,(X#H1[&b=2],C)D)R;";
    let mut reader =
        NewickReader::new(input.as_bytes(), ReaderConfig::default().with_network(true));
    let mut events = Vec::new();
    while let Some(event) = reader.next_event().unwrap() {
        events.push(event);
    }

    let x_ids: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::Start(ContentEvent::Node(node)) if node.label.as_deref() == Some("X") => {
                Some(node.id.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(x_ids.len(), 1);

    let edges_into_x = events
        .iter()
        .filter(|event| {
            matches!(event, Event::Start(ContentEvent::Edge(edge)) if edge.target_id == x_ids[0])
        })
        .count();
    assert_eq!(edges_into_x, 2);
    assert!(events.iter().any(|event| event.is_start(EventContentType::Network)));

    assert_eq!(reader.diagnostics().len(), 1);
    assert_eq!(reader.diagnostics()[0].kind, DiagnosticKind::DiscardedNetworkNodeMetadata);

    let trees = parse_enewick(input).unwrap();
    let tree = &trees[0];
    let x = tree.node(tree.node_id_by_label("X").unwrap()).unwrap();
    let keys: Vec<&str> = x.annotations().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["a"]);
    assert!(tree.is_network());
}

#[test]
fn test_network_labels_ignored_in_newick_mode() {
    let trees = parse_newick("((A,X#H1)B,(X#H1,C)D)R;").unwrap();
    assert_eq!(trees[0].node_count_all(), 7);
    assert!(!trees[0].is_network());
}

#[test]
fn test_malformed_input() {
    match parse_newick("(A,B;") {
        Err(ReadError::UnexpectedToken { found, expected, position }) => {
            assert_eq!(found, "';'");
            assert_eq!(expected, "',' or ')'");
            assert_eq!(position.offset, 4);
        }
        other => panic!("expected a structural error, got {other:?}"),
    }

    let err = parse_newick("(A,\n'B").unwrap_err();
    println!("{err}");
    assert!(err.to_string().contains("line 2, column 1"));
    assert_eq!(err.position().map(|p| p.line), Some(1));
}

#[test]
fn test_peek_matches_next() {
    let mut reader = NewickReader::new("(A,B);".as_bytes(), ReaderConfig::default());
    while reader.has_next_event().unwrap() {
        let peeked = reader.peek_event().unwrap().cloned();
        let next = reader.next_event().unwrap();
        assert_eq!(peeked, next);
    }
    assert_eq!(reader.next_event().unwrap(), None);
}
